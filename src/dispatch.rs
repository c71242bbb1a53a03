//! Dispatch boundary
//!
//! Every [`NextLayer`] is decoded here. A lookup in the registry of the layer's encapsulation
//! context selects the decoder; whatever the decoder does, the result is always a node. Errors
//! never travel further up than this module.

use std::panic::{self, AssertUnwindSafe};

use crate::errors::Error;
use crate::layer::{Decoded, Dispatch, NextLayer};
use crate::layers::{ethernet, ipv4, raw::Raw, smb, tls};
use crate::packet::{self, Frame};
use crate::range::ByteRange;
use crate::session::{self, IpEndpoints, SessionTable};

/// Decoder entry point registered in a link, EtherType or SMB command table.
pub type LayerCreatorFn = fn(&Frame, ByteRange) -> Result<Decoded, Error>;

/// Decoder entry point registered in the IP protocol table.
pub type IpProtocolCreatorFn = fn(&Frame, ByteRange, &IpEndpoints) -> Result<Decoded, Error>;

/// Decodes `next` in its context. `Err(Error::Unrecognized)` when the context has no decoder for
/// the key.
pub fn try_get_next_layer(
    frame: &Frame,
    sessions: Option<&SessionTable>,
    next: &NextLayer,
) -> Result<Decoded, Error> {
    let range = next.range;
    match next.dispatch {
        Dispatch::Link(encap) => match packet::encap_creator(encap) {
            Some(creator) => creator(frame, range),
            None => {
                log::debug!("no decoder for link type {}", encap);
                Err(Error::Unrecognized)
            }
        },
        Dispatch::EtherType(ethertype) => match ethernet::ethertype_creator(ethertype) {
            Some(creator) => creator(frame, range),
            None => {
                log::debug!("no decoder for ethertype {}", ethertype);
                Err(Error::Unrecognized)
            }
        },
        Dispatch::IpProtocol {
            protocol,
            ref endpoints,
        } => match ipv4::protocol_creator(protocol) {
            Some(creator) => creator(frame, range, endpoints),
            None => {
                log::debug!("no decoder for ip protocol {}", protocol);
                Err(Error::Unrecognized)
            }
        },
        Dispatch::Session(ref key) => Ok(session::decode_payload(frame, sessions, key, range)),
        Dispatch::TlsRecord { continuation } => tls::TlsRecord::decode(frame, range, continuation),
        Dispatch::TlsHandshake => tls::Handshake::decode(frame, range),
        Dispatch::ReassembledHandshake {
            ref messages,
            index,
        } => tls::Handshake::reassembled(messages, index, range),
        Dispatch::Smb => smb::SmbHeader::decode(frame, range),
        Dispatch::SmbCommand(ref link) => smb::SmbCommand::decode(frame, range, link),
        Dispatch::Raw => Err(Error::Unrecognized),
    }
}

/// Decodes `next`, falling back to a [`Raw`] node covering its whole range.
///
/// An unknown key gives a silent fallback. A failing or panicking decoder gives the fallback
/// plus an anomaly on the range.
pub fn decode_next(frame: &Frame, sessions: Option<&SessionTable>, next: &NextLayer) -> Decoded {
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        try_get_next_layer(frame, sessions, next)
    }));
    match result {
        Ok(Ok(decoded)) => decoded,
        Ok(Err(Error::Unrecognized)) => raw(next.range),
        Ok(Err(e)) => {
            frame.record_anomaly(next.range, e.to_string());
            raw(next.range)
        }
        Err(_) => {
            frame.record_anomaly(next.range, "decoder fault");
            raw(next.range)
        }
    }
}

pub(crate) fn raw(range: ByteRange) -> Decoded {
    Decoded::new(Raw::new(range.len()), range)
}
