//! Multi Label Protocol Switching

use serde::Serialize;

use crate::errors::Error;
use crate::layer::{Attributes, Decoded, Dispatch, Layer};
use crate::packet::Frame;
use crate::range::ByteRange;
use crate::types::{ETHERTYPE_IP, ETHERTYPE_IP6};

/// Default Header Length for MPLS Packets
pub const MPLS_HEADER_LENGTH: usize = 4_usize;

#[derive(Debug, Default, Serialize, Copy, Clone)]
pub struct MPLSLabel {
    #[serde(serialize_with = "crate::types::hex::serialize_lower_hex_u32")]
    label: u32, //This is only 20 bits
    #[serde(serialize_with = "crate::types::hex::serialize_lower_hex_u8")]
    exp: u8, //This is only 3 bits
    bos: bool,
    ttl: u8,
}

#[derive(Debug, Default, Serialize, Clone)]
pub struct MPLS {
    labels: Vec<MPLSLabel>,
}

impl MPLS {
    pub(crate) fn creator(frame: &Frame, range: ByteRange) -> Result<Decoded, Error> {
        let mut mpls = MPLS::default();
        let mut offset = 0;
        loop {
            let Some(entry) = range.sub(offset, MPLS_HEADER_LENGTH).map(|r| frame.slice(r)) else {
                return Err(Error::parse("MPLS label stack without bottom of stack"));
            };
            if entry.len() < MPLS_HEADER_LENGTH {
                return Err(Error::too_short(MPLS_HEADER_LENGTH, entry));
            }
            let word = u32::from_be_bytes([entry[0], entry[1], entry[2], entry[3]]);
            let label = MPLSLabel {
                label: word >> 12,
                exp: ((word >> 9) & 0x07) as u8,
                bos: word & 0x100 != 0,
                ttl: entry[3],
            };
            mpls.labels.push(label);
            offset += MPLS_HEADER_LENGTH;
            if label.bos {
                break;
            }
        }

        // No type field: the first nibble of the payload tells IPv4 from IPv6.
        let payload = range.skip(offset);
        let dispatch = match payload.map(|p| frame.slice(p).first().map(|b| b >> 4)) {
            Some(Some(4)) => Dispatch::EtherType(ETHERTYPE_IP),
            Some(Some(6)) => Dispatch::EtherType(ETHERTYPE_IP6),
            _ => Dispatch::Raw,
        };
        Ok(Decoded::new(mpls, range).child(dispatch, payload))
    }

    pub fn labels(&self) -> &[MPLSLabel] {
        &self.labels
    }
}

impl Layer for MPLS {
    fn name(&self) -> &'static str {
        "MPLS"
    }

    fn short_name(&self) -> &'static str {
        "mpls"
    }

    fn attributes(&self, _bytes: &[u8], attrs: &mut Attributes) {
        for label in &self.labels {
            attrs.add(
                "Label",
                format!(
                    "{} (exp {}, ttl {}{})",
                    label.label,
                    label.exp,
                    label.ttl,
                    if label.bos { ", bottom" } else { "" }
                ),
            );
        }
    }
}
