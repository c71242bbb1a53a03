//! Ethernet Layer

use core::convert::TryInto;

use std::collections::HashMap;
use std::sync::OnceLock;

use serde::Serialize;

use crate::dispatch::LayerCreatorFn;
use crate::errors::Error;
use crate::layer::{Attributes, Decoded, Dispatch, Layer};
use crate::layers::{arp, ipv4, ipv6, mpls, vlan};
use crate::packet::Frame;
use crate::range::ByteRange;
use crate::types::{
    EtherType, MACAddress, ETHERTYPE_ARP, ETHERTYPE_IP, ETHERTYPE_IP6, ETHERTYPE_MPLS_MULTICAST,
    ETHERTYPE_MPLS_UNICAST, ETHERTYPE_QINQ, ETHERTYPE_VLAN,
};

pub const ETH_HEADER_LENGTH: usize = 14_usize;

/// A Map maintaining EtherType -> Creator fns for Layer Creators of L3 Layers.
///
/// Also used by the layers that carry an EtherType of their own (VLAN tags, Linux SLL).
fn ethertypes_map() -> &'static HashMap<EtherType, LayerCreatorFn> {
    static ETHERTYPES_MAP: OnceLock<HashMap<EtherType, LayerCreatorFn>> = OnceLock::new();
    ETHERTYPES_MAP.get_or_init(|| {
        let entries: [(EtherType, LayerCreatorFn); 7] = [
            (ETHERTYPE_IP, ipv4::IPv4::creator),
            (ETHERTYPE_ARP, arp::ARP::creator),
            (ETHERTYPE_VLAN, vlan::Vlan::creator),
            (ETHERTYPE_QINQ, vlan::Vlan::creator),
            (ETHERTYPE_IP6, ipv6::IPv6::creator),
            (ETHERTYPE_MPLS_UNICAST, mpls::MPLS::creator),
            (ETHERTYPE_MPLS_MULTICAST, mpls::MPLS::creator),
        ];
        entries.into_iter().collect()
    })
}

pub(crate) fn ethertype_creator(ethertype: EtherType) -> Option<LayerCreatorFn> {
    ethertypes_map().get(&ethertype).copied()
}

/// Structure representing the Ethernet Header of a Packet.
#[derive(Debug, Default, Clone, Serialize)]
pub struct Ethernet {
    dst_mac: MACAddress,
    src_mac: MACAddress,
    ethertype: EtherType,
}

impl Ethernet {
    pub fn dst_mac(&self) -> MACAddress {
        self.dst_mac
    }

    pub fn src_mac(&self) -> MACAddress {
        self.src_mac
    }

    pub fn ethertype(&self) -> EtherType {
        self.ethertype
    }

    /// Decodes an Ethernet II header, or an IEEE 802.3 header when the type field holds a length.
    pub(crate) fn creator(frame: &Frame, range: ByteRange) -> Result<Decoded, Error> {
        let bytes = frame.slice(range);
        if bytes.len() < ETH_HEADER_LENGTH {
            return Err(Error::too_short(ETH_HEADER_LENGTH, bytes));
        }
        let dst_mac = bytes[0..6].try_into()?;
        let src_mac = bytes[6..12].try_into()?;
        let ethertype = EtherType((bytes[12] as u16) << 8 | bytes[13] as u16);

        if ethertype.is_length() {
            return Ieee8023::decode(frame, range, dst_mac, src_mac, ethertype.0);
        }

        let eth = Ethernet {
            dst_mac,
            src_mac,
            ethertype,
        };
        Ok(Decoded::new(eth, range)
            .child(Dispatch::EtherType(ethertype), range.skip(ETH_HEADER_LENGTH)))
    }
}

impl Layer for Ethernet {
    fn name(&self) -> &'static str {
        "Ethernet2"
    }

    fn short_name(&self) -> &'static str {
        "eth"
    }

    fn attributes(&self, _bytes: &[u8], attrs: &mut Attributes) {
        attrs.add("Destination", self.dst_mac);
        attrs.add("Source", self.src_mac);
        attrs.add("EtherType", self.ethertype);
    }
}

/// IEEE 802.3 header, whose type field is the length of the LLC payload.
#[derive(Debug, Default, Clone, Serialize)]
pub struct Ieee8023 {
    dst_mac: MACAddress,
    src_mac: MACAddress,
    length: u16,
}

impl Ieee8023 {
    fn decode(
        frame: &Frame,
        range: ByteRange,
        dst_mac: MACAddress,
        src_mac: MACAddress,
        length: u16,
    ) -> Result<Decoded, Error> {
        let header = range.take(ETH_HEADER_LENGTH);
        let available = range.len() - ETH_HEADER_LENGTH;
        if length as usize > available {
            frame.record_anomaly(
                ByteRange::new(range.at(12), range.at(13)).unwrap_or(range),
                format!("802.3 length {} exceeds the {} bytes captured", length, available),
            );
        }
        let payload = range.sub(ETH_HEADER_LENGTH, length as usize);
        let end = payload.or(header).unwrap_or(range);
        let own = ByteRange::new(range.start(), end.end()).unwrap_or(range);

        let layer = Ieee8023 {
            dst_mac,
            src_mac,
            length,
        };
        Ok(Decoded::new(layer, own)
            .child(Dispatch::Raw, payload)
            .following(Dispatch::Raw, range.after(&own)))
    }
}

impl Layer for Ieee8023 {
    fn name(&self) -> &'static str {
        "IEEE 802.3"
    }

    fn short_name(&self) -> &'static str {
        "ieee8023"
    }

    fn attributes(&self, _bytes: &[u8], attrs: &mut Attributes) {
        attrs.add("Destination", self.dst_mac);
        attrs.add("Source", self.src_mac);
        attrs.add("Length", self.length);
    }
}
