//! IEEE 802.1Q VLAN tags, also used for 802.1ad (QinQ) outer tags.

use serde::Serialize;

use crate::errors::Error;
use crate::layer::{Attributes, Decoded, Dispatch, Layer};
use crate::packet::Frame;
use crate::range::ByteRange;
use crate::types::EtherType;

pub const VLAN_TAG_LENGTH: usize = 4_usize;

#[derive(Debug, Default, Clone, Serialize)]
pub struct Vlan {
    priority: u8,
    drop_eligible: bool,
    vlan_id: u16,
    ethertype: EtherType,
}

impl Vlan {
    pub(crate) fn creator(frame: &Frame, range: ByteRange) -> Result<Decoded, Error> {
        let bytes = frame.slice(range);
        if bytes.len() < VLAN_TAG_LENGTH {
            return Err(Error::too_short(VLAN_TAG_LENGTH, bytes));
        }
        let tci = (bytes[0] as u16) << 8 | bytes[1] as u16;
        let vlan = Vlan {
            priority: (tci >> 13) as u8,
            drop_eligible: tci & 0x1000 != 0,
            vlan_id: tci & 0x0fff,
            ethertype: EtherType((bytes[2] as u16) << 8 | bytes[3] as u16),
        };
        let dispatch = if vlan.ethertype.is_length() {
            Dispatch::Raw
        } else {
            Dispatch::EtherType(vlan.ethertype)
        };
        Ok(Decoded::new(vlan, range).child(dispatch, range.skip(VLAN_TAG_LENGTH)))
    }

    pub fn vlan_id(&self) -> u16 {
        self.vlan_id
    }
}

impl Layer for Vlan {
    fn name(&self) -> &'static str {
        "802.1Q VLAN"
    }

    fn short_name(&self) -> &'static str {
        "vlan"
    }

    fn attributes(&self, _bytes: &[u8], attrs: &mut Attributes) {
        attrs.add("Priority", self.priority);
        attrs.add("DEI", self.drop_eligible);
        attrs.add("ID", self.vlan_id);
        attrs.add("EtherType", self.ethertype);
    }
}

#[cfg(test)]
mod tests {
    use crate::types::{Timestamp, ENCAP_TYPE_ETH};

    #[test]
    fn qinq_stack() {
        // Outer 802.1ad tag 100, inner 802.1Q tag 200 carrying ARP.
        let bytes = hex::decode(concat!(
            "ffffffffffff000f35bb0b4088a8",
            "0064",
            "8100",
            "a0c8",
            "0806",
            "0001080006040001000f35bb0b40c0a80001000000000000c0a80002"
        ))
        .unwrap();
        let f = crate::dissect(bytes, Timestamp::default(), ENCAP_TYPE_ETH, false);
        let nodes: Vec<_> = f.packets(None).collect();
        let names: Vec<_> = nodes.iter().map(|n| n.name()).collect();
        assert_eq!(names, ["Ethernet2", "802.1Q VLAN", "802.1Q VLAN", "ARP"]);
        let inner = nodes[2].attributes().unwrap();
        assert_eq!(inner.get("ID"), Some("200"));
        assert_eq!(inner.get("Priority"), Some("5"));
        assert!(f.anomalies().is_empty());
    }
}
