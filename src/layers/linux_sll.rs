//! Linux Cooked Link Layer version 1

use serde::Serialize;

use crate::errors::Error;
use crate::layer::{Attributes, Decoded, Dispatch, Layer};
use crate::packet::Frame;
use crate::range::ByteRange;
use crate::types::EtherType;

const LINUX_SLL_HEADER_LEN: usize = 16_usize;

#[derive(Debug, Default, Clone, Serialize)]
pub struct LinuxSll {
    packet_type: u16,
    ll_type: u16,
    ll_addr_len: u16,
    #[serde(serialize_with = "hex::serialize")]
    ll_addr: [u8; 8],
    protocol: EtherType,
}

impl LinuxSll {
    pub(crate) fn creator(frame: &Frame, range: ByteRange) -> Result<Decoded, Error> {
        let bytes = frame.slice(range);
        if bytes.len() < LINUX_SLL_HEADER_LEN {
            return Err(Error::too_short(LINUX_SLL_HEADER_LEN, bytes));
        }
        let mut ll_addr = [0u8; 8];
        ll_addr.copy_from_slice(&bytes[6..14]);
        let sll = LinuxSll {
            packet_type: (bytes[0] as u16) << 8 | bytes[1] as u16,
            ll_type: (bytes[2] as u16) << 8 | bytes[3] as u16,
            ll_addr_len: (bytes[4] as u16) << 8 | bytes[5] as u16,
            ll_addr,
            protocol: EtherType((bytes[14] as u16) << 8 | bytes[15] as u16),
        };
        let protocol = sll.protocol;
        Ok(Decoded::new(sll, range)
            .child(Dispatch::EtherType(protocol), range.skip(LINUX_SLL_HEADER_LEN)))
    }

    fn packet_type_name(&self) -> &'static str {
        match self.packet_type {
            0 => "Unicast to us",
            1 => "Broadcast",
            2 => "Multicast",
            3 => "Unicast to another host",
            4 => "Sent by us",
            _ => "Unknown",
        }
    }
}

impl Layer for LinuxSll {
    fn name(&self) -> &'static str {
        "Linux SLL"
    }

    fn short_name(&self) -> &'static str {
        "linux_sll"
    }

    fn attributes(&self, _bytes: &[u8], attrs: &mut Attributes) {
        attrs.add("Packet Type", self.packet_type_name());
        attrs.add("Link Layer Type", self.ll_type);
        let len = (self.ll_addr_len as usize).min(self.ll_addr.len());
        attrs.add("Link Layer Address", hex::encode(&self.ll_addr[..len]));
        attrs.add("Protocol", self.protocol);
    }
}

#[cfg(test)]
mod tests {
    use crate::types::{Timestamp, ENCAP_TYPE_LINUX_SLL};

    #[test]
    fn sll_ipv4_udp() {
        let bytes = hex::decode("000003040006000000000000000008004500001f000040004011fb9a7f0000017f000001d4311f90000b0fe0646e73").unwrap();
        let f = crate::dissect(bytes, Timestamp::default(), ENCAP_TYPE_LINUX_SLL, false);
        let nodes: Vec<_> = f.packets(None).collect();
        assert_eq!(nodes[0].name(), "Linux SLL");
        assert_eq!(nodes[1].name(), "IPv4");
        assert_eq!(nodes[2].name(), "UDP");
        let attrs = nodes[0].attributes().unwrap();
        assert_eq!(attrs.get("Packet Type"), Some("Sent by us"));
        assert_eq!(attrs.get("Link Layer Address"), Some("000000000000"));
    }
}
