//! TCP Layer

use serde::Serialize;

use crate::errors::Error;
use crate::layer::{Attributes, Decoded, Dispatch, Layer};
use crate::packet::Frame;
use crate::range::ByteRange;
use crate::session::{IpEndpoints, SessionKey, Transport};

/// TCP header length
pub const TCP_BASE_HDR_LEN: usize = 20_usize;
/// IANA Assigned protocol number for TCP
pub const IPPROTO_TCP: u8 = 6_u8;

const FLAG_NAMES: [(u16, &str); 9] = [
    (0x100, "NS"),
    (0x080, "CWR"),
    (0x040, "ECE"),
    (0x020, "URG"),
    (0x010, "ACK"),
    (0x008, "PSH"),
    (0x004, "RST"),
    (0x002, "SYN"),
    (0x001, "FIN"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind")]
pub enum TcpOption {
    NOP,
    MSS { value: u16 },
    WindowScale { shift: u8 },
    SackPermitted,
    Sack { blocks: u8 },
    Timestamps { value: u32, echo: u32 },
    Other { value: u8, len: u8 },
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct TCP {
    src_port: u16,
    dst_port: u16,
    seq_no: u32,
    ack_no: u32,
    data_offset: u8,
    #[serde(serialize_with = "crate::types::hex::serialize_lower_hex_u16")]
    flags: u16,
    window_size: u16,
    #[serde(serialize_with = "crate::types::hex::serialize_lower_hex_u16")]
    checksum: u16,
    urgent_ptr: u16,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    options: Vec<TcpOption>,
}

impl TCP {
    pub(crate) fn creator(
        frame: &Frame,
        range: ByteRange,
        endpoints: &IpEndpoints,
    ) -> Result<Decoded, Error> {
        let bytes = frame.slice(range);
        if bytes.len() < TCP_BASE_HDR_LEN {
            return Err(Error::too_short(TCP_BASE_HDR_LEN, bytes));
        }

        let mut tcp = TCP {
            src_port: (bytes[0] as u16) << 8 | (bytes[1] as u16),
            dst_port: (bytes[2] as u16) << 8 | (bytes[3] as u16),
            seq_no: u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            ack_no: u32::from_be_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
            data_offset: bytes[12] >> 4,
            flags: ((bytes[12] as u16) << 8 | (bytes[13] as u16)) & 0x01FF,
            window_size: (bytes[14] as u16) << 8 | (bytes[15] as u16),
            checksum: (bytes[16] as u16) << 8 | (bytes[17] as u16),
            urgent_ptr: (bytes[18] as u16) << 8 | (bytes[19] as u16),
            options: vec![],
        };

        let mut hdr_len = tcp.data_offset as usize * 4;
        if hdr_len < TCP_BASE_HDR_LEN {
            return Err(Error::parse(format!(
                "TCP data offset {} below the minimum of 5",
                tcp.data_offset
            )));
        }
        if hdr_len > bytes.len() {
            frame.record_anomaly(
                range.sub(12, 1).unwrap_or(range),
                format!(
                    "TCP data offset {} ({} bytes) exceeds the {} bytes available",
                    tcp.data_offset,
                    hdr_len,
                    bytes.len()
                ),
            );
            hdr_len = bytes.len();
        }
        tcp.options = Self::options_from_bytes(&bytes[TCP_BASE_HDR_LEN..hdr_len]);

        let key = SessionKey::new(Transport::Tcp, endpoints, tcp.src_port, tcp.dst_port);
        Ok(Decoded::new(tcp, range).child(Dispatch::Session(key), range.skip(hdr_len)))
    }

    /// Options up to the first malformed one.
    fn options_from_bytes(bytes: &[u8]) -> Vec<TcpOption> {
        let mut options = vec![];
        let mut i = 0;
        while i < bytes.len() {
            let kind = bytes[i];
            match kind {
                0 => break,
                1 => {
                    options.push(TcpOption::NOP);
                    i += 1;
                    continue;
                }
                _ => {}
            }
            let Some(&len) = bytes.get(i + 1) else { break };
            // A length below 2 gives an empty or inverted range.
            let Some(data) = bytes.get(i + 2..i + len as usize) else { break };
            let option = match (kind, data.len()) {
                (2, 2) => TcpOption::MSS {
                    value: u16::from_be_bytes([data[0], data[1]]),
                },
                (3, 1) => TcpOption::WindowScale { shift: data[0] },
                (4, 0) => TcpOption::SackPermitted,
                (5, n) => TcpOption::Sack { blocks: (n / 8) as u8 },
                (8, 8) => TcpOption::Timestamps {
                    value: u32::from_be_bytes([data[0], data[1], data[2], data[3]]),
                    echo: u32::from_be_bytes([data[4], data[5], data[6], data[7]]),
                },
                (value, _) => TcpOption::Other { value, len },
            };
            options.push(option);
            i += len as usize;
        }
        options
    }

    pub fn src_port(&self) -> u16 {
        self.src_port
    }

    pub fn dst_port(&self) -> u16 {
        self.dst_port
    }

    pub fn options(&self) -> &[TcpOption] {
        &self.options
    }

    fn flags_text(&self) -> String {
        let set: Vec<_> = FLAG_NAMES
            .iter()
            .filter(|(bit, _)| self.flags & bit != 0)
            .map(|(_, name)| *name)
            .collect();
        set.join(", ")
    }
}

impl Layer for TCP {
    fn name(&self) -> &'static str {
        "TCP"
    }

    fn short_name(&self) -> &'static str {
        "tcp"
    }

    fn attributes(&self, _bytes: &[u8], attrs: &mut Attributes) {
        attrs.add("Source Port", self.src_port);
        attrs.add("Destination Port", self.dst_port);
        attrs.add("Sequence Number", self.seq_no);
        attrs.add("Acknowledgment Number", self.ack_no);
        attrs.add("Header Length", self.data_offset as usize * 4);
        attrs.add("Flags", self.flags_text());
        attrs.add("Window Size", self.window_size);
        attrs.add("Checksum", format!("0x{:04x}", self.checksum));
        if self.urgent_ptr != 0 {
            attrs.add("Urgent Pointer", self.urgent_ptr);
        }
        for option in &self.options {
            attrs.add("Option", format!("{:?}", option));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::TcpOption;
    use crate::layer::LayerKind;
    use crate::types::{Timestamp, ENCAP_TYPE_ETH, ENCAP_TYPE_RAW};

    #[test]
    fn syn_options() {
        let array = hex::decode("000573a007d168a3c4f949f686dd600000000020064020010470e5bfdead49572174e82c48872607f8b0400c0c03000000000000001af9c7001903a088300000000080022000da4700000204058c0103030801010402").unwrap();
        let f = crate::dissect(array, Timestamp::default(), ENCAP_TYPE_ETH, false);
        let tcp = f.packets(None).nth(2).unwrap();
        match tcp.layer() {
            LayerKind::Tcp(tcp) => {
                assert_eq!(tcp.dst_port(), 25);
                assert_eq!(
                    tcp.options(),
                    [
                        TcpOption::MSS { value: 1420 },
                        TcpOption::NOP,
                        TcpOption::WindowScale { shift: 8 },
                        TcpOption::NOP,
                        TcpOption::NOP,
                        TcpOption::SackPermitted,
                    ]
                );
            }
            other => panic!("not TCP: {:?}", other),
        }
        assert_eq!(tcp.attributes().unwrap().get("Flags"), Some("SYN"));
    }

    #[test]
    fn data_offset_past_the_frame() {
        // Data offset 15 (60 bytes) with 40 bytes of TCP segment.
        let mut bytes = hex::decode(concat!(
            "4500003c000100004006f9b50a0000010a000002",
            "c3500050000000010000000050020000a3b10000",
            "0204058c0402080a0000000100000000010303070000"
        ))
        .unwrap();
        bytes[20 + 12] = 0xf0;
        bytes.truncate(60);
        let f = crate::dissect(bytes, Timestamp::default(), ENCAP_TYPE_RAW, false);
        let nodes: Vec<_> = f.packets(None).collect();
        let names: Vec<_> = nodes.iter().map(|n| n.name()).collect();
        assert_eq!(names, ["IPv4", "TCP"]);
        assert_eq!(nodes[1].range().len(), 40);

        let anomalies = f.anomalies().entries();
        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].range.start(), 32);
        assert_eq!(anomalies[0].range.len(), 1);
    }
}
