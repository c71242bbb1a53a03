//! UDP Layer

use serde::Serialize;

use crate::errors::Error;
use crate::layer::{Attributes, Decoded, Dispatch, Layer};
use crate::packet::Frame;
use crate::range::ByteRange;
use crate::session::{IpEndpoints, SessionKey, Transport};

/// UDP header length
pub const UDP_HDR_LEN: usize = 8_usize;
/// IANA Assigned protocol number for UDP
pub const IPPROTO_UDP: u8 = 17_u8;

/// Structure representing the UDP Header.
#[derive(Debug, Default, Clone, Serialize)]
pub struct UDP {
    src_port: u16,
    dst_port: u16,
    length: u16,
    #[serde(serialize_with = "crate::types::hex::serialize_lower_hex_u16")]
    checksum: u16,
}

impl UDP {
    pub(crate) fn creator(
        frame: &Frame,
        range: ByteRange,
        endpoints: &IpEndpoints,
    ) -> Result<Decoded, Error> {
        let bytes = frame.slice(range);
        if bytes.len() < UDP_HDR_LEN {
            return Err(Error::too_short(UDP_HDR_LEN, bytes));
        }

        let udp = UDP {
            src_port: (bytes[0] as u16) << 8 | (bytes[1] as u16),
            dst_port: (bytes[2] as u16) << 8 | (bytes[3] as u16),
            length: (bytes[4] as u16) << 8 | (bytes[5] as u16),
            checksum: (bytes[6] as u16) << 8 | (bytes[7] as u16),
        };
        let length = udp.length as usize;
        if length < UDP_HDR_LEN {
            return Err(Error::parse(format!("UDP length {} shorter than its header", length)));
        }
        if length > bytes.len() {
            frame.record_anomaly(
                range.sub(4, 2).unwrap_or(range),
                format!("UDP length {} exceeds the {} bytes available", length, bytes.len()),
            );
        }
        let own = range.take(length).unwrap_or(range);

        let key = SessionKey::new(Transport::Udp, endpoints, udp.src_port, udp.dst_port);
        Ok(Decoded::new(udp, own)
            .child(Dispatch::Session(key), own.skip(UDP_HDR_LEN))
            .following(Dispatch::Raw, range.after(&own)))
    }

    pub fn src_port(&self) -> u16 {
        self.src_port
    }

    pub fn dst_port(&self) -> u16 {
        self.dst_port
    }
}

impl Layer for UDP {
    fn name(&self) -> &'static str {
        "UDP"
    }

    fn short_name(&self) -> &'static str {
        "udp"
    }

    fn attributes(&self, _bytes: &[u8], attrs: &mut Attributes) {
        attrs.add("Source Port", self.src_port);
        attrs.add("Destination Port", self.dst_port);
        attrs.add("Length", self.length);
        attrs.add("Checksum", format!("0x{:04x}", self.checksum));
    }
}

#[cfg(test)]
mod tests {
    use crate::types::{Timestamp, ENCAP_TYPE_RAW};

    #[test]
    fn length_shorter_than_ip_payload() {
        // UDP length 10 inside an IP payload of 12: two bytes trail the datagram.
        let bytes = hex::decode("450000200001000040110000c0a80001c0a80002ea603039000a00004142cafe").unwrap();
        let f = crate::dissect(bytes, Timestamp::default(), ENCAP_TYPE_RAW, true);
        let nodes: Vec<_> = f.packets(None).collect();
        let names: Vec<_> = nodes.iter().map(|n| n.name()).collect();
        assert_eq!(names, ["IPv4", "UDP", "Raw", "Raw"]);
        assert_eq!((nodes[2].range().start(), nodes[2].range().end()), (28, 29));
        assert_eq!(nodes[2].depth(), 2);
        assert_eq!((nodes[3].range().start(), nodes[3].range().end()), (30, 31));
        assert_eq!(nodes[3].depth(), 1);
        assert!(f.anomalies().is_empty());
    }

    #[test]
    fn length_past_the_frame() {
        let bytes = hex::decode("450000200001000040110000c0a80001c0a80002ea60303900ff00004142cafe").unwrap();
        let f = crate::dissect(bytes, Timestamp::default(), ENCAP_TYPE_RAW, true);
        assert_eq!(f.packets(None).count(), 3);
        let anomalies = f.anomalies().entries();
        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].range.start(), 24);
    }
}
