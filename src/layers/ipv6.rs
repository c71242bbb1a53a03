//! IPv6 Layer

use core::convert::TryInto;

use serde::Serialize;

use crate::errors::Error;
use crate::layer::{Attributes, Decoded, Dispatch, Layer};
use crate::packet::Frame;
use crate::range::ByteRange;
use crate::session::IpEndpoints;
use crate::types::IPv6Address;

pub const IPV6_BASE_HDR_LEN: usize = 40_usize;

pub const IPV6_EXT_HOP_BY_HOP: u8 = 0;
pub const IPV6_EXT_ROUTING: u8 = 43;
pub const IPV6_EXT_FRAGMENT: u8 = 44;
pub const IPV6_EXT_DEST_OPTS: u8 = 60;
pub const IPV6_NO_NEXT_HEADER: u8 = 59;

/// Extension headers walked before giving up on reaching the upper layer.
const MAX_EXTENSION_HEADERS: usize = 8;

#[derive(Debug, Default, Clone, Serialize)]
pub struct IPv6 {
    version: u8,
    traffic_class: u8,
    flow_label: u32,
    payload_len: u16,
    next_hdr: u8,
    hop_limit: u8,
    src_addr: IPv6Address,
    dst_addr: IPv6Address,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    extension_headers: Vec<u8>,
    upper_protocol: u8,
}

impl IPv6 {
    pub(crate) fn creator(frame: &Frame, range: ByteRange) -> Result<Decoded, Error> {
        let bytes = frame.slice(range);
        if bytes.len() < IPV6_BASE_HDR_LEN {
            return Err(Error::too_short(IPV6_BASE_HDR_LEN, bytes));
        }

        let mut ip = IPv6 {
            version: bytes[0] >> 4,
            traffic_class: ((bytes[0] & 0xF) << 4) | (bytes[1] >> 4),
            flow_label: ((bytes[1] & 0x0F) as u32) << 16 | (bytes[2] as u32) << 8 | (bytes[3] as u32),
            payload_len: (bytes[4] as u16) << 8 | (bytes[5] as u16),
            next_hdr: bytes[6],
            hop_limit: bytes[7],
            src_addr: bytes[8..24].try_into()?,
            dst_addr: bytes[24..40].try_into()?,
            ..Default::default()
        };
        if ip.version != 6 {
            return Err(Error::parse(format!("IPv6 version field is {}", ip.version)));
        }

        let total = IPV6_BASE_HDR_LEN + ip.payload_len as usize;
        if total > bytes.len() {
            frame.record_anomaly(
                range.sub(4, 2).unwrap_or(range),
                format!(
                    "IPv6 payload length {} exceeds the {} bytes captured",
                    ip.payload_len,
                    bytes.len() - IPV6_BASE_HDR_LEN
                ),
            );
        }
        let own = range.take(total).unwrap_or(range);
        let header = &bytes[..own.len()];

        let mut offset = IPV6_BASE_HDR_LEN;
        let mut next = ip.next_hdr;
        let mut fragment = false;
        while matches!(
            next,
            IPV6_EXT_HOP_BY_HOP | IPV6_EXT_ROUTING | IPV6_EXT_FRAGMENT | IPV6_EXT_DEST_OPTS
        ) {
            if ip.extension_headers.len() == MAX_EXTENSION_HEADERS {
                return Err(Error::parse("too many IPv6 extension headers"));
            }
            let ext = header
                .get(offset..offset + 8)
                .ok_or_else(|| Error::too_short(offset + 8, header))?;
            let len = if next == IPV6_EXT_FRAGMENT {
                fragment = ((ext[2] as u16) << 8 | ext[3] as u16) >> 3 != 0;
                8
            } else {
                (ext[1] as usize + 1) * 8
            };
            if offset + len > header.len() {
                return Err(Error::too_short(offset + len, header));
            }
            ip.extension_headers.push(next);
            next = ext[0];
            offset += len;
        }
        ip.upper_protocol = next;

        let dispatch = if fragment || next == IPV6_NO_NEXT_HEADER {
            Dispatch::Raw
        } else {
            Dispatch::IpProtocol {
                protocol: next,
                endpoints: ip.endpoints(),
            }
        };
        Ok(Decoded::new(ip, own)
            .child(dispatch, own.skip(offset))
            .following(Dispatch::Raw, range.after(&own)))
    }

    pub fn endpoints(&self) -> IpEndpoints {
        IpEndpoints::new(self.src_addr, self.dst_addr)
    }

    /// Protocol of the payload once the extension headers are skipped.
    pub fn upper_protocol(&self) -> u8 {
        self.upper_protocol
    }
}

impl Layer for IPv6 {
    fn name(&self) -> &'static str {
        "IPv6"
    }

    fn short_name(&self) -> &'static str {
        "ip6"
    }

    fn attributes(&self, _bytes: &[u8], attrs: &mut Attributes) {
        attrs.add("Traffic Class", format!("0x{:02x}", self.traffic_class));
        attrs.add("Flow Label", format!("0x{:05x}", self.flow_label));
        attrs.add("Payload Length", self.payload_len);
        attrs.add("Next Header", self.next_hdr);
        attrs.add("Hop Limit", self.hop_limit);
        attrs.add("Source", self.src_addr);
        attrs.add("Destination", self.dst_addr);
        for ext in &self.extension_headers {
            attrs.add("Extension Header", ext);
        }
    }
}
