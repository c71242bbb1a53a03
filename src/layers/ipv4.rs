//! IPv4 Layer

use core::convert::TryInto as _;

use std::collections::HashMap;
use std::sync::OnceLock;

use serde::Serialize;

use crate::dispatch::{IpProtocolCreatorFn, LayerCreatorFn};
use crate::errors::Error;
use crate::layer::{Attributes, Decoded, Dispatch, Layer};
use crate::layers::{icmp, ipv6, tcp, udp};
use crate::packet::Frame;
use crate::range::ByteRange;
use crate::session::IpEndpoints;
use crate::types::IPv4Address;

/// Basic Length of the IPv4 Header when no options are present
pub const IPV4_BASE_HEADER_LENGTH: usize = 20_usize;

pub const IPV4_OPTION_EOOL: u8 = 0;
pub const IPV4_OPTION_NOP: u8 = 1;
pub const IPV4_OPTION_RR: u8 = 7;
pub const IPV4_OPTION_MTUP: u8 = 11;
pub const IPV4_OPTION_MTUR: u8 = 12;

/// A Map maintaining IP protocol -> creator fns of the transport layers.
///
/// Shared by IPv4 and IPv6, whose next header values use the same number space.
fn protocols_map() -> &'static HashMap<u8, IpProtocolCreatorFn> {
    static PROTOCOLS_MAP: OnceLock<HashMap<u8, IpProtocolCreatorFn>> = OnceLock::new();
    PROTOCOLS_MAP.get_or_init(|| {
        let entries: [(u8, IpProtocolCreatorFn); 3] = [
            (icmp::IPPROTO_ICMP, icmp::ICMP::creator),
            (tcp::IPPROTO_TCP, tcp::TCP::creator),
            (udp::IPPROTO_UDP, udp::UDP::creator),
        ];
        entries.into_iter().collect()
    })
}

pub(crate) fn protocol_creator(protocol: u8) -> Option<IpProtocolCreatorFn> {
    protocols_map().get(&protocol).copied()
}

/// Link type 101: no link header, the version nibble picks the IP version.
pub(crate) fn raw_ip_creator(frame: &Frame, range: ByteRange) -> Result<Decoded, Error> {
    let creator: LayerCreatorFn = match frame.slice(range).first().map(|b| b >> 4) {
        Some(4) => IPv4::creator,
        Some(6) => ipv6::IPv6::creator,
        _ => return Err(Error::Unrecognized),
    };
    creator(frame, range)
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type")]
pub enum IPOption {
    EOOL,
    NOP,
    RR {
        len: u8,
        ptr: u8,
        route: Vec<IPv4Address>,
    },
    MTUP {
        len: u8,
        value: u16,
    },
    MTUR {
        len: u8,
        value: u16,
    },
    Other {
        value: u8,
        len: u8,
        data: Vec<u8>,
    },
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct IPv4 {
    version: u8,
    hdr_len: u8,
    tos: u8,
    len: u16,
    #[serde(serialize_with = "crate::types::hex::serialize_lower_hex_u16")]
    id: u16,
    #[serde(serialize_with = "crate::types::hex::serialize_lower_hex_u8")]
    flags: u8,
    frag_offset: u16,
    ttl: u8,
    proto: u8,
    #[serde(serialize_with = "crate::types::hex::serialize_lower_hex_u16")]
    checksum: u16,
    src_addr: IPv4Address,
    dst_addr: IPv4Address,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    options: Vec<IPOption>,
}

impl IPv4 {
    pub(crate) fn creator(frame: &Frame, range: ByteRange) -> Result<Decoded, Error> {
        let bytes = frame.slice(range);
        if bytes.len() < IPV4_BASE_HEADER_LENGTH {
            return Err(Error::too_short(IPV4_BASE_HEADER_LENGTH, bytes));
        }

        let mut ip = IPv4 {
            version: bytes[0] >> 4,
            hdr_len: bytes[0] & 0x0f,
            ..Default::default()
        };
        if ip.version != 4 {
            return Err(Error::parse(format!("IPv4 version field is {}", ip.version)));
        }
        // Length is in 4 octets
        let hdr_len = ip.hdr_len as usize * 4;
        if hdr_len < IPV4_BASE_HEADER_LENGTH {
            return Err(Error::parse(format!("IPv4 header length {} too small", hdr_len)));
        }
        if bytes.len() < hdr_len {
            return Err(Error::too_short(hdr_len, bytes));
        }

        ip.tos = bytes[1];
        ip.len = u16::from_be_bytes([bytes[2], bytes[3]]);
        ip.id = u16::from_be_bytes([bytes[4], bytes[5]]);
        let flags_offset = u16::from_be_bytes([bytes[6], bytes[7]]);
        ip.flags = (flags_offset >> 13) as u8;
        ip.frag_offset = flags_offset & 0x1fff;
        ip.ttl = bytes[8];
        ip.proto = bytes[9];
        ip.checksum = u16::from_be_bytes([bytes[10], bytes[11]]);
        ip.src_addr = bytes[12..16].try_into()?;
        ip.dst_addr = bytes[16..20].try_into()?;
        ip.options = Self::options_from_bytes(&bytes[IPV4_BASE_HEADER_LENGTH..hdr_len])?;

        let total = ip.len as usize;
        if total < hdr_len {
            return Err(Error::parse(format!(
                "IPv4 total length {} shorter than its header",
                total
            )));
        }
        if total > bytes.len() {
            frame.record_anomaly(
                range.sub(2, 2).unwrap_or(range),
                format!("IPv4 total length {} exceeds the {} bytes captured", total, bytes.len()),
            );
        }
        let own = range.take(total).unwrap_or(range);
        let payload = own.skip(hdr_len);

        let dispatch = if ip.frag_offset != 0 {
            Dispatch::Raw
        } else {
            Dispatch::IpProtocol {
                protocol: ip.proto,
                endpoints: ip.endpoints(),
            }
        };
        Ok(Decoded::new(ip, own)
            .child(dispatch, payload)
            .following(Dispatch::Raw, range.after(&own)))
    }

    pub fn endpoints(&self) -> IpEndpoints {
        IpEndpoints::new(self.src_addr, self.dst_addr)
    }

    pub fn protocol(&self) -> u8 {
        self.proto
    }

    pub fn options(&self) -> &[IPOption] {
        &self.options
    }

    fn options_from_bytes(bytes: &[u8]) -> Result<Vec<IPOption>, Error> {
        let mut options = vec![];
        let mut i = 0_usize;
        while i < bytes.len() {
            let (option, consumed) = Self::option_from_bytes(&bytes[i..])?;
            i += consumed;
            let done = option == IPOption::EOOL;
            options.push(option);
            if done {
                break;
            }
        }
        Ok(options)
    }

    fn option_from_bytes(bytes: &[u8]) -> Result<(IPOption, usize), Error> {
        let value = bytes[0];

        // from: https://www.iana.org/assignments/ip-parameters/ip-parameters.xhtml
        match value {
            IPV4_OPTION_EOOL => return Ok((IPOption::EOOL, 1)),
            IPV4_OPTION_NOP => return Ok((IPOption::NOP, 1)),
            _ => {}
        }

        // len also includes the type and len octets
        let len = *bytes.get(1).ok_or_else(|| Error::too_short(2, bytes))?;
        if len < 2 {
            return Err(Error::parse(format!("IPv4 option {} with length {}", value, len)));
        }
        let data = bytes
            .get(2..len as usize)
            .ok_or_else(|| Error::too_short(len as usize, bytes))?;

        let option = match value {
            IPV4_OPTION_RR => {
                let ptr = *data.first().ok_or_else(|| Error::too_short(3, bytes))?;
                // ptr is relative to the option start, the first address lives at 4
                let recorded = (ptr as usize).saturating_sub(3);
                let route = data[1..]
                    .chunks_exact(4)
                    .enumerate()
                    .take_while(|(n, _)| 1 + n * 4 < recorded)
                    .map(|(_, addr)| IPv4Address::from([addr[0], addr[1], addr[2], addr[3]]))
                    .collect();
                IPOption::RR { len, ptr, route }
            }
            IPV4_OPTION_MTUP | IPV4_OPTION_MTUR => {
                if data.len() < 2 {
                    return Err(Error::too_short(4, bytes));
                }
                let mtu = u16::from_be_bytes([data[0], data[1]]);
                if value == IPV4_OPTION_MTUP {
                    IPOption::MTUP { len, value: mtu }
                } else {
                    IPOption::MTUR { len, value: mtu }
                }
            }
            value => IPOption::Other {
                value,
                len,
                data: data.into(),
            },
        };

        Ok((option, len as usize))
    }

    fn flags_text(&self) -> String {
        let mut flags = vec![];
        if self.flags & 0x02 != 0 {
            flags.push("DF");
        }
        if self.flags & 0x01 != 0 {
            flags.push("MF");
        }
        format!("0x{:02x} {}", self.flags, flags.join(","))
            .trim_end()
            .to_string()
    }
}

impl Layer for IPv4 {
    fn name(&self) -> &'static str {
        "IPv4"
    }

    fn short_name(&self) -> &'static str {
        "ip"
    }

    fn attributes(&self, _bytes: &[u8], attrs: &mut Attributes) {
        attrs.add("Header Length", self.hdr_len as usize * 4);
        attrs.add("Total Length", self.len);
        attrs.add("Identification", format!("0x{:04x}", self.id));
        attrs.add("Flags", self.flags_text());
        attrs.add("Fragment Offset", self.frag_offset as usize * 8);
        attrs.add("TTL", self.ttl);
        attrs.add("Protocol", self.proto);
        attrs.add("Checksum", format!("0x{:04x}", self.checksum));
        attrs.add("Source", self.src_addr);
        attrs.add("Destination", self.dst_addr);
        for option in &self.options {
            attrs.add("Option", format!("{:?}", option));
        }
    }
}
