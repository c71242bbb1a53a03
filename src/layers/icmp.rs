//! ICMP Datagram

use serde::Serialize;

use crate::errors::Error;
use crate::layer::{Attributes, Decoded, Dispatch, Layer};
use crate::packet::Frame;
use crate::range::ByteRange;
use crate::session::IpEndpoints;
use crate::types::IPv4Address;

/// IANA Assigned protocol number for ICMP
pub const IPPROTO_ICMP: u8 = 1_u8;
/// ICMP header length
pub const ICMP_HEADER_LENGTH: usize = 8_usize;

/// ICMP types
pub const ICMP_ECHO_REPLY: u8 = 0_u8;
pub const ICMP_ECHO_REQUEST: u8 = 8_u8;
pub const ICMP_DESTINATION_UNREACHABLE: u8 = 3_u8;
pub const ICMP_SOURCE_QUENCH: u8 = 4_u8;
pub const ICMP_REDIRECT: u8 = 5_u8;
pub const ICMP_TIME_EXCEEDED: u8 = 11_u8;

#[derive(Default, Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum IcmpType {
    #[default]
    Empty,
    EchoRequest(IcmpEcho),
    EchoReply(IcmpEcho),
    Redirect(IcmpRedirect),
    Unsupported(IcmpUnsupported),
}

#[derive(Default, Debug, Clone, Serialize)]
pub struct IcmpEcho {
    identifier: u16,
    sequence_number: u16,
}

#[derive(Default, Debug, Clone, Serialize)]
pub struct IcmpRedirect {
    gateway_address: IPv4Address,
}

#[derive(Default, Debug, Clone, Serialize)]
pub struct IcmpUnsupported {
    #[serde(serialize_with = "crate::types::hex::serialize_lower_hex_u32")]
    rest_of_header: u32,
}

/// Structure representing the ICMP Header
#[derive(Default, Debug, Clone, Serialize)]
pub struct ICMP {
    #[serde(rename = "type")]
    icmp_type: u8,
    code: u8,
    #[serde(serialize_with = "crate::types::hex::serialize_lower_hex_u16")]
    checksum: u16,
    #[serde(flatten)]
    rest_of_header: IcmpType,
}

impl ICMP {
    pub(crate) fn creator(
        frame: &Frame,
        range: ByteRange,
        _endpoints: &IpEndpoints,
    ) -> Result<Decoded, Error> {
        let bytes = frame.slice(range);
        if bytes.len() < ICMP_HEADER_LENGTH {
            return Err(Error::too_short(ICMP_HEADER_LENGTH, bytes));
        }

        let word = |i: usize| (bytes[i] as u16) << 8 | (bytes[i + 1] as u16);
        // process the next 4 bytes depending on the type of ICMP packet
        let rest_of_header = match bytes[0] {
            ICMP_ECHO_REPLY => IcmpType::EchoReply(IcmpEcho {
                identifier: word(4),
                sequence_number: word(6),
            }),
            ICMP_ECHO_REQUEST => IcmpType::EchoRequest(IcmpEcho {
                identifier: word(4),
                sequence_number: word(6),
            }),
            ICMP_REDIRECT => IcmpType::Redirect(IcmpRedirect {
                gateway_address: IPv4Address::from([bytes[4], bytes[5], bytes[6], bytes[7]]),
            }),
            ICMP_DESTINATION_UNREACHABLE | ICMP_SOURCE_QUENCH | ICMP_TIME_EXCEEDED => {
                IcmpType::Empty
            }
            _ => IcmpType::Unsupported(IcmpUnsupported {
                rest_of_header: u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            }),
        };
        let icmp = ICMP {
            icmp_type: bytes[0],
            code: bytes[1],
            checksum: word(2),
            rest_of_header,
        };
        Ok(Decoded::new(icmp, range).child(Dispatch::Raw, range.skip(ICMP_HEADER_LENGTH)))
    }

    fn type_name(&self) -> &'static str {
        match self.icmp_type {
            ICMP_ECHO_REPLY => "Echo Reply",
            ICMP_ECHO_REQUEST => "Echo Request",
            ICMP_DESTINATION_UNREACHABLE => "Destination Unreachable",
            ICMP_SOURCE_QUENCH => "Source Quench",
            ICMP_REDIRECT => "Redirect",
            ICMP_TIME_EXCEEDED => "Time Exceeded",
            _ => "Unknown",
        }
    }
}

impl Layer for ICMP {
    fn name(&self) -> &'static str {
        "ICMP"
    }

    fn short_name(&self) -> &'static str {
        "icmp"
    }

    fn attributes(&self, _bytes: &[u8], attrs: &mut Attributes) {
        attrs.add("Type", format!("{} ({})", self.icmp_type, self.type_name()));
        attrs.add("Code", self.code);
        attrs.add("Checksum", format!("0x{:04x}", self.checksum));
        match self.rest_of_header {
            IcmpType::EchoRequest(ref echo) | IcmpType::EchoReply(ref echo) => {
                attrs.add("Identifier", echo.identifier);
                attrs.add("Sequence Number", echo.sequence_number);
            }
            IcmpType::Redirect(ref redirect) => attrs.add("Gateway", redirect.gateway_address),
            IcmpType::Empty | IcmpType::Unsupported(_) => {}
        }
    }
}
