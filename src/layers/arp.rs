//! Address Resolution Protocol (ARP) Handling

use core::convert::TryInto;

use serde::Serialize;

use crate::errors::Error;
use crate::layer::{Attributes, Decoded, Dispatch, Layer};
use crate::packet::Frame;
use crate::range::ByteRange;
use crate::types::{IPv4Address, MACAddress};

/// Header Length of ARP for IPv4 over Ethernet
pub const ARP_HDR_LENGTH: usize = 28_usize;

#[derive(Debug, Default, Clone, Serialize)]
pub struct ARP {
    #[serde(serialize_with = "crate::types::hex::serialize_upper_hex_u16")]
    htype: u16,
    #[serde(serialize_with = "crate::types::hex::serialize_upper_hex_u16")]
    ptype: u16,
    hlen: u8,
    plen: u8,
    oper: u16,
    sender_ha: MACAddress,
    target_ha: MACAddress,
    sender_pa: IPv4Address,
    target_pa: IPv4Address,
}

impl ARP {
    pub(crate) fn creator(frame: &Frame, range: ByteRange) -> Result<Decoded, Error> {
        let bytes = frame.slice(range);
        if bytes.len() < ARP_HDR_LENGTH {
            return Err(Error::too_short(ARP_HDR_LENGTH, bytes));
        }

        let arp = ARP {
            htype: (bytes[0] as u16) << 8 | (bytes[1] as u16),
            ptype: (bytes[2] as u16) << 8 | (bytes[3] as u16),
            hlen: bytes[4],
            plen: bytes[5],
            oper: (bytes[6] as u16) << 8 | (bytes[7] as u16),
            sender_ha: bytes[8..14].try_into()?,
            sender_pa: bytes[14..18].try_into()?,
            target_ha: bytes[18..24].try_into()?,
            target_pa: bytes[24..28].try_into()?,
        };
        if arp.hlen != 6 || arp.plen != 4 {
            return Err(Error::parse(format!(
                "ARP address lengths {}/{} not Ethernet/IPv4",
                arp.hlen, arp.plen
            )));
        }

        let own = range.take(ARP_HDR_LENGTH).unwrap_or(range);
        Ok(Decoded::new(arp, own).following(Dispatch::Raw, range.after(&own)))
    }

    fn operation(&self) -> &'static str {
        match self.oper {
            1 => "Request",
            2 => "Reply",
            3 => "RARP Request",
            4 => "RARP Reply",
            _ => "Unknown",
        }
    }
}

impl Layer for ARP {
    fn name(&self) -> &'static str {
        "ARP"
    }

    fn short_name(&self) -> &'static str {
        "arp"
    }

    fn attributes(&self, _bytes: &[u8], attrs: &mut Attributes) {
        attrs.add("Operation", self.operation());
        attrs.add("Sender MAC", self.sender_ha);
        attrs.add("Sender IP", self.sender_pa);
        attrs.add("Target MAC", self.target_ha);
        attrs.add("Target IP", self.target_pa);
    }
}
