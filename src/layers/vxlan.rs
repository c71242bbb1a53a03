//! VXLAN layer

use serde::Serialize;

use crate::errors::Error;
use crate::layer::{Attributes, Decoded, Dispatch, Layer};
use crate::packet::Frame;
use crate::range::ByteRange;
use crate::types::ENCAP_TYPE_ETH;

/// VXLAN header length
pub const VXLAN_HEADER_LENGTH: usize = 8_usize;

/// IANA Assigned port number for VXLAN
pub const VXLAN_PORT: u16 = 4789;

/// The "I" flag, set when the VNI is valid.
const VXLAN_FLAG_VNI: u8 = 0x08;

/// Structure representing VXLAN Header
#[derive(Debug, Default, Clone, Serialize)]
pub struct VXLAN {
    #[serde(serialize_with = "crate::types::hex::serialize_lower_hex_u8")]
    flags: u8,
    // 24 bits on the wire
    vni: u32,
}

impl VXLAN {
    /// Decodes a VXLAN header; the encapsulated Ethernet frame is its payload.
    pub(crate) fn decode(frame: &Frame, range: ByteRange) -> Result<Decoded, Error> {
        let bytes = frame.slice(range);
        if bytes.len() < VXLAN_HEADER_LENGTH {
            return Err(Error::too_short(VXLAN_HEADER_LENGTH, bytes));
        }
        if bytes[0] & VXLAN_FLAG_VNI == 0 {
            return Err(Error::Unrecognized);
        }

        let vxlan = VXLAN {
            flags: bytes[0],
            vni: (bytes[4] as u32) << 16 | (bytes[5] as u32) << 8 | bytes[6] as u32,
        };
        Ok(Decoded::new(vxlan, range)
            .child(Dispatch::Link(ENCAP_TYPE_ETH), range.skip(VXLAN_HEADER_LENGTH)))
    }

    pub fn vni(&self) -> u32 {
        self.vni
    }
}

impl Layer for VXLAN {
    fn name(&self) -> &'static str {
        "VXLAN"
    }

    fn short_name(&self) -> &'static str {
        "vxlan"
    }

    fn attributes(&self, _bytes: &[u8], attrs: &mut Attributes) {
        attrs.add("Flags", format!("0x{:02x}", self.flags));
        attrs.add("VNI", self.vni);
    }
}
