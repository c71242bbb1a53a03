//! EtherType structure and definition of Well Known EtherTypes

use core::fmt;

use serde::{Serialize, Serializer};

#[derive(PartialEq, Eq, Clone, Copy, Default, Hash, PartialOrd, Ord)]
pub struct EtherType(pub u16);

impl EtherType {
    /// Values below this are an IEEE 802.3 length, not a type.
    pub const MIN_TYPE: u16 = 0x0600;

    /// Whether the field holds an 802.3 payload length instead of a type.
    pub const fn is_length(&self) -> bool {
        self.0 < Self::MIN_TYPE
    }
}

impl fmt::Display for EtherType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04X}", self.0)
    }
}

impl fmt::Debug for EtherType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl Serialize for EtherType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(format!("{}", self).as_str())
    }
}

pub const ETHERTYPE_IP: EtherType = EtherType(0x0800_u16);
pub const ETHERTYPE_ARP: EtherType = EtherType(0x0806_u16);
pub const ETHERTYPE_VLAN: EtherType = EtherType(0x8100_u16);
pub const ETHERTYPE_QINQ: EtherType = EtherType(0x88a8_u16);
pub const ETHERTYPE_IP6: EtherType = EtherType(0x86dd_u16);
pub const ETHERTYPE_MPLS_UNICAST: EtherType = EtherType(0x8847_u16);
pub const ETHERTYPE_MPLS_MULTICAST: EtherType = EtherType(0x8848_u16);
