//! All types that we are supporting

mod macaddr;
pub use macaddr::*;

mod ethertype;
pub use ethertype::*;

mod ipaddr;
pub use ipaddr::*;

pub mod hex;

/// Packet Encapsulation Type
///
/// This value is same as the link types supported by [libpcap][libpcap]
///
/// [libpcap]: https://www.tcpdump.org/linktypes.html
pub type EncapType = u16;

pub const ENCAP_TYPE_ETH: EncapType = 1;
pub const ENCAP_TYPE_RAW: EncapType = 101;
pub const ENCAP_TYPE_LINUX_SLL: EncapType = 113;

/// Capture timestamp of a Frame.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
pub struct Timestamp {
    pub secs: i64,
    pub nsecs: i64,
}

impl Timestamp {
    pub const fn new(secs: i64, nsecs: i64) -> Self {
        Self { secs, nsecs }
    }
}
