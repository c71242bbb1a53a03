//! Fathom Layers
//!
//! Link, network and transport layers are picked by a field of the layer carrying them, e.g.
//! the EtherType of [`ethernet::Ethernet`]. Application layers have no such field; they are
//! identified per session by [`crate::session`].

pub mod arp;
pub mod dns;
pub mod ethernet;
pub mod http;
pub mod icmp;
pub mod ipv4;
pub mod ipv6;
pub mod linux_sll;
pub mod mpls;
pub mod raw;
pub mod sip;
pub mod smb;
pub mod tcp;
pub mod text;
pub mod tls;
pub mod udp;
pub mod vlan;
pub mod vxlan;
