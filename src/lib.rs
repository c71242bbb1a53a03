//! Fathom: A crate for dissecting captured frames into a tree of protocol layers.
//!
//! A basic unit in fathom is a [`Frame`], the bytes of one captured link-layer record. Its
//! layers are decoded lazily by iterating over [`Frame::packets`], each [`PacketNode`] naming a
//! [`Layer`] and the [`ByteRange`] of the Frame it was decoded from.
//!
//! Application protocols carried over TCP and UDP are identified per session: a
//! [`SessionTable`] shared by all the Frames of a capture remembers what each session was found
//! to carry.
//!
//! ```
//! use fathom::{dissect, Timestamp, ENCAP_TYPE_RAW};
//!
//! let bytes = vec![0x45, 0x00, 0x00, 0x14, 0x00, 0x01, 0x00, 0x00, 0x40, 0xff, 0x00, 0x00,
//!                  0x0a, 0x00, 0x00, 0x01, 0x0a, 0x00, 0x00, 0x02];
//! let frame = dissect(bytes, Timestamp::default(), ENCAP_TYPE_RAW, false);
//! let names: Vec<_> = frame.packets(None).map(|p| p.name()).collect();
//! assert_eq!(names, ["IPv4"]);
//! ```

pub mod anomaly;
pub mod config;
pub mod dispatch;
pub mod errors;
pub mod layer;
pub mod layers;
pub mod node;
pub mod packet;
pub mod range;
pub mod reassembly;
pub mod session;
pub mod types;

pub use anomaly::{Anomaly, AnomalySink};
pub use config::{Config, DissectOptions};
pub use errors::{Error, ErrorKind};
pub use layer::{Attributes, Layer, LayerKind};
pub use node::{PacketNode, SubPackets};
pub use packet::{dissect, Frame};
pub use range::ByteRange;
pub use session::{AppProtocol, FinderPolicy, Precedence, SessionKey, SessionTable, Transport};
pub use types::{Timestamp, EncapType, ENCAP_TYPE_ETH, ENCAP_TYPE_LINUX_SLL, ENCAP_TYPE_RAW};
