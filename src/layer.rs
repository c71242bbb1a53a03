//! 'Layer' trait
//!
//! [`Layer`] trait is central to [`fathom`][`crate`]. All the dissectors for individual protocols
//! implement the `Layer` trait. A decoder looks at the bytes of a [`ByteRange`] of a
//! [`Frame`][`crate::Frame`] and returns a [`Decoded`]: the decoded struct wrapped in a
//! [`LayerKind`], the (possibly shrunk) range it actually covers and a description of the layers
//! that follow, as [`NextLayer`] values. Those are only decoded when the consumer of the lazy
//! sequence asks for them.

use core::fmt::{self, Debug, Display};

use std::sync::Arc;

use erased_serde::serialize_trait_object;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::layers::{
    arp, dns, ethernet, http, icmp, ipv4, ipv6, linux_sll, mpls, raw, sip, smb, tcp, tls, udp,
    vlan, vxlan,
};
use crate::range::ByteRange;
use crate::session::{IpEndpoints, SessionKey};
use crate::types::{EncapType, EtherType};

/// `Layer` Trait defines a 'Layer' in a Packet
///
/// Typically a Layer will correspond to Data Link Layer, Network Layer, Transport Layer or the
/// Application Layer. Each of the supported 'protocols' have implementation for this trait.
pub trait Layer: Send + Sync + Debug + erased_serde::Serialize {
    /// Name for the given layer, used as the node's type label.
    fn name(&self) -> &'static str;

    /// Short name for the given layer.
    fn short_name(&self) -> &'static str;

    /// Human readable fields of the layer.
    ///
    /// `bytes` are the bytes covered by the layer's node. This is never called in quick-parse
    /// mode.
    fn attributes(&self, bytes: &[u8], attrs: &mut Attributes);
}

serialize_trait_object!(Layer);

/// Ordered `name -> text` pairs describing a decoded layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes(Vec<(&'static str, String)>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<V: Display>(&mut self, name: &'static str, value: V) {
        self.0.push((name, value.to_string()));
    }

    /// Value of the first attribute called `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.0.iter().map(|(n, v)| (*n, v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for Attributes {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in &self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

macro_rules! layer_kinds {
    ($($variant:ident($ty:ty),)*) => {
        /// Every protocol this crate decodes.
        ///
        /// The set is closed: adding a protocol means adding a variant here and an entry in the
        /// table of the layer below it.
        #[derive(Debug, Clone)]
        pub enum LayerKind {
            $($variant($ty),)*
        }

        impl LayerKind {
            pub fn as_layer(&self) -> &dyn Layer {
                match self {
                    $(LayerKind::$variant(l) => l,)*
                }
            }
        }

        $(
            impl From<$ty> for LayerKind {
                fn from(layer: $ty) -> Self {
                    LayerKind::$variant(layer)
                }
            }
        )*
    };
}

layer_kinds! {
    Ethernet(ethernet::Ethernet),
    Ieee8023(ethernet::Ieee8023),
    LinuxSll(linux_sll::LinuxSll),
    Vlan(vlan::Vlan),
    Arp(arp::ARP),
    Mpls(mpls::MPLS),
    IPv4(ipv4::IPv4),
    IPv6(ipv6::IPv6),
    Icmp(icmp::ICMP),
    Tcp(tcp::TCP),
    Udp(udp::UDP),
    Vxlan(vxlan::VXLAN),
    Dns(dns::DNS),
    Http(http::Http),
    Sip(sip::Sip),
    TlsRecord(tls::TlsRecord),
    TlsHandshake(tls::Handshake),
    NetBios(smb::NetBiosSession),
    Smb(smb::SmbHeader),
    SmbCommand(smb::SmbCommand),
    Raw(raw::Raw),
}

impl Serialize for LayerKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let layer = self.as_layer();
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(layer.short_name(), layer)?;
        map.end()
    }
}

/// How the bytes of a [`NextLayer`] are to be interpreted.
///
/// Each variant is one encapsulation context and carries the key for that context's table.
#[derive(Debug, Clone)]
pub enum Dispatch {
    /// libpcap link type of the Frame.
    Link(EncapType),
    EtherType(EtherType),
    /// IP protocol / IPv6 next header, with the addresses of the enclosing IP header.
    IpProtocol { protocol: u8, endpoints: IpEndpoints },
    /// Transport payload, interpreted by the session's protocol finder.
    Session(SessionKey),
    /// TLS record following another record. `continuation` records were already consumed by a
    /// handshake reassembly started in an earlier record.
    TlsRecord { continuation: usize },
    /// Handshake messages fully contained in one record's content.
    TlsHandshake,
    /// A handshake message re-parsed from a reassembled buffer.
    ReassembledHandshake {
        messages: Arc<[tls::Handshake]>,
        index: usize,
    },
    /// SMB message carried by a NetBIOS session message.
    Smb,
    /// One command of an SMB AndX chain.
    SmbCommand(smb::AndXLink),
    /// Opaque bytes.
    Raw,
}

impl Dispatch {
    pub fn is_reassembled(&self) -> bool {
        matches!(self, Dispatch::ReassembledHandshake { .. })
    }
}

/// A layer still to be decoded: the context to decode it in and the bytes it may use.
#[derive(Debug, Clone)]
pub struct NextLayer {
    pub dispatch: Dispatch,
    pub range: ByteRange,
}

impl NextLayer {
    pub fn new(dispatch: Dispatch, range: ByteRange) -> Self {
        Self { dispatch, range }
    }
}

/// Result of decoding one layer.
#[derive(Debug)]
pub struct Decoded {
    pub(crate) layer: LayerKind,
    pub(crate) range: ByteRange,
    pub(crate) children: Vec<NextLayer>,
    pub(crate) following: Option<NextLayer>,
}

impl Decoded {
    /// A decoded layer covering `range`, without any layer after it.
    pub fn new<L: Into<LayerKind>>(layer: L, range: ByteRange) -> Self {
        Self {
            layer: layer.into(),
            range,
            children: vec![],
            following: None,
        }
    }

    /// Adds a payload layer. Nothing is added when there are no bytes for it.
    pub fn child(mut self, dispatch: Dispatch, range: Option<ByteRange>) -> Self {
        if let Some(range) = range {
            self.children.push(NextLayer::new(dispatch, range));
        }
        self
    }

    /// Bytes after this layer that belong to its parent, e.g. trailing padding or the next
    /// record of a stream of records.
    pub fn following(mut self, dispatch: Dispatch, range: Option<ByteRange>) -> Self {
        self.following = range.map(|range| NextLayer::new(dispatch, range));
        self
    }

    pub fn layer(&self) -> &LayerKind {
        &self.layer
    }

    pub fn range(&self) -> ByteRange {
        self.range
    }

    pub fn children(&self) -> &[NextLayer] {
        &self.children
    }

    pub fn following_layer(&self) -> Option<&NextLayer> {
        self.following.as_ref()
    }
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_layer().name())
    }
}
