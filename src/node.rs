//! Packet nodes and the lazy sequence producing them.
//!
//! A [`PacketNode`] is one decoded layer of a [`Frame`]. Nodes are produced by [`SubPackets`], an
//! iterator that keeps an explicit stack of layers still to be decoded. A layer is decoded only
//! when the iterator is advanced to it, so a consumer that stops early never pays for the layers
//! it did not look at.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::dispatch;
use crate::layer::{Attributes, Decoded, LayerKind, NextLayer};
use crate::layers::raw::Raw;
use crate::packet::Frame;
use crate::range::ByteRange;
use crate::session::SessionTable;

#[derive(Debug, Clone)]
pub struct PacketNode {
    frame_number: u64,
    range: ByteRange,
    layer: LayerKind,
    attributes: Option<Attributes>,
    depth: usize,
    reassembled: bool,
    children: Vec<NextLayer>,
}

impl PacketNode {
    /// Type label of the node, e.g. `"IPv4"`.
    pub fn name(&self) -> &'static str {
        self.layer.as_layer().name()
    }

    pub fn short_name(&self) -> &'static str {
        self.layer.as_layer().short_name()
    }

    pub fn range(&self) -> ByteRange {
        self.range
    }

    pub fn layer(&self) -> &LayerKind {
        &self.layer
    }

    /// `None` when the Frame was dissected in quick-parse mode.
    pub fn attributes(&self) -> Option<&Attributes> {
        self.attributes.as_ref()
    }

    /// Nesting level, the link layer being at depth 0.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    /// Whether the node was decoded from a reassembled buffer rather than from its own range.
    pub fn is_reassembled(&self) -> bool {
        self.reassembled
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Bytes handed to the payload layers of this node.
    pub fn payload_range(&self) -> Option<ByteRange> {
        let first = self.children.iter().find(|c| !c.dispatch.is_reassembled())?;
        ByteRange::new(first.range.start(), self.range.end())
    }

    /// Bytes decoded by this layer itself, i.e. not handed to any payload layer.
    ///
    /// Over all the nodes of a Frame that are not reassembled, these ranges partition the Frame.
    pub fn own_range(&self) -> Option<ByteRange> {
        match self.payload_range() {
            None => Some(self.range),
            Some(payload) if payload.start() > self.range.start() => {
                ByteRange::new(self.range.start(), payload.start() - 1)
            }
            Some(_) => None,
        }
    }

    /// The layers below this node, depth first, optionally preceded by the node itself.
    pub fn sub_packets<'f>(
        &self,
        frame: &'f Frame,
        sessions: Option<&'f SessionTable>,
        include_self: bool,
    ) -> SubPackets<'f> {
        let first = if include_self { Some(self.clone()) } else { None };
        SubPackets::new(
            frame,
            sessions,
            first,
            self.children.clone(),
            self.depth + 1,
        )
    }
}

impl Serialize for PacketNode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("name", self.name())?;
        map.serialize_entry("range", &[self.range.start(), self.range.end()])?;
        if let Some(ref attributes) = self.attributes {
            map.serialize_entry("attributes", attributes)?;
        }
        map.serialize_entry(self.short_name(), self.layer.as_layer())?;
        map.end()
    }
}

#[derive(Debug)]
struct Pending {
    next: NextLayer,
    depth: usize,
}

/// Lazy, forward-only sequence of [`PacketNode`]s.
///
/// Every call to `next` decodes exactly one layer. The sequence is finite: a payload is always
/// strictly smaller than the layer carrying it and a following layer always starts after the one
/// before it.
#[derive(Debug)]
pub struct SubPackets<'f> {
    frame: &'f Frame,
    sessions: Option<&'f SessionTable>,
    first: Option<PacketNode>,
    stack: Vec<Pending>,
}

impl<'f> SubPackets<'f> {
    pub(crate) fn new(
        frame: &'f Frame,
        sessions: Option<&'f SessionTable>,
        first: Option<PacketNode>,
        layers: Vec<NextLayer>,
        depth: usize,
    ) -> Self {
        let stack = layers
            .into_iter()
            .rev()
            .map(|next| Pending { next, depth })
            .collect();
        Self {
            frame,
            sessions,
            first,
            stack,
        }
    }

    fn decode(&self, pending: &Pending) -> Decoded {
        if pending.depth > self.frame.options().max_depth {
            self.frame.record_anomaly(
                pending.next.range,
                format!("layer nesting deeper than {}", self.frame.options().max_depth),
            );
            return Decoded::new(Raw::new(pending.next.range.len()), pending.next.range);
        }
        dispatch::decode_next(self.frame, self.sessions, &pending.next)
    }
}

impl<'f> Iterator for SubPackets<'f> {
    type Item = PacketNode;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(node) = self.first.take() {
            return Some(node);
        }

        let pending = self.stack.pop()?;
        let Decoded {
            layer,
            range,
            children,
            following,
        } = self.decode(&pending);
        let given = pending.next.range;

        let range = if given.contains(&range) {
            range
        } else {
            self.frame
                .record_anomaly(given, format!("{} claimed bytes outside its range", layer));
            given
        };

        if let Some(following) = following {
            if following.range.start() > range.end() && given.contains(&following.range) {
                self.stack.push(Pending {
                    next: following,
                    depth: pending.depth,
                });
            } else {
                self.frame.record_anomaly(
                    given,
                    format!("{} produced a following layer out of order", layer),
                );
            }
        }

        let mut kept = Vec::with_capacity(children.len());
        for child in children {
            if range.contains(&child.range) && child.range != range {
                kept.push(child);
            } else {
                self.frame
                    .record_anomaly(child.range, format!("{} produced a misplaced payload", layer));
            }
        }
        for child in kept.iter().rev() {
            self.stack.push(Pending {
                next: child.clone(),
                depth: pending.depth + 1,
            });
        }

        let attributes = if self.frame.quick_parse() {
            None
        } else {
            let mut attrs = Attributes::new();
            layer
                .as_layer()
                .attributes(self.frame.slice(range), &mut attrs);
            Some(attrs)
        };

        Some(PacketNode {
            frame_number: self.frame.number(),
            range,
            layer,
            attributes,
            depth: pending.depth,
            reassembled: pending.next.dispatch.is_reassembled(),
            children: kept,
        })
    }
}

impl<'f> core::iter::FusedIterator for SubPackets<'f> {}

#[cfg(test)]
mod tests {
    use crate::types::{Timestamp, ENCAP_TYPE_ETH};

    // Ethernet / IPv4 / UDP / DNS query for picslife.ru, followed by 4 bytes of padding.
    const DNS_QUERY: &str = "002219b67e22000f35bb0b400800450000448 9c400003811 2f3d6dc2a0045fd35c0ee1a600350030a597f6180010000100000000000108706963736c69666502727500000100010000291000000080000000deadbeef";

    fn frame(quick: bool) -> crate::Frame {
        let bytes = hex::decode(DNS_QUERY.replace(' ', "")).unwrap();
        crate::dissect(bytes, Timestamp::default(), ENCAP_TYPE_ETH, quick)
    }

    #[test]
    fn depth_first_with_trailer() {
        let f = frame(false);
        let nodes: Vec<_> = f.packets(None).collect();
        let names: Vec<_> = nodes.iter().map(|n| n.name()).collect();
        assert_eq!(names, ["Ethernet2", "IPv4", "UDP", "DNS", "Raw"]);
        let depths: Vec<_> = nodes.iter().map(|n| n.depth()).collect();
        assert_eq!(depths, [0, 1, 2, 3, 1]);
        assert!(f.anomalies().is_empty(), "{:?}", f.anomalies().entries());
    }

    #[test]
    fn own_ranges_partition_the_frame() {
        let f = frame(true);
        let mut owned: Vec<_> = f.packets(None).filter_map(|n| n.own_range()).collect();
        owned.sort();
        let mut next = 0;
        for r in owned {
            assert_eq!(r.start(), next);
            next = r.end() + 1;
        }
        assert_eq!(next, f.len());
    }

    #[test]
    fn quick_parse_skips_attributes() {
        assert!(frame(true).packets(None).all(|n| n.attributes().is_none()));
        let f = frame(false);
        let eth = f.packets(None).next().unwrap();
        let attrs = eth.attributes().unwrap();
        assert_eq!(attrs.get("Destination"), Some("00:22:19:b6:7e:22"));
    }

    #[test]
    fn sub_packets_from_a_node() {
        let f = frame(true);
        let ip = f.packets(None).nth(1).unwrap();
        let below: Vec<_> = ip.sub_packets(&f, None, false).map(|n| n.name()).collect();
        assert_eq!(below, ["UDP", "DNS"]);
        let with_self: Vec<_> = ip.sub_packets(&f, None, true).map(|n| n.name()).collect();
        assert_eq!(with_self, ["IPv4", "UDP", "DNS"]);
    }

    #[test]
    fn stopping_early_does_not_decode_the_rest() {
        let f = frame(true);
        let mut it = f.packets(None);
        assert_eq!(it.next().map(|n| n.name()), Some("Ethernet2"));
        drop(it);
        assert!(f.anomalies().is_empty());
    }

    #[test]
    fn serializes_to_json() {
        let f = frame(false);
        let nodes: Vec<_> = f.packets(None).collect();
        let json = serde_json::to_value(&nodes).unwrap();
        assert_eq!(json[0]["name"], "Ethernet2");
        assert_eq!(json[0]["range"][0], 0);
        assert!(json[1]["ip"].is_object());
    }
}
