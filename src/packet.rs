//! Frame Structure
//!
//! A [`Frame`] owns the bytes of one captured link-layer record together with its metadata and
//! the anomalies found while dissecting it. Decoded layers only refer to the Frame's buffer
//! through [`ByteRange`]s, so the buffer is never copied and never written to.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::anomaly::AnomalySink;
use crate::config::DissectOptions;
use crate::dispatch::LayerCreatorFn;
use crate::layer::{Dispatch, NextLayer};
use crate::layers::{ethernet::Ethernet, ipv4, linux_sll::LinuxSll};
use crate::node::SubPackets;
use crate::range::ByteRange;
use crate::session::SessionTable;
use crate::types::{EncapType, Timestamp, ENCAP_TYPE_ETH, ENCAP_TYPE_LINUX_SLL, ENCAP_TYPE_RAW};

/// A Map maintaining libpcap link type -> creator fns of the link layer decoders.
fn encap_types_map() -> &'static HashMap<EncapType, LayerCreatorFn> {
    static ENCAP_TYPES_MAP: OnceLock<HashMap<EncapType, LayerCreatorFn>> = OnceLock::new();
    ENCAP_TYPES_MAP.get_or_init(|| {
        let entries: [(EncapType, LayerCreatorFn); 3] = [
            (ENCAP_TYPE_ETH, Ethernet::creator),
            (ENCAP_TYPE_LINUX_SLL, LinuxSll::creator),
            (ENCAP_TYPE_RAW, ipv4::raw_ip_creator),
        ];
        entries.into_iter().collect()
    })
}

pub(crate) fn encap_creator(encap: EncapType) -> Option<LayerCreatorFn> {
    encap_types_map().get(&encap).copied()
}

#[derive(Debug)]
pub struct Frame {
    number: u64,
    timestamp: Timestamp,
    link_type: EncapType,
    data: Vec<u8>,
    options: DissectOptions,
    anomalies: AnomalySink,
}

impl Frame {
    pub fn new(
        number: u64,
        data: Vec<u8>,
        timestamp: Timestamp,
        link_type: EncapType,
        options: DissectOptions,
    ) -> Self {
        Self {
            number,
            timestamp,
            link_type,
            data,
            options,
            anomalies: AnomalySink::new(),
        }
    }

    pub fn number(&self) -> u64 {
        self.number
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn link_type(&self) -> EncapType {
        self.link_type
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn options(&self) -> &DissectOptions {
        &self.options
    }

    pub fn quick_parse(&self) -> bool {
        self.options.quick_parse
    }

    /// The bytes of `range`, empty when the range does not lie within this Frame.
    pub fn slice(&self, range: ByteRange) -> &[u8] {
        self.data.get(range.start()..=range.end()).unwrap_or(&[])
    }

    /// Range covering the whole Frame, `None` for an empty Frame.
    pub fn root_range(&self) -> Option<ByteRange> {
        ByteRange::from_len(0, self.data.len())
    }

    /// All the layers of this Frame, decoded lazily and depth first from the link layer down.
    ///
    /// Transport payloads are identified through `sessions` when given; without a table every
    /// segment is identified on its own.
    pub fn packets<'f>(&'f self, sessions: Option<&'f SessionTable>) -> SubPackets<'f> {
        let root = self
            .root_range()
            .map(|range| NextLayer::new(Dispatch::Link(self.link_type), range));
        SubPackets::new(self, sessions, None, root.into_iter().collect(), 0)
    }

    pub fn anomalies(&self) -> &AnomalySink {
        &self.anomalies
    }

    pub fn record_anomaly<S: Into<String>>(&self, range: ByteRange, message: S) {
        self.anomalies.record(self.number, range, message);
    }
}

/// Wraps `data` in a [`Frame`] ready to be dissected with [`Frame::packets`].
pub fn dissect(data: Vec<u8>, timestamp: Timestamp, link_type: EncapType, quick_parse: bool) -> Frame {
    let options = DissectOptions {
        quick_parse,
        ..DissectOptions::default()
    };
    Frame::new(0, data, timestamp, link_type, options)
}

#[cfg(test)]
mod tests {

    use super::*;

    fn names(frame: &Frame) -> Vec<&'static str> {
        frame.packets(None).map(|p| p.name()).collect()
    }

    #[test]
    fn empty_frame_has_no_layers() {
        let f = dissect(vec![], Timestamp::default(), ENCAP_TYPE_ETH, false);
        assert_eq!(f.packets(None).count(), 0);
    }

    #[test]
    fn short_frame_is_raw() {
        let f = dissect(vec![0; 13], Timestamp::default(), ENCAP_TYPE_ETH, false);
        assert_eq!(names(&f), ["Raw"]);
        assert_eq!(f.anomalies().len(), 1);
    }

    #[test]
    fn unknown_link_type_is_raw_without_anomaly() {
        let f = dissect(vec![1, 2, 3], Timestamp::default(), 9999, false);
        assert_eq!(names(&f), ["Raw"]);
        assert!(f.anomalies().is_empty());
    }

    #[test]
    fn parse_valid_ipv4_packet() {
        let array = hex::decode("00e08100b02800096b88f5c90800450000c1d24940008006c85b0a000005cf2e865e0cc30050a80076877de014025018faf0ad62000048454144202f76342f69756964656e742e6361623f3033303730313132303820485454502f312e310d0a4163636570743a202a2f2a0d0a557365722d4167656e743a20496e6475737472792055706461746520436f6e74726f6c0d0a486f73743a2077696e646f77737570646174652e6d6963726f736f66742e636f6d0d0a436f6e6e656374696f6e3a204b6565702d416c6976650d0a0d0a").unwrap();
        let f = dissect(array, Timestamp::default(), ENCAP_TYPE_ETH, false);

        assert_eq!(names(&f), ["Ethernet2", "IPv4", "TCP", "HTTP"]);
        assert!(f.anomalies().is_empty(), "{:?}", f.anomalies().entries());
    }

    #[test]
    fn parse_valid_ipv6_packet() {
        let array = hex::decode("000573a007d168a3c4f949f686dd600000000020064020010470e5bfdead49572174e82c48872607f8b0400c0c03000000000000001af9c7001903a088300000000080022000da4700000204058c0103030801010402").unwrap();
        let f = dissect(array, Timestamp::default(), ENCAP_TYPE_ETH, false);

        assert_eq!(names(&f), ["Ethernet2", "IPv6", "TCP"]);
    }

    #[test]
    fn raw_ip_link_type() {
        let array = hex::decode("450000c1d24940008006c85b0a000005cf2e865e0cc30050a80076877de014025018faf0ad62000048454144202f76342f69756964656e742e6361623f3033303730313132303820485454502f312e310d0a4163636570743a202a2f2a0d0a557365722d4167656e743a20496e6475737472792055706461746520436f6e74726f6c0d0a486f73743a2077696e646f77737570646174652e6d6963726f736f66742e636f6d0d0a436f6e6e656374696f6e3a204b6565702d416c6976650d0a0d0a").unwrap();
        let f = dissect(array, Timestamp::default(), ENCAP_TYPE_RAW, true);

        assert_eq!(names(&f), ["IPv4", "TCP", "HTTP"]);
    }
}
