//! Handling of DNS layer
//!
//! Messages are read the same way over UDP and over TCP, except that over TCP the message is
//! preceded by a two byte length (RFC 1035, section 4.2.2).

use core::convert::TryInto;
use core::fmt;

use serde::{Serialize, Serializer};

use crate::errors::Error;
use crate::layer::{Attributes, Decoded, Dispatch, Layer};
use crate::packet::Frame;
use crate::range::ByteRange;
use crate::types::{IPv4Address, IPv6Address};

pub const DNS_HEADER_LENGTH: usize = 12_usize;

// Compression pointers followed while reading a single name. A well formed message never needs
// more than a handful; anything above this is a loop.
const MAX_NAME_POINTERS: usize = 16;
const MAX_NAME_LENGTH: usize = 255;

const DNS_TYPE_A: u16 = 1;
const DNS_TYPE_NS: u16 = 2;
const DNS_TYPE_CNAME: u16 = 5;
const DNS_TYPE_SOA: u16 = 6;
const DNS_TYPE_PTR: u16 = 12;
const DNS_TYPE_MX: u16 = 15;
const DNS_TYPE_TXT: u16 = 16;
const DNS_TYPE_AAAA: u16 = 28;
const DNS_TYPE_SRV: u16 = 33;
const DNS_TYPE_OPT: u16 = 41;

/// A domain name with all compression pointers resolved.
#[derive(Default, Clone, PartialEq, Eq)]
pub struct DNSName(String);

impl DNSName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DNSName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("<Root>")
        } else {
            f.write_str(&self.0)
        }
    }
}

impl fmt::Debug for DNSName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl Serialize for DNSName {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct DNSSOA {
    mname: DNSName,
    rname: DNSName,
    serial: u32,
    refresh: u32,
    retry: u32,
    expire: u32,
    minimum: u32,
}

#[derive(Debug, Clone, Serialize)]
pub enum DNSRecordData {
    A(IPv4Address),
    AAAA(IPv6Address),
    NS(DNSName),
    CNAME(DNSName),
    PTR(DNSName),
    MX { preference: u16, exchange: DNSName },
    SRV {
        priority: u16,
        weight: u16,
        port: u16,
        target: DNSName,
    },
    SOA(DNSSOA),
    TXT(Vec<String>),
    /// EDNS(0) pseudo record; its class holds the requestor's UDP payload size.
    OPT {
        udp_payload_size: u16,
        extended_rcode: u8,
        version: u8,
        do_bit: bool,
    },
    Other(#[serde(serialize_with = "hex::serialize")] Vec<u8>),
}

impl fmt::Display for DNSRecordData {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DNSRecordData::A(a) => write!(f, "{}", a),
            DNSRecordData::AAAA(a) => write!(f, "{}", a),
            DNSRecordData::NS(n) | DNSRecordData::CNAME(n) | DNSRecordData::PTR(n) => {
                write!(f, "{}", n)
            }
            DNSRecordData::MX {
                preference,
                exchange,
            } => write!(f, "{} {}", preference, exchange),
            DNSRecordData::SRV {
                priority,
                weight,
                port,
                target,
            } => write!(f, "{} {} {} {}", priority, weight, port, target),
            DNSRecordData::SOA(soa) => write!(f, "{} {} {}", soa.mname, soa.rname, soa.serial),
            DNSRecordData::TXT(strings) => write!(f, "{}", strings.join(" ")),
            DNSRecordData::OPT {
                udp_payload_size, ..
            } => write!(f, "udp payload size {}", udp_payload_size),
            DNSRecordData::Other(bytes) => write!(f, "{}", hex::encode(bytes)),
        }
    }
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct DNSQRecord {
    name: DNSName,
    #[serde(rename = "type")]
    type_: u16,
    class: u16,
}

impl DNSQRecord {
    pub fn name(&self) -> &DNSName {
        &self.name
    }

    pub fn record_type(&self) -> u16 {
        self.type_
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DNSResRecord {
    name: DNSName,
    #[serde(rename = "type")]
    type_: u16,
    class: u16,
    ttl: u32,
    rdlength: u16,
    rdata: DNSRecordData,
}

impl DNSResRecord {
    pub fn name(&self) -> &DNSName {
        &self.name
    }

    pub fn record_type(&self) -> u16 {
        self.type_
    }

    pub fn data(&self) -> &DNSRecordData {
        &self.rdata
    }
}

/// Bounds checked big endian reads over one DNS message.
struct Reader<'a> {
    message: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn new(message: &'a [u8], offset: usize) -> Self {
        Self { message, offset }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], Error> {
        let end = self.offset + n;
        let bytes = self
            .message
            .get(self.offset..end)
            .ok_or_else(|| Error::too_short(end, self.message))?;
        self.offset = end;
        Ok(bytes)
    }

    fn u8(&mut self) -> Result<u8, Error> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, Error> {
        let b = self.take(2)?;
        Ok((b[0] as u16) << 8 | (b[1] as u16))
    }

    fn u32(&mut self) -> Result<u32, Error> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    // See https://datatracker.ietf.org/doc/html/rfc1035#section-4.1.4
    fn name(&mut self) -> Result<DNSName, Error> {
        let mut name = String::new();
        let mut pos = self.offset;
        // Where reading resumes once the name is done: after the first pointer if any.
        let mut resume = None;
        let mut pointers = 0;

        loop {
            let len = *self
                .message
                .get(pos)
                .ok_or_else(|| Error::too_short(pos + 1, self.message))?;
            match len & 0xC0 {
                0x00 if len == 0 => {
                    pos += 1;
                    break;
                }
                0x00 => {
                    let start = pos + 1;
                    let end = start + len as usize;
                    let label = self
                        .message
                        .get(start..end)
                        .ok_or_else(|| Error::too_short(end, self.message))?;
                    if !name.is_empty() {
                        name.push('.');
                    }
                    name.push_str(&String::from_utf8_lossy(label));
                    if name.len() > MAX_NAME_LENGTH {
                        return Err(Error::parse("DNS name longer than 255 bytes"));
                    }
                    pos = end;
                }
                0xC0 => {
                    let low = *self
                        .message
                        .get(pos + 1)
                        .ok_or_else(|| Error::too_short(pos + 2, self.message))?;
                    pointers += 1;
                    if pointers > MAX_NAME_POINTERS {
                        return Err(Error::parse("DNS name compression loop"));
                    }
                    if resume.is_none() {
                        resume = Some(pos + 2);
                    }
                    pos = ((len & 0x3F) as usize) << 8 | low as usize;
                }
                _ => {
                    return Err(Error::parse(format!("DNS label type 0x{:02x}", len & 0xC0)));
                }
            }
        }

        self.offset = resume.unwrap_or(pos);
        Ok(DNSName(name))
    }

    fn question(&mut self) -> Result<DNSQRecord, Error> {
        Ok(DNSQRecord {
            name: self.name()?,
            type_: self.u16()?,
            class: self.u16()?,
        })
    }

    fn resource_record(&mut self) -> Result<DNSResRecord, Error> {
        let name = self.name()?;
        let type_ = self.u16()?;
        let class = self.u16()?;
        let ttl = self.u32()?;
        let rdlength = self.u16()?;
        let rdata_start = self.offset;
        let rdata_bytes = self.take(rdlength as usize)?;

        // Names inside rdata may point anywhere in the message, so they are read with a reader
        // over the whole message positioned at the rdata.
        let mut rdata_reader = Reader::new(self.message, rdata_start);
        let rdata = match type_ {
            DNS_TYPE_A => DNSRecordData::A(rdata_bytes.try_into()?),
            DNS_TYPE_AAAA => DNSRecordData::AAAA(rdata_bytes.try_into()?),
            DNS_TYPE_NS => DNSRecordData::NS(rdata_reader.name()?),
            DNS_TYPE_CNAME => DNSRecordData::CNAME(rdata_reader.name()?),
            DNS_TYPE_PTR => DNSRecordData::PTR(rdata_reader.name()?),
            DNS_TYPE_MX => DNSRecordData::MX {
                preference: rdata_reader.u16()?,
                exchange: rdata_reader.name()?,
            },
            DNS_TYPE_SRV => DNSRecordData::SRV {
                priority: rdata_reader.u16()?,
                weight: rdata_reader.u16()?,
                port: rdata_reader.u16()?,
                target: rdata_reader.name()?,
            },
            DNS_TYPE_SOA => DNSRecordData::SOA(DNSSOA {
                mname: rdata_reader.name()?,
                rname: rdata_reader.name()?,
                serial: rdata_reader.u32()?,
                refresh: rdata_reader.u32()?,
                retry: rdata_reader.u32()?,
                expire: rdata_reader.u32()?,
                minimum: rdata_reader.u32()?,
            }),
            DNS_TYPE_TXT => {
                let mut strings = vec![];
                let mut txt = Reader::new(rdata_bytes, 0);
                while txt.offset < rdata_bytes.len() {
                    let len = txt.u8()? as usize;
                    strings.push(String::from_utf8_lossy(txt.take(len)?).into_owned());
                }
                DNSRecordData::TXT(strings)
            }
            DNS_TYPE_OPT => DNSRecordData::OPT {
                udp_payload_size: class,
                extended_rcode: (ttl >> 24) as u8,
                version: (ttl >> 16) as u8,
                do_bit: ttl & 0x8000 != 0,
            },
            _ => DNSRecordData::Other(rdata_bytes.to_vec()),
        };
        if rdata_reader.offset > self.offset {
            return Err(Error::parse(format!(
                "DNS record data overruns its length {}",
                rdlength
            )));
        }

        Ok(DNSResRecord {
            name,
            type_,
            class,
            ttl,
            rdlength,
            rdata,
        })
    }
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct DNS {
    #[serde(skip_serializing_if = "Option::is_none")]
    tcp_length: Option<u16>,
    #[serde(serialize_with = "crate::types::hex::serialize_lower_hex_u16")]
    id: u16,
    qr: bool,
    opcode: u8,
    aa: bool,
    tc: bool,
    rd: bool,
    ra: bool,
    z: u8,
    rcode: u8,
    qdcount: u16,
    ancount: u16,
    nscount: u16,
    arcount: u16,
    questions: Vec<DNSQRecord>,
    answers: Vec<DNSResRecord>,
    nameservers: Vec<DNSResRecord>,
    additional: Vec<DNSResRecord>,
}

impl DNS {
    /// Decodes a DNS message, preceded by its two byte length when carried over TCP.
    ///
    /// A header that cannot belong to a DNS message gives `Err(Error::Unrecognized)`.
    pub(crate) fn decode(frame: &Frame, range: ByteRange, tcp: bool) -> Result<Decoded, Error> {
        let bytes = frame.slice(range);
        let prefix = if tcp { 2 } else { 0 };
        if bytes.len() < prefix + DNS_HEADER_LENGTH {
            return Err(Error::too_short(prefix + DNS_HEADER_LENGTH, bytes));
        }

        let mut dns = DNS::default();
        let own = if tcp {
            let length = (bytes[0] as u16) << 8 | (bytes[1] as u16);
            if (length as usize) < DNS_HEADER_LENGTH {
                return Err(Error::Unrecognized);
            }
            if length as usize + prefix > bytes.len() {
                frame.record_anomaly(
                    range.take(2).unwrap_or(range),
                    format!("DNS length {} exceeds the {} bytes available", length, bytes.len() - 2),
                );
            }
            dns.tcp_length = Some(length);
            range.take(length as usize + prefix).unwrap_or(range)
        } else {
            range
        };
        let message = &bytes[prefix..own.len()];

        dns.header_from_bytes(message)?;
        if !dns.is_plausible(message.len()) {
            return Err(Error::Unrecognized);
        }
        dns.records_from_bytes(message)?;

        let decoded = Decoded::new(dns, own);
        Ok(if tcp {
            decoded.following(Dispatch::Raw, range.after(&own))
        } else {
            decoded
        })
    }

    fn header_from_bytes(&mut self, bytes: &[u8]) -> Result<(), Error> {
        let mut reader = Reader::new(bytes, 0);
        self.id = reader.u16()?;

        let first = reader.u8()?;
        self.qr = (first & 0x80) != 0x00;
        self.opcode = (first & 0x78) >> 3;
        self.aa = (first & 0x04) != 0x00;
        self.tc = (first & 0x02) != 0x00;
        self.rd = (first & 0x01) != 0x00;

        let second = reader.u8()?;
        self.ra = (second & 0x80) != 0x00;
        self.z = (second & 0x70) >> 4;
        self.rcode = second & 0x0f;

        self.qdcount = reader.u16()?;
        self.ancount = reader.u16()?;
        self.nscount = reader.u16()?;
        self.arcount = reader.u16()?;
        Ok(())
    }

    // Opcode 3 and anything above 6 are unassigned. A question takes at least 5 bytes and a
    // resource record at least 11, so counts the message cannot hold rule it out as well.
    fn is_plausible(&self, len: usize) -> bool {
        if self.opcode == 3 || self.opcode > 6 {
            return false;
        }
        let records = self.ancount as usize + self.nscount as usize + self.arcount as usize;
        if self.qdcount == 0 && records == 0 {
            return false;
        }
        DNS_HEADER_LENGTH + self.qdcount as usize * 5 + records * 11 <= len
    }

    fn records_from_bytes(&mut self, bytes: &[u8]) -> Result<usize, Error> {
        let mut reader = Reader::new(bytes, DNS_HEADER_LENGTH);

        for _ in 0..self.qdcount {
            self.questions.push(reader.question()?);
        }
        for _ in 0..self.ancount {
            self.answers.push(reader.resource_record()?);
        }
        for _ in 0..self.nscount {
            self.nameservers.push(reader.resource_record()?);
        }
        for _ in 0..self.arcount {
            self.additional.push(reader.resource_record()?);
        }

        Ok(reader.offset)
    }

    pub fn id(&self) -> u16 {
        self.id
    }

    pub fn is_response(&self) -> bool {
        self.qr
    }

    pub fn questions(&self) -> &[DNSQRecord] {
        &self.questions
    }

    pub fn answers(&self) -> &[DNSResRecord] {
        &self.answers
    }

    pub fn nameservers(&self) -> &[DNSResRecord] {
        &self.nameservers
    }

    pub fn additional(&self) -> &[DNSResRecord] {
        &self.additional
    }
}

impl Layer for DNS {
    fn name(&self) -> &'static str {
        "DNS"
    }

    fn short_name(&self) -> &'static str {
        "dns"
    }

    fn attributes(&self, _bytes: &[u8], attrs: &mut Attributes) {
        attrs.add("Transaction ID", format!("0x{:04x}", self.id));
        attrs.add("Type", if self.qr { "Response" } else { "Query" });
        attrs.add("Opcode", self.opcode);
        if self.qr {
            attrs.add("Rcode", self.rcode);
        }
        for q in &self.questions {
            attrs.add("Question", format!("{} type {}", q.name, q.type_));
        }
        for rr in &self.answers {
            attrs.add("Answer", format!("{} type {}: {}", rr.name, rr.type_, rr.rdata));
        }
        for rr in &self.nameservers {
            attrs.add("Authority", format!("{} type {}: {}", rr.name, rr.type_, rr.rdata));
        }
        for rr in &self.additional {
            attrs.add("Additional", format!("{} type {}: {}", rr.name, rr.type_, rr.rdata));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Timestamp, ENCAP_TYPE_ETH, ENCAP_TYPE_RAW};

    fn dns_of(f: &Frame) -> DNS {
        let node = f.packets(None).find(|n| n.name() == "DNS").unwrap();
        match node.layer() {
            crate::layer::LayerKind::Dns(dns) => dns.clone(),
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn parse_valid_dns_packet() {
        let dns_response = vec![
            0x52, 0x54, 0x00, 0xbd, 0x1c, 0x70, 0xfe, 0x54, /* RT...p.T */
            0x00, 0x3e, 0x00, 0x96, 0x08, 0x00, 0x45, 0x00, /* .>....E. */
            0x00, 0xe0, 0x00, 0x00, 0x40, 0x00, 0x40, 0x11, /* ....@.@. */
            0xc4, 0x74, 0xc0, 0xa8, 0x7a, 0x01, 0xc0, 0xa8, /* .t..z... */
            0x7a, 0x46, 0x00, 0x35, 0xdb, 0x13, 0x00, 0xcc, /* zF.5.... */
            0x76, 0x76, /* DNS */ 0xf3, 0x03, 0x81, 0x80, 0x00, 0x01, /* vv...... */
            0x00, 0x01, 0x00, 0x04, 0x00, 0x04, 0x03, 0x77, /* .......w */
            0x77, 0x77, 0x06, 0x67, 0x6f, 0x6f, 0x67, 0x6c, /* ww.googl */
            0x65, 0x03, 0x63, 0x6f, 0x6d, 0x00, 0x00, 0x1c, /* e.com... */
            0x00, 0x01, 0xc0, 0x0c, 0x00, 0x1c, 0x00, 0x01, /* ........ */
            0x00, 0x00, 0x01, 0x2c, 0x00, 0x10, 0x2a, 0x00, /* ...,..*. */
            0x14, 0x50, 0x40, 0x0c, 0x0c, 0x01, 0x00, 0x00, /* .P@..... */
            0x00, 0x00, 0x00, 0x00, 0x00, 0x69, 0xc0, 0x10, /* .....i.. */
            0x00, 0x02, 0x00, 0x01, 0x00, 0x02, 0xa3, 0x00, /* ........ */
            0x00, 0x06, 0x03, 0x6e, 0x73, 0x34, 0xc0, 0x10, /* ...ns4.. */
            0xc0, 0x10, 0x00, 0x02, 0x00, 0x01, 0x00, 0x02, /* ........ */
            0xa3, 0x00, 0x00, 0x06, 0x03, 0x6e, 0x73, 0x32, /* .....ns2 */
            0xc0, 0x10, 0xc0, 0x10, 0x00, 0x02, 0x00, 0x01, /* ........ */
            0x00, 0x02, 0xa3, 0x00, 0x00, 0x06, 0x03, 0x6e, /* .......n */
            0x73, 0x31, 0xc0, 0x10, 0xc0, 0x10, 0x00, 0x02, /* s1...... */
            0x00, 0x01, 0x00, 0x02, 0xa3, 0x00, 0x00, 0x06, /* ........ */
            0x03, 0x6e, 0x73, 0x33, 0xc0, 0x10, 0xc0, 0x6c, /* .ns3...l */
            0x00, 0x01, 0x00, 0x01, 0x00, 0x02, 0xa3, 0x00, /* ........ */
            0x00, 0x04, 0xd8, 0xef, 0x20, 0x0a, 0xc0, 0x5a, /* .... ..Z */
            0x00, 0x01, 0x00, 0x01, 0x00, 0x02, 0xa3, 0x00, /* ........ */
            0x00, 0x04, 0xd8, 0xef, 0x22, 0x0a, 0xc0, 0x7e, /* ...."..~ */
            0x00, 0x01, 0x00, 0x01, 0x00, 0x02, 0xa3, 0x00, /* ........ */
            0x00, 0x04, 0xd8, 0xef, 0x24, 0x0a, 0xc0, 0x48, /* ....$..H */
            0x00, 0x01, 0x00, 0x01, 0x00, 0x02, 0xa3, 0x00, /* ........ */
            0x00, 0x04, 0xd8, 0xef, 0x26, 0x0a, /* ....&. */
        ];

        let f = crate::dissect(dns_response, Timestamp::default(), ENCAP_TYPE_ETH, false);
        let names: Vec<_> = f.packets(None).map(|n| n.name()).collect();
        assert_eq!(names, ["Ethernet2", "IPv4", "UDP", "DNS"]);
        assert!(f.anomalies().is_empty(), "{:?}", f.anomalies().entries());

        let dns = dns_of(&f);
        assert!(dns.is_response());
        assert_eq!(dns.questions()[0].name().as_str(), "www.google.com");
        assert_eq!(dns.answers()[0].data().to_string(), "2a00:1450:400c:c01::69");
        assert_eq!(dns.nameservers().len(), 4);
        assert_eq!(dns.nameservers()[0].data().to_string(), "ns4.google.com");
        assert_eq!(dns.additional()[0].name().as_str(), "ns1.google.com");
        assert_eq!(dns.additional()[0].data().to_string(), "216.239.32.10");
    }

    #[test]
    fn test_dns_parse_gopacket_regression() {
        // 11:08:05.708342 IP 109.194.160.4.57766 > 95.211.92.14.53: 63000% [1au] A? picslife.ru. (40)
        let test_packet_dns_regression = vec![
            0x00, 0x22, 0x19, 0xb6, 0x7e, 0x22, 0x00, 0x0f, 0x35, 0xbb, 0x0b, 0x40, 0x08, 0x00,
            0x45, 0x00, 0x00, 0x44, 0x89, 0xc4, 0x00, 0x00, 0x38, 0x11, 0x2f, 0x3d, 0x6d, 0xc2,
            0xa0, 0x04, 0x5f, 0xd3, 0x5c, 0x0e, 0xe1, 0xa6, 0x00, 0x35, 0x00, 0x30, 0xa5, 0x97,
            0xf6, 0x18, 0x00, 0x10, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x08, 0x70,
            0x69, 0x63, 0x73, 0x6c, 0x69, 0x66, 0x65, 0x02, 0x72, 0x75, 0x00, 0x00, 0x01, 0x00,
            0x01, 0x00, 0x00, 0x29, 0x10, 0x00, 0x00, 0x00, 0x80, 0x00, 0x00, 0x00,
        ];
        let f = crate::dissect(test_packet_dns_regression, Timestamp::default(), ENCAP_TYPE_ETH, false);
        assert_eq!(f.packets(None).count(), 4);

        let dns = dns_of(&f);
        assert_eq!(dns.id(), 0xf618);
        assert_eq!(dns.questions()[0].name().as_str(), "picslife.ru");
        assert_eq!(dns.additional()[0].name().to_string(), "<Root>");
        match dns.additional()[0].data() {
            DNSRecordData::OPT {
                udp_payload_size,
                do_bit,
                ..
            } => {
                assert_eq!(*udp_payload_size, 4096);
                assert!(do_bit);
            }
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn compression_loop_is_an_error() {
        // Question name is a pointer to itself.
        let bytes = hex::decode("4500002e00010000401100000a0000010a000002c0000035001a0000123401000001000000000000c00c00010001").unwrap();
        let f = crate::dissect(bytes, Timestamp::default(), ENCAP_TYPE_RAW, true);
        let names: Vec<_> = f.packets(None).map(|n| n.name()).collect();
        assert_eq!(names, ["IPv4", "UDP", "Raw"]);
        let anomalies = f.anomalies().entries();
        assert_eq!(anomalies.len(), 1);
        assert!(anomalies[0].message.contains("compression loop"), "{}", anomalies[0].message);
    }

    #[test]
    fn tcp_length_prefix() {
        // Query for a.io over TCP port 53, followed by two stray bytes.
        let bytes = hex::decode(concat!(
            "4500004200010000400600000a0000010a000002",
            "c000003500000001000000005018ffff00000000",
            "0016", "abcd01000001000000000000", "0161", "02696f", "00", "00010001",
            "beef"
        ))
        .unwrap();
        let f = crate::dissect(bytes, Timestamp::default(), ENCAP_TYPE_RAW, false);
        let nodes: Vec<_> = f.packets(None).collect();
        let names: Vec<_> = nodes.iter().map(|n| n.name()).collect();
        assert_eq!(names, ["IPv4", "TCP", "DNS", "Raw"]);
        assert_eq!(nodes[2].range().len(), 2 + 0x16);
        assert_eq!(nodes[2].attributes().unwrap().get("Question"), Some("a.io type 1"));
        assert!(f.anomalies().is_empty(), "{:?}", f.anomalies().entries());
    }

    #[test]
    fn implausible_header_is_unrecognized() {
        let f = crate::dissect(vec![0xff; 20], Timestamp::default(), ENCAP_TYPE_RAW, true);
        let range = f.root_range().unwrap();
        assert_eq!(DNS::decode(&f, range, false).unwrap_err(), Error::Unrecognized);
    }
}
