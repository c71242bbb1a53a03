//! NetBIOS Session Service and SMB1
//!
//! An SMB message is a 32 byte header followed by a chain of commands. Every "AndX" command
//! carries the code and the offset (from the start of the SMB header) of the command after it,
//! so a single message may hold e.g. a SESSION_SETUP_ANDX followed by a TREE_CONNECT_ANDX. Each
//! command of the chain is a node of its own, following its predecessor under the SMB header.

use serde::Serialize;

use crate::errors::Error;
use crate::layer::{Attributes, Decoded, Dispatch, Layer};
use crate::packet::Frame;
use crate::range::ByteRange;

mod commands;

pub use commands::{CommandDetails, SessionSetup, SmbCommand};

pub const NETBIOS_HEADER_LENGTH: usize = 4_usize;
pub const SMB_HEADER_LENGTH: usize = 32_usize;

const SMB_MAGIC: &[u8; 4] = b"\xffSMB";
const SMB2_MAGIC: &[u8; 4] = b"\xfeSMB";

pub const NETBIOS_SESSION_MESSAGE: u8 = 0x00;
pub const NETBIOS_SESSION_REQUEST: u8 = 0x81;
pub const NETBIOS_POSITIVE_RESPONSE: u8 = 0x82;
pub const NETBIOS_NEGATIVE_RESPONSE: u8 = 0x83;
pub const NETBIOS_RETARGET_RESPONSE: u8 = 0x84;
pub const NETBIOS_KEEP_ALIVE: u8 = 0x85;

const SMB_FLAGS_REPLY: u8 = 0x80;
const SMB_FLAGS2_UNICODE: u16 = 0x8000;

/// Whether `bytes` starts with a NetBIOS session message carrying an SMB1 message.
pub fn looks_like_netbios_smb(bytes: &[u8]) -> bool {
    bytes.len() >= NETBIOS_HEADER_LENGTH + SMB_MAGIC.len()
        && bytes[0] == NETBIOS_SESSION_MESSAGE
        && &bytes[4..8] == SMB_MAGIC
}

/// RFC 1002 session service header.
#[derive(Debug, Clone, Serialize)]
pub struct NetBiosSession {
    #[serde(serialize_with = "crate::types::hex::serialize_lower_hex_u8")]
    message_type: u8,
    length: u32,
}

impl NetBiosSession {
    /// Decodes a session service message. Session messages must carry SMB.
    pub(crate) fn decode(frame: &Frame, range: ByteRange) -> Result<Decoded, Error> {
        let bytes = frame.slice(range);
        if bytes.len() < NETBIOS_HEADER_LENGTH {
            return Err(Error::too_short(NETBIOS_HEADER_LENGTH, bytes));
        }
        let message_type = bytes[0];
        let known = matches!(
            message_type,
            NETBIOS_SESSION_MESSAGE | NETBIOS_SESSION_REQUEST..=NETBIOS_KEEP_ALIVE
        );
        // Only the lowest flag bit is defined, as a length extension.
        if !known || bytes[1] & 0xFE != 0 {
            return Err(Error::Unrecognized);
        }
        let length =
            ((bytes[1] & 0x01) as u32) << 16 | (bytes[2] as u32) << 8 | bytes[3] as u32;

        let payload = &bytes[NETBIOS_HEADER_LENGTH..];
        let carries_smb1 = payload.starts_with(SMB_MAGIC);
        if message_type == NETBIOS_SESSION_MESSAGE
            && !carries_smb1
            && !payload.starts_with(SMB2_MAGIC)
        {
            return Err(Error::Unrecognized);
        }

        if length as usize > payload.len() {
            frame.record_anomaly(
                range.sub(1, 3).unwrap_or(range),
                format!(
                    "NetBIOS length {} exceeds the {} bytes available",
                    length,
                    payload.len()
                ),
            );
        }
        let own = range
            .take(NETBIOS_HEADER_LENGTH + length as usize)
            .unwrap_or(range);
        let dispatch = if message_type == NETBIOS_SESSION_MESSAGE && carries_smb1 {
            Dispatch::Smb
        } else {
            Dispatch::Raw
        };

        let session = NetBiosSession {
            message_type,
            length,
        };
        Ok(Decoded::new(session, own)
            .child(dispatch, own.skip(NETBIOS_HEADER_LENGTH))
            .following(Dispatch::Raw, range.after(&own)))
    }

    fn type_name(&self) -> &'static str {
        match self.message_type {
            NETBIOS_SESSION_MESSAGE => "Session Message",
            NETBIOS_SESSION_REQUEST => "Session Request",
            NETBIOS_POSITIVE_RESPONSE => "Positive Session Response",
            NETBIOS_NEGATIVE_RESPONSE => "Negative Session Response",
            NETBIOS_RETARGET_RESPONSE => "Retarget Session Response",
            NETBIOS_KEEP_ALIVE => "Session Keep Alive",
            _ => "Unknown",
        }
    }
}

impl Layer for NetBiosSession {
    fn name(&self) -> &'static str {
        "NetBIOS Session"
    }

    fn short_name(&self) -> &'static str {
        "nbss"
    }

    fn attributes(&self, _bytes: &[u8], attrs: &mut Attributes) {
        attrs.add(
            "Message Type",
            format!("{} (0x{:02x})", self.type_name(), self.message_type),
        );
        attrs.add("Length", self.length);
    }
}

/// Context handed from one command of an AndX chain to the next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AndXLink {
    /// Code of the command to decode.
    pub command: u8,
    /// The whole SMB message, header included. AndX offsets are relative to its start.
    pub smb: ByteRange,
    pub is_reply: bool,
    pub unicode: bool,
    /// Position of the command in the chain, the first command being 0.
    pub chain_index: usize,
    /// Command code of the predecessor in the chain.
    pub previous: Option<u8>,
}

impl AndXLink {
    /// Most commands a chain in this message may hold.
    pub fn chain_bound(&self, max_andx_chain: usize) -> usize {
        max_andx_chain.min(self.smb.len() / 3)
    }
}

/// SMB1 header, all multi-byte fields little endian.
#[derive(Debug, Clone, Serialize)]
pub struct SmbHeader {
    #[serde(serialize_with = "crate::types::hex::serialize_lower_hex_u8")]
    command: u8,
    #[serde(serialize_with = "crate::types::hex::serialize_lower_hex_u32")]
    status: u32,
    #[serde(serialize_with = "crate::types::hex::serialize_lower_hex_u8")]
    flags: u8,
    #[serde(serialize_with = "crate::types::hex::serialize_lower_hex_u16")]
    flags2: u16,
    tid: u16,
    pid: u32,
    uid: u16,
    mid: u16,
}

impl SmbHeader {
    pub(crate) fn decode(frame: &Frame, range: ByteRange) -> Result<Decoded, Error> {
        let bytes = frame.slice(range);
        if bytes.len() < SMB_HEADER_LENGTH {
            return Err(Error::too_short(SMB_HEADER_LENGTH, bytes));
        }
        if &bytes[0..4] != SMB_MAGIC {
            return Err(Error::parse(format!(
                "SMB magic {} missing",
                hex::encode(&bytes[0..4])
            )));
        }
        let le16 = |i: usize| u16::from_le_bytes([bytes[i], bytes[i + 1]]);

        let header = SmbHeader {
            command: bytes[4],
            status: u32::from_le_bytes([bytes[5], bytes[6], bytes[7], bytes[8]]),
            flags: bytes[9],
            flags2: le16(10),
            pid: (le16(12) as u32) << 16 | le16(26) as u32,
            tid: le16(24),
            uid: le16(28),
            mid: le16(30),
        };
        let link = AndXLink {
            command: header.command,
            smb: range,
            is_reply: header.is_reply(),
            unicode: header.is_unicode(),
            chain_index: 0,
            previous: None,
        };
        Ok(Decoded::new(header, range)
            .child(Dispatch::SmbCommand(link), range.skip(SMB_HEADER_LENGTH)))
    }

    pub fn command(&self) -> u8 {
        self.command
    }

    pub fn is_reply(&self) -> bool {
        self.flags & SMB_FLAGS_REPLY != 0
    }

    pub fn is_unicode(&self) -> bool {
        self.flags2 & SMB_FLAGS2_UNICODE != 0
    }

    pub fn status(&self) -> u32 {
        self.status
    }
}

impl Layer for SmbHeader {
    fn name(&self) -> &'static str {
        "SMB"
    }

    fn short_name(&self) -> &'static str {
        "smb"
    }

    fn attributes(&self, _bytes: &[u8], attrs: &mut Attributes) {
        attrs.add(
            "Command",
            format!("{} (0x{:02x})", commands::command_name(self.command), self.command),
        );
        attrs.add("Status", format!("0x{:08x}", self.status));
        attrs.add("Direction", if self.is_reply() { "Response" } else { "Request" });
        attrs.add("Flags2", format!("0x{:04x}", self.flags2));
        attrs.add("Tree ID", self.tid);
        attrs.add("Process ID", self.pid);
        attrs.add("User ID", self.uid);
        attrs.add("Multiplex ID", self.mid);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DissectOptions;
    use crate::types::{Timestamp, ENCAP_TYPE_RAW};

    fn ipv4_tcp(dst_port: u16, payload: &[u8]) -> Vec<u8> {
        let mut bytes = hex::decode(concat!(
            "4500000000010000400600000a0000010a000002",
            "c000000000000001000000005018ffff00000000"
        ))
        .unwrap();
        let total = (40 + payload.len()) as u16;
        bytes[2..4].copy_from_slice(&total.to_be_bytes());
        bytes[22..24].copy_from_slice(&dst_port.to_be_bytes());
        bytes.extend_from_slice(payload);
        bytes
    }

    fn smb_header(command: u8) -> Vec<u8> {
        let mut h = SMB_MAGIC.to_vec();
        h.push(command);
        h.extend_from_slice(&[0; 4]); // status
        h.push(0x18); // flags
        h.extend_from_slice(&[0x01, 0x00]); // flags2, ASCII strings
        h.extend_from_slice(&[0; 12]); // pid high, signature, reserved
        h.extend_from_slice(&[0x00, 0x08, 0x34, 0x12, 0x00, 0x08, 0x01, 0x00]); // tid pid uid mid
        h
    }

    fn command(params: &[u8], data: &[u8]) -> Vec<u8> {
        let mut c = vec![(params.len() / 2) as u8];
        c.extend_from_slice(params);
        c.extend_from_slice(&(data.len() as u16).to_le_bytes());
        c.extend_from_slice(data);
        c
    }

    fn session_setup(andx_command: u8, andx_offset: u16) -> Vec<u8> {
        let mut params = vec![andx_command, 0];
        params.extend_from_slice(&andx_offset.to_le_bytes());
        params.extend_from_slice(&[0xff, 0xff, 0x02, 0x00, 0x00, 0x00, 0, 0, 0, 0]);
        params.extend_from_slice(&[0, 0, 0, 0]); // password lengths
        params.extend_from_slice(&[0; 8]); // reserved, capabilities
        command(&params, b"alice\0WORKGROUP\0Unix\0fathom\0")
    }

    fn tree_connect() -> Vec<u8> {
        let params = [0xff, 0, 0, 0, 0x08, 0x00, 0x01, 0x00];
        command(&params, b"\0\\\\SERVER\\IPC$\0?????\0")
    }

    /// NetBIOS session message holding SESSION_SETUP_ANDX chained to TREE_CONNECT_ANDX, with the
    /// session setup's AndX offset replaced by `offset` when given.
    fn chained_message(offset: Option<u16>) -> Vec<u8> {
        let first_len = session_setup(0x75, 0).len();
        let next = offset.unwrap_or((SMB_HEADER_LENGTH + first_len) as u16);
        let mut smb = smb_header(0x73);
        smb.extend(session_setup(0x75, next));
        smb.extend(tree_connect());

        let mut message = vec![NETBIOS_SESSION_MESSAGE, 0];
        message.extend_from_slice(&(smb.len() as u16).to_be_bytes());
        message.extend(smb);
        message
    }

    fn dissect(payload: &[u8], options: DissectOptions) -> Frame {
        Frame::new(
            1,
            ipv4_tcp(445, payload),
            Timestamp::default(),
            ENCAP_TYPE_RAW,
            options,
        )
    }

    #[test]
    fn session_setup_chained_to_tree_connect() {
        let f = dissect(&chained_message(None), DissectOptions::default());
        let nodes: Vec<_> = f.packets(None).collect();
        let names: Vec<_> = nodes.iter().map(|n| n.name()).collect();
        assert_eq!(
            names,
            ["IPv4", "TCP", "NetBIOS Session", "SMB", "SMB Command", "SMB Command"]
        );
        let depths: Vec<_> = nodes.iter().map(|n| n.depth()).collect();
        assert_eq!(depths, [0, 1, 2, 3, 4, 4]);

        let setup = nodes[4].attributes().unwrap();
        assert_eq!(setup.get("Account"), Some("alice"));
        assert_eq!(setup.get("Primary Domain"), Some("WORKGROUP"));
        assert_eq!(setup.get("Native OS"), Some("Unix"));
        assert_eq!(setup.get("Native LAN Manager"), Some("fathom"));

        let tree = nodes[5].attributes().unwrap();
        assert_eq!(tree.get("Path"), Some("\\\\SERVER\\IPC$"));
        assert_eq!(tree.get("Service"), Some("?????"));
        assert_eq!(tree.get("Chained From"), Some("SESSION_SETUP_ANDX"));
        assert!(f.anomalies().is_empty(), "{:?}", f.anomalies().entries());

        // The second command starts where the first ends.
        assert_eq!(nodes[4].range().end() + 1, nodes[5].range().start());
        assert_eq!(nodes[5].range().end(), f.len() - 1);
    }

    #[test]
    fn andx_offset_pointing_backwards() {
        let f = dissect(&chained_message(Some(32)), DissectOptions::default());
        let names: Vec<_> = f.packets(None).map(|n| n.name()).collect();
        assert_eq!(
            names,
            ["IPv4", "TCP", "NetBIOS Session", "SMB", "SMB Command", "Raw"]
        );
        assert_eq!(f.anomalies().len(), 1);
    }

    #[test]
    fn zero_andx_offset_ends_the_chain() {
        let f = dissect(&chained_message(Some(0)), DissectOptions::default());
        let nodes: Vec<_> = f.packets(None).collect();
        let names: Vec<_> = nodes.iter().map(|n| n.name()).collect();
        assert_eq!(
            names,
            ["IPv4", "TCP", "NetBIOS Session", "SMB", "SMB Command", "Raw"]
        );
        assert_eq!(nodes[4].attributes().unwrap().get("Command"), Some("SESSION_SETUP_ANDX (0x73)"));
        assert!(f.anomalies().is_empty(), "{:?}", f.anomalies().entries());
    }

    #[test]
    fn andx_offset_past_the_message() {
        let f = dissect(&chained_message(Some(0xfff0)), DissectOptions::default());
        assert_eq!(f.packets(None).count(), 6);
        let anomalies = f.anomalies().entries();
        assert_eq!(anomalies.len(), 1);
        assert!(anomalies[0].message.contains("AndX offset"));
    }

    #[test]
    fn andx_chain_bound() {
        let options = DissectOptions {
            max_andx_chain: 1,
            ..DissectOptions::default()
        };
        let f = dissect(&chained_message(None), options);
        let names: Vec<_> = f.packets(None).map(|n| n.name()).collect();
        assert_eq!(names.last(), Some(&"Raw"));
        let anomalies = f.anomalies().entries();
        assert_eq!(anomalies.len(), 1);
        assert!(anomalies[0].message.contains("longer than 1"));
    }

    #[test]
    fn negotiate_dialects() {
        let mut smb = smb_header(commands::SMB_COM_NEGOTIATE);
        smb.extend(command(&[], b"\x02PC NETWORK PROGRAM 1.0\0\x02NT LM 0.12\0"));
        let mut message = vec![0, 0];
        message.extend_from_slice(&(smb.len() as u16).to_be_bytes());
        message.extend(smb);

        let f = dissect(&message, DissectOptions::default());
        let cmd = f.packets(None).last().unwrap();
        match cmd.layer() {
            crate::layer::LayerKind::SmbCommand(c) => match c.details() {
                CommandDetails::Negotiate { dialects, .. } => {
                    assert_eq!(dialects, &["PC NETWORK PROGRAM 1.0", "NT LM 0.12"]);
                }
                other => panic!("{:?}", other),
            },
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn netbios_keep_alive_and_sniffing() {
        let f = dissect(&[NETBIOS_KEEP_ALIVE, 0, 0, 0], DissectOptions::default());
        let names: Vec<_> = f.packets(None).map(|n| n.name()).collect();
        assert_eq!(names, ["IPv4", "TCP", "NetBIOS Session"]);

        assert!(looks_like_netbios_smb(&chained_message(None)));
        assert!(!looks_like_netbios_smb(b"\x00\x00\x00\x10\xfeSMB"));
    }
}
