//! SMB1 commands and AndX chaining

use serde::Serialize;

use crate::errors::Error;
use crate::layer::{Attributes, Decoded, Dispatch, Layer};
use crate::packet::Frame;
use crate::range::ByteRange;

use super::AndXLink;

pub const SMB_COM_CLOSE: u8 = 0x04;
pub const SMB_COM_TRANSACTION: u8 = 0x25;
pub const SMB_COM_ECHO: u8 = 0x2B;
pub const SMB_COM_LOCKING_ANDX: u8 = 0x24;
pub const SMB_COM_READ_ANDX: u8 = 0x2E;
pub const SMB_COM_WRITE_ANDX: u8 = 0x2F;
pub const SMB_COM_TRANSACTION2: u8 = 0x32;
pub const SMB_COM_TREE_DISCONNECT: u8 = 0x71;
pub const SMB_COM_NEGOTIATE: u8 = 0x72;
pub const SMB_COM_SESSION_SETUP_ANDX: u8 = 0x73;
pub const SMB_COM_LOGOFF_ANDX: u8 = 0x74;
pub const SMB_COM_TREE_CONNECT_ANDX: u8 = 0x75;
pub const SMB_COM_NT_CREATE_ANDX: u8 = 0xA2;

/// Command code closing an AndX chain.
pub const SMB_COM_NO_ANDX_COMMAND: u8 = 0xFF;

const ANDX_COMMANDS: &[u8] = &[
    SMB_COM_SESSION_SETUP_ANDX,
    SMB_COM_TREE_CONNECT_ANDX,
    SMB_COM_LOGOFF_ANDX,
    SMB_COM_READ_ANDX,
    SMB_COM_WRITE_ANDX,
    SMB_COM_NT_CREATE_ANDX,
    SMB_COM_LOCKING_ANDX,
];

pub(crate) fn command_name(command: u8) -> &'static str {
    match command {
        SMB_COM_CLOSE => "CLOSE",
        SMB_COM_TRANSACTION => "TRANSACTION",
        SMB_COM_ECHO => "ECHO",
        SMB_COM_LOCKING_ANDX => "LOCKING_ANDX",
        SMB_COM_READ_ANDX => "READ_ANDX",
        SMB_COM_WRITE_ANDX => "WRITE_ANDX",
        SMB_COM_TRANSACTION2 => "TRANSACTION2",
        SMB_COM_TREE_DISCONNECT => "TREE_DISCONNECT",
        SMB_COM_NEGOTIATE => "NEGOTIATE",
        SMB_COM_SESSION_SETUP_ANDX => "SESSION_SETUP_ANDX",
        SMB_COM_LOGOFF_ANDX => "LOGOFF_ANDX",
        SMB_COM_TREE_CONNECT_ANDX => "TREE_CONNECT_ANDX",
        SMB_COM_NT_CREATE_ANDX => "NT_CREATE_ANDX",
        _ => "UNKNOWN",
    }
}

/// Reads strings out of the data block of a command.
///
/// Unicode strings are UTF-16LE and aligned on an even offset from the start of the SMB header.
struct Strings<'a> {
    data: &'a [u8],
    pos: usize,
    /// Offset of `data` from the start of the SMB header.
    base: usize,
    unicode: bool,
}

impl<'a> Strings<'a> {
    fn skip(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.data.len());
    }

    fn ascii(&mut self) -> Option<String> {
        let rest = self.data.get(self.pos..).filter(|r| !r.is_empty())?;
        let len = rest.iter().position(|b| *b == 0).unwrap_or(rest.len());
        self.pos += (len + 1).min(rest.len());
        Some(String::from_utf8_lossy(&rest[..len]).into_owned())
    }

    fn string(&mut self) -> Option<String> {
        if !self.unicode {
            return self.ascii();
        }
        if (self.base + self.pos) % 2 == 1 {
            self.skip(1);
        }
        let rest = self.data.get(self.pos..).filter(|r| r.len() >= 2)?;
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .take_while(|u| *u != 0)
            .collect();
        self.pos += ((units.len() + 1) * 2).min(rest.len());
        Some(String::from_utf16_lossy(&units))
    }
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct SessionSetup {
    #[serde(skip_serializing_if = "Option::is_none")]
    account: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    primary_domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    native_os: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    native_lan_manager: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    security_blob_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    action: Option<u16>,
}

impl SessionSetup {
    pub fn account(&self) -> Option<&str> {
        self.account.as_deref()
    }

    pub fn primary_domain(&self) -> Option<&str> {
        self.primary_domain.as_deref()
    }

    pub fn native_os(&self) -> Option<&str> {
        self.native_os.as_deref()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum CommandDetails {
    Negotiate {
        #[serde(skip_serializing_if = "Vec::is_empty")]
        dialects: Vec<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        selected_dialect: Option<u16>,
    },
    SessionSetup(SessionSetup),
    TreeConnect {
        #[serde(skip_serializing_if = "Option::is_none")]
        path: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        service: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        native_file_system: Option<String>,
    },
    Generic,
}

#[derive(Debug, Clone, Serialize)]
pub struct SmbCommand {
    #[serde(serialize_with = "crate::types::hex::serialize_lower_hex_u8")]
    command: u8,
    word_count: u8,
    byte_count: u16,
    chain_index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    previous: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    andx_command: Option<u8>,
    #[serde(skip_serializing_if = "is_generic")]
    details: CommandDetails,
}

fn is_generic(details: &CommandDetails) -> bool {
    matches!(details, CommandDetails::Generic)
}

fn le16(bytes: &[u8], at: usize) -> Option<u16> {
    let b = bytes.get(at..at + 2)?;
    Some(u16::from_le_bytes([b[0], b[1]]))
}

impl SmbCommand {
    /// Decodes the command `link.command` at the start of `range`, which runs to the end of the
    /// SMB message.
    ///
    /// A valid AndX link makes the next command a following node and ends this one where the
    /// next starts. An invalid link ends the chain with an anomaly.
    pub(crate) fn decode(frame: &Frame, range: ByteRange, link: &AndXLink) -> Result<Decoded, Error> {
        let bytes = frame.slice(range);
        let word_count = *bytes.first().ok_or_else(|| Error::too_short(1, bytes))?;
        let params_end = 1 + 2 * word_count as usize;
        if bytes.len() < params_end + 2 {
            return Err(Error::too_short(params_end + 2, bytes));
        }
        let params = &bytes[1..params_end];
        let byte_count = u16::from_le_bytes([bytes[params_end], bytes[params_end + 1]]);
        let data_start = params_end + 2;
        let mut data_end = data_start + byte_count as usize;
        if data_end > bytes.len() {
            frame.record_anomaly(
                range.sub(params_end, 2).unwrap_or(range),
                format!(
                    "SMB byte count {} exceeds the {} bytes available",
                    byte_count,
                    bytes.len() - data_start
                ),
            );
            data_end = bytes.len();
        }
        let data = &bytes[data_start..data_end];
        let mut strings = Strings {
            data,
            pos: 0,
            base: range.start() - link.smb.start() + data_start,
            unicode: link.unicode,
        };

        let details = match link.command {
            SMB_COM_NEGOTIATE => Self::negotiate(link, params, data),
            SMB_COM_SESSION_SETUP_ANDX => Self::session_setup(link, params, &mut strings),
            SMB_COM_TREE_CONNECT_ANDX => Self::tree_connect(link, params, &mut strings),
            _ => CommandDetails::Generic,
        };

        let mut andx_command = None;
        let mut next = None;
        if ANDX_COMMANDS.contains(&link.command) && params.len() >= 4 {
            let next_command = params[0];
            andx_command = Some(next_command);
            if next_command != SMB_COM_NO_ANDX_COMMAND {
                let offset = u16::from_le_bytes([params[2], params[3]]) as usize;
                next = Self::next_in_chain(frame, range, link, next_command, offset);
            }
        }

        let command = SmbCommand {
            command: link.command,
            word_count,
            byte_count,
            chain_index: link.chain_index,
            previous: link.previous,
            andx_command,
            details,
        };

        match next {
            Some((next_link, next_range)) => {
                let own = ByteRange::new(range.start(), next_range.start() - 1).unwrap_or(range);
                Ok(Decoded::new(command, own)
                    .following(Dispatch::SmbCommand(next_link), Some(next_range)))
            }
            None => {
                let own = range.take(data_end).unwrap_or(range);
                Ok(Decoded::new(command, own).following(Dispatch::Raw, range.after(&own)))
            }
        }
    }

    /// The link to the next command of the chain, `None` with an anomaly when the offset does
    /// not move forward inside the message or the chain is too long.
    ///
    /// A zero offset ends the chain quietly, whatever the next command says.
    fn next_in_chain(
        frame: &Frame,
        range: ByteRange,
        link: &AndXLink,
        next_command: u8,
        offset: usize,
    ) -> Option<(AndXLink, ByteRange)> {
        if offset == 0 {
            return None;
        }
        let offset_field = range.sub(3, 2).unwrap_or(range);
        let current = range.start() - link.smb.start();
        if offset <= current || offset > link.smb.len() - 1 {
            frame.record_anomaly(
                offset_field,
                format!(
                    "AndX offset {} does not move forward inside the {} byte SMB message",
                    offset,
                    link.smb.len()
                ),
            );
            return None;
        }
        let bound = link.chain_bound(frame.options().max_andx_chain);
        if link.chain_index + 1 >= bound {
            frame.record_anomaly(
                offset_field,
                format!("AndX chain longer than {} commands", bound),
            );
            return None;
        }

        let next_range = ByteRange::new(link.smb.start() + offset, link.smb.end())?;
        let next_link = AndXLink {
            command: next_command,
            chain_index: link.chain_index + 1,
            previous: Some(link.command),
            ..link.clone()
        };
        Some((next_link, next_range))
    }

    fn negotiate(link: &AndXLink, params: &[u8], data: &[u8]) -> CommandDetails {
        if link.is_reply {
            return CommandDetails::Negotiate {
                dialects: vec![],
                selected_dialect: le16(params, 0),
            };
        }
        // Each dialect is a buffer format byte (0x02) then a null terminated name.
        let dialects = data
            .split(|b| *b == 0)
            .filter_map(|d| d.strip_prefix(&[0x02]))
            .map(|d| String::from_utf8_lossy(d).into_owned())
            .collect();
        CommandDetails::Negotiate {
            dialects,
            selected_dialect: None,
        }
    }

    fn session_setup(link: &AndXLink, params: &[u8], strings: &mut Strings) -> CommandDetails {
        let mut setup = SessionSetup::default();
        let word_count = params.len() / 2;
        match (link.is_reply, word_count) {
            // LAN Manager and NT LM 0.12 without extended security.
            (false, 10) | (false, 13) => {
                let passwords = if word_count == 10 {
                    le16(params, 14).unwrap_or(0) as usize
                } else {
                    le16(params, 14).unwrap_or(0) as usize + le16(params, 16).unwrap_or(0) as usize
                };
                strings.skip(passwords);
                setup.account = strings.string();
                setup.primary_domain = strings.string();
                setup.native_os = strings.string();
                setup.native_lan_manager = strings.string();
            }
            // Extended security: a security blob, then the client's OS and LAN manager.
            (false, 12) => {
                let blob = le16(params, 14).unwrap_or(0) as usize;
                setup.security_blob_length = Some(blob);
                strings.skip(blob);
                setup.native_os = strings.string();
                setup.native_lan_manager = strings.string();
            }
            (true, 3) => {
                setup.action = le16(params, 4);
                setup.native_os = strings.string();
                setup.native_lan_manager = strings.string();
                setup.primary_domain = strings.string();
            }
            (true, 4) => {
                setup.action = le16(params, 4);
                let blob = le16(params, 6).unwrap_or(0) as usize;
                setup.security_blob_length = Some(blob);
                strings.skip(blob);
                setup.native_os = strings.string();
                setup.native_lan_manager = strings.string();
            }
            _ => {}
        }
        CommandDetails::SessionSetup(setup)
    }

    fn tree_connect(link: &AndXLink, params: &[u8], strings: &mut Strings) -> CommandDetails {
        if link.is_reply {
            // The service is always ASCII.
            let service = strings.ascii();
            let native_file_system = strings.string();
            return CommandDetails::TreeConnect {
                path: None,
                service,
                native_file_system,
            };
        }
        strings.skip(le16(params, 6).unwrap_or(0) as usize);
        let path = strings.string();
        let service = strings.ascii();
        CommandDetails::TreeConnect {
            path,
            service,
            native_file_system: None,
        }
    }

    pub fn command(&self) -> u8 {
        self.command
    }

    pub fn chain_index(&self) -> usize {
        self.chain_index
    }

    pub fn previous(&self) -> Option<u8> {
        self.previous
    }

    pub fn details(&self) -> &CommandDetails {
        &self.details
    }
}

impl Layer for SmbCommand {
    fn name(&self) -> &'static str {
        "SMB Command"
    }

    fn short_name(&self) -> &'static str {
        "smb_command"
    }

    fn attributes(&self, _bytes: &[u8], attrs: &mut Attributes) {
        attrs.add(
            "Command",
            format!("{} (0x{:02x})", command_name(self.command), self.command),
        );
        attrs.add("Word Count", self.word_count);
        attrs.add("Byte Count", self.byte_count);
        if let Some(previous) = self.previous {
            attrs.add("Chained From", command_name(previous));
        }
        if let Some(next) = self.andx_command {
            attrs.add("AndX Command", format!("0x{:02x}", next));
        }
        match self.details {
            CommandDetails::Negotiate {
                ref dialects,
                selected_dialect,
            } => {
                for dialect in dialects {
                    attrs.add("Dialect", dialect);
                }
                if let Some(index) = selected_dialect {
                    attrs.add("Selected Dialect", index);
                }
            }
            CommandDetails::SessionSetup(ref setup) => {
                let fields = [
                    ("Account", &setup.account),
                    ("Primary Domain", &setup.primary_domain),
                    ("Native OS", &setup.native_os),
                    ("Native LAN Manager", &setup.native_lan_manager),
                ];
                for (name, value) in fields {
                    if let Some(value) = value {
                        attrs.add(name, value);
                    }
                }
                if let Some(len) = setup.security_blob_length {
                    attrs.add("Security Blob Length", len);
                }
            }
            CommandDetails::TreeConnect {
                ref path,
                ref service,
                ref native_file_system,
            } => {
                if let Some(path) = path {
                    attrs.add("Path", path);
                }
                if let Some(service) = service {
                    attrs.add("Service", service);
                }
                if let Some(fs) = native_file_system {
                    attrs.add("Native File System", fs);
                }
            }
            CommandDetails::Generic => {}
        }
    }
}
