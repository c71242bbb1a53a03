//! TLS Handshake messages

use std::sync::Arc;

use serde::Serialize;

use crate::errors::Error;
use crate::layer::{Attributes, Decoded, Dispatch, Layer};
use crate::packet::Frame;
use crate::range::ByteRange;

pub const HANDSHAKE_HEADER_LENGTH: usize = 4_usize;

pub const HELLO_REQUEST: u8 = 0;
pub const CLIENT_HELLO: u8 = 1;
pub const SERVER_HELLO: u8 = 2;
pub const NEW_SESSION_TICKET: u8 = 4;
pub const ENCRYPTED_EXTENSIONS: u8 = 8;
pub const CERTIFICATE: u8 = 11;
pub const SERVER_KEY_EXCHANGE: u8 = 12;
pub const CERTIFICATE_REQUEST: u8 = 13;
pub const SERVER_HELLO_DONE: u8 = 14;
pub const CERTIFICATE_VERIFY: u8 = 15;
pub const CLIENT_KEY_EXCHANGE: u8 = 16;
pub const FINISHED: u8 = 20;

const EXT_SERVER_NAME: u16 = 0;
const EXT_ALPN: u16 = 16;
const EXT_SUPPORTED_VERSIONS: u16 = 43;

/// Total length of the handshake message at the start of `bytes`, header included.
pub fn handshake_length(bytes: &[u8]) -> Option<usize> {
    if bytes.len() < HANDSHAKE_HEADER_LENGTH {
        return None;
    }
    Some(HANDSHAKE_HEADER_LENGTH + u24(&bytes[1..4]))
}

fn u24(b: &[u8]) -> usize {
    (b[0] as usize) << 16 | (b[1] as usize) << 8 | b[2] as usize
}

pub fn version_name(version: u16) -> &'static str {
    match version {
        0x0300 => "SSL 3.0",
        0x0301 => "TLS 1.0",
        0x0302 => "TLS 1.1",
        0x0303 => "TLS 1.2",
        0x0304 => "TLS 1.3",
        _ => "Unknown",
    }
}

/// Bounds checked reads of handshake message fields.
struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], Error> {
        let end = self.pos + n;
        let out = self
            .bytes
            .get(self.pos..end)
            .ok_or_else(|| Error::too_short(end, self.bytes))?;
        self.pos = end;
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, Error> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, Error> {
        let b = self.take(2)?;
        Ok((b[0] as u16) << 8 | b[1] as u16)
    }

    fn u24(&mut self) -> Result<usize, Error> {
        Ok(u24(self.take(3)?))
    }

    /// A vector prefixed by its length on `width` bytes.
    fn vector(&mut self, width: usize) -> Result<&'a [u8], Error> {
        let len = match width {
            1 => self.u8()? as usize,
            2 => self.u16()? as usize,
            _ => self.u24()?,
        };
        self.take(len)
    }
}

fn u16_list(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks_exact(2)
        .map(|c| (c[0] as u16) << 8 | c[1] as u16)
        .collect()
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct ClientHello {
    #[serde(serialize_with = "crate::types::hex::serialize_lower_hex_u16")]
    version: u16,
    #[serde(serialize_with = "hex::serialize")]
    random: Vec<u8>,
    #[serde(serialize_with = "hex::serialize")]
    session_id: Vec<u8>,
    cipher_suites: Vec<u16>,
    compression_methods: Vec<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    server_host_name: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    alpn: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    supported_versions: Vec<u16>,
    extensions: Vec<u16>,
}

impl ClientHello {
    fn parse(body: &[u8]) -> Result<Self, Error> {
        let mut c = Cursor::new(body);
        let mut hello = ClientHello {
            version: c.u16()?,
            random: c.take(32)?.to_vec(),
            session_id: c.vector(1)?.to_vec(),
            cipher_suites: u16_list(c.vector(2)?),
            compression_methods: c.vector(1)?.to_vec(),
            ..Default::default()
        };
        // Extensions are optional before TLS 1.2.
        if c.remaining() == 0 {
            return Ok(hello);
        }

        let mut extensions = Cursor::new(c.vector(2)?);
        while extensions.remaining() > 0 {
            let ext_type = extensions.u16()?;
            let data = extensions.vector(2)?;
            hello.extensions.push(ext_type);
            match ext_type {
                EXT_SERVER_NAME => hello.server_host_name = server_name(data)?,
                EXT_ALPN => hello.alpn = alpn_protocols(data)?,
                EXT_SUPPORTED_VERSIONS => {
                    let mut d = Cursor::new(data);
                    hello.supported_versions = u16_list(d.vector(1)?);
                }
                _ => {}
            }
        }
        Ok(hello)
    }

    /// Host name from the server_name extension, if the client sent one.
    pub fn server_host_name(&self) -> Option<&str> {
        self.server_host_name.as_deref()
    }

    pub fn alpn(&self) -> &[String] {
        &self.alpn
    }

    pub fn cipher_suites(&self) -> &[u16] {
        &self.cipher_suites
    }

    pub fn supported_versions(&self) -> &[u16] {
        &self.supported_versions
    }
}

// RFC 6066, section 3: a list of (type, name) entries; type 0 is a DNS host name.
fn server_name(data: &[u8]) -> Result<Option<String>, Error> {
    let mut list = Cursor::new(Cursor::new(data).vector(2)?);
    while list.remaining() > 0 {
        let name_type = list.u8()?;
        let name = list.vector(2)?;
        if name_type == 0 {
            let name = core::str::from_utf8(name)
                .map_err(|_| Error::parse("server name is not UTF-8"))?;
            return Ok(Some(name.to_string()));
        }
    }
    Ok(None)
}

// RFC 7301, section 3.1
fn alpn_protocols(data: &[u8]) -> Result<Vec<String>, Error> {
    let mut list = Cursor::new(Cursor::new(data).vector(2)?);
    let mut protocols = vec![];
    while list.remaining() > 0 {
        protocols.push(String::from_utf8_lossy(list.vector(1)?).into_owned());
    }
    Ok(protocols)
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct ServerHello {
    #[serde(serialize_with = "crate::types::hex::serialize_lower_hex_u16")]
    version: u16,
    #[serde(serialize_with = "hex::serialize")]
    random: Vec<u8>,
    #[serde(serialize_with = "hex::serialize")]
    session_id: Vec<u8>,
    #[serde(serialize_with = "crate::types::hex::serialize_lower_hex_u16")]
    cipher_suite: u16,
    compression_method: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    selected_version: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    alpn: Option<String>,
}

impl ServerHello {
    fn parse(body: &[u8]) -> Result<Self, Error> {
        let mut c = Cursor::new(body);
        let mut hello = ServerHello {
            version: c.u16()?,
            random: c.take(32)?.to_vec(),
            session_id: c.vector(1)?.to_vec(),
            cipher_suite: c.u16()?,
            compression_method: c.u8()?,
            ..Default::default()
        };
        if c.remaining() == 0 {
            return Ok(hello);
        }

        let mut extensions = Cursor::new(c.vector(2)?);
        while extensions.remaining() > 0 {
            let ext_type = extensions.u16()?;
            let data = extensions.vector(2)?;
            match ext_type {
                EXT_SUPPORTED_VERSIONS => hello.selected_version = Some(Cursor::new(data).u16()?),
                EXT_ALPN => hello.alpn = alpn_protocols(data)?.into_iter().next(),
                _ => {}
            }
        }
        Ok(hello)
    }

    pub fn cipher_suite(&self) -> u16 {
        self.cipher_suite
    }

    /// The negotiated version: the supported_versions extension if present, else the legacy field.
    pub fn negotiated_version(&self) -> u16 {
        self.selected_version.unwrap_or(self.version)
    }
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct Certificate {
    certificate_lengths: Vec<usize>,
}

impl Certificate {
    fn parse(body: &[u8]) -> Result<Self, Error> {
        let mut list = Cursor::new(Cursor::new(body).vector(3)?);
        let mut certificate_lengths = vec![];
        while list.remaining() > 0 {
            certificate_lengths.push(list.vector(3)?.len());
        }
        Ok(Certificate {
            certificate_lengths,
        })
    }

    pub fn certificate_lengths(&self) -> &[usize] {
        &self.certificate_lengths
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum HandshakeBody {
    ClientHello(ClientHello),
    ServerHello(ServerHello),
    Certificate(Certificate),
    Other,
}

#[derive(Debug, Clone, Serialize)]
pub struct Handshake {
    msg_type: u8,
    length: usize,
    #[serde(skip_serializing_if = "is_other")]
    body: HandshakeBody,
    #[serde(skip_serializing_if = "core::ops::Not::not")]
    reassembled: bool,
}

fn is_other(body: &HandshakeBody) -> bool {
    matches!(body, HandshakeBody::Other)
}

impl Handshake {
    /// Parses the handshake message at the start of `bytes`, returning it with its total length.
    pub fn parse(bytes: &[u8]) -> Result<(Handshake, usize), Error> {
        let total = handshake_length(bytes)
            .ok_or_else(|| Error::too_short(HANDSHAKE_HEADER_LENGTH, bytes))?;
        let body = bytes
            .get(HANDSHAKE_HEADER_LENGTH..total)
            .ok_or_else(|| Error::too_short(total, bytes))?;

        let msg_type = bytes[0];
        let body = match msg_type {
            CLIENT_HELLO => HandshakeBody::ClientHello(ClientHello::parse(body)?),
            SERVER_HELLO => HandshakeBody::ServerHello(ServerHello::parse(body)?),
            CERTIFICATE => match Certificate::parse(body) {
                Ok(certificate) => HandshakeBody::Certificate(certificate),
                // TLS 1.3 prefixes the list with a request context.
                Err(_) => HandshakeBody::Other,
            },
            _ => HandshakeBody::Other,
        };
        let handshake = Handshake {
            msg_type,
            length: total - HANDSHAKE_HEADER_LENGTH,
            body,
            reassembled: false,
        };
        Ok((handshake, total))
    }

    /// Decodes one message of a record that holds whole messages; the next one follows it.
    pub(crate) fn decode(frame: &Frame, range: ByteRange) -> Result<Decoded, Error> {
        let (handshake, total) = Self::parse(frame.slice(range))?;
        let own = range.take(total).unwrap_or(range);
        Ok(Decoded::new(handshake, own).following(Dispatch::TlsHandshake, range.after(&own)))
    }

    /// The `index`th message of a handshake reassembled from several records.
    pub(crate) fn reassembled(
        messages: &Arc<[Handshake]>,
        index: usize,
        range: ByteRange,
    ) -> Result<Decoded, Error> {
        let mut handshake = messages
            .get(index)
            .cloned()
            .ok_or_else(|| Error::parse(format!("no reassembled handshake message {}", index)))?;
        handshake.reassembled = true;
        Ok(Decoded::new(handshake, range))
    }

    pub fn msg_type(&self) -> u8 {
        self.msg_type
    }

    pub fn body(&self) -> &HandshakeBody {
        &self.body
    }

    pub fn type_name(&self) -> &'static str {
        match self.msg_type {
            HELLO_REQUEST => "HelloRequest",
            CLIENT_HELLO => "ClientHello",
            SERVER_HELLO => "ServerHello",
            NEW_SESSION_TICKET => "NewSessionTicket",
            ENCRYPTED_EXTENSIONS => "EncryptedExtensions",
            CERTIFICATE => "Certificate",
            SERVER_KEY_EXCHANGE => "ServerKeyExchange",
            CERTIFICATE_REQUEST => "CertificateRequest",
            SERVER_HELLO_DONE => "ServerHelloDone",
            CERTIFICATE_VERIFY => "CertificateVerify",
            CLIENT_KEY_EXCHANGE => "ClientKeyExchange",
            FINISHED => "Finished",
            _ => "Unknown",
        }
    }
}

/// Every message of a buffer holding whole handshake messages back to back.
pub fn parse_handshake_messages(buffer: &[u8]) -> Result<Vec<Handshake>, Error> {
    let mut messages = vec![];
    let mut pos = 0;
    while pos < buffer.len() {
        let (handshake, total) = Handshake::parse(&buffer[pos..])?;
        messages.push(handshake);
        pos += total;
    }
    Ok(messages)
}

impl Layer for Handshake {
    fn name(&self) -> &'static str {
        "TLS Handshake"
    }

    fn short_name(&self) -> &'static str {
        "tls_handshake"
    }

    fn attributes(&self, _bytes: &[u8], attrs: &mut Attributes) {
        attrs.add("Type", format!("{} ({})", self.type_name(), self.msg_type));
        attrs.add("Length", self.length);
        if self.reassembled {
            attrs.add("Reassembled", "yes");
        }
        match self.body {
            HandshakeBody::ClientHello(ref hello) => {
                attrs.add("Version", version_name(hello.version));
                if let Some(ref name) = hello.server_host_name {
                    attrs.add("Server Name", name);
                }
                if !hello.alpn.is_empty() {
                    attrs.add("ALPN", hello.alpn.join(","));
                }
                for version in &hello.supported_versions {
                    attrs.add("Supported Version", version_name(*version));
                }
                attrs.add("Cipher Suites", hello.cipher_suites.len());
            }
            HandshakeBody::ServerHello(ref hello) => {
                attrs.add("Version", version_name(hello.negotiated_version()));
                attrs.add("Cipher Suite", format!("0x{:04x}", hello.cipher_suite));
                if let Some(ref alpn) = hello.alpn {
                    attrs.add("ALPN", alpn);
                }
            }
            HandshakeBody::Certificate(ref certificate) => {
                for len in &certificate.certificate_lengths {
                    attrs.add("Certificate Length", len);
                }
            }
            HandshakeBody::Other => {}
        }
    }
}
