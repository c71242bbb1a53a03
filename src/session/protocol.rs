//! Application protocols a session can be identified as.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::Error;
use crate::layer::Decoded;
use crate::layers::{dns, http, sip, smb, tls, vxlan};
use crate::packet::Frame;
use crate::range::ByteRange;

use super::Transport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AppProtocol {
    Http,
    Tls,
    NetBiosSmb,
    Dns,
    Sip,
    Vxlan,
}

impl AppProtocol {
    /// Decodes a transport payload as this protocol.
    ///
    /// `Err(Error::Unrecognized)` means the payload is simply not this protocol.
    pub fn decode(
        &self,
        frame: &Frame,
        range: ByteRange,
        transport: Transport,
    ) -> Result<Decoded, Error> {
        match self {
            AppProtocol::Http => http::Http::decode(frame, range),
            AppProtocol::Tls => match transport {
                Transport::Tcp => tls::TlsRecord::decode(frame, range, 0),
                Transport::Udp => Err(Error::Unrecognized),
            },
            AppProtocol::NetBiosSmb => match transport {
                Transport::Tcp => smb::NetBiosSession::decode(frame, range),
                Transport::Udp => Err(Error::Unrecognized),
            },
            AppProtocol::Dns => dns::DNS::decode(frame, range, transport == Transport::Tcp),
            AppProtocol::Sip => sip::Sip::decode(frame, range),
            AppProtocol::Vxlan => match transport {
                Transport::Udp => vxlan::VXLAN::decode(frame, range),
                Transport::Tcp => Err(Error::Unrecognized),
            },
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AppProtocol::Http => "HTTP",
            AppProtocol::Tls => "TLS",
            AppProtocol::NetBiosSmb => "NetBIOS/SMB",
            AppProtocol::Dns => "DNS",
            AppProtocol::Sip => "SIP",
            AppProtocol::Vxlan => "VXLAN",
        }
    }
}

impl fmt::Display for AppProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
