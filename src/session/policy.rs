//! Seeding of the probable protocol list.

use serde::{Deserialize, Serialize};

use crate::layers::{http, sip, smb, tls};

use super::{AppProtocol, Transport};

const TCP_PORTS: &[(u16, AppProtocol)] = &[
    (53, AppProtocol::Dns),
    (80, AppProtocol::Http),
    (139, AppProtocol::NetBiosSmb),
    (443, AppProtocol::Tls),
    (445, AppProtocol::NetBiosSmb),
    (465, AppProtocol::Tls),
    (993, AppProtocol::Tls),
    (995, AppProtocol::Tls),
    (3128, AppProtocol::Http),
    (5060, AppProtocol::Sip),
    (5061, AppProtocol::Tls),
    (8000, AppProtocol::Http),
    (8080, AppProtocol::Http),
    (8443, AppProtocol::Tls),
];

const UDP_PORTS: &[(u16, AppProtocol)] = &[
    (53, AppProtocol::Dns),
    (4789, AppProtocol::Vxlan),
    (5060, AppProtocol::Sip),
    (5353, AppProtocol::Dns),
];

/// Which kind of evidence comes first in a new session's probable list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Precedence {
    /// Well-known port matches, then content matches.
    #[default]
    PortFirst,
    /// Content matches, then well-known port matches.
    ContentFirst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinderPolicy {
    pub precedence: Precedence,
    /// Look at payload bytes for protocol signatures.
    pub content_sniffing: bool,
}

impl Default for FinderPolicy {
    fn default() -> Self {
        Self {
            precedence: Precedence::PortFirst,
            content_sniffing: true,
        }
    }
}

impl FinderPolicy {
    /// Protocols registered for either port, the smaller port first.
    pub fn by_port(transport: Transport, ports: (u16, u16)) -> Vec<AppProtocol> {
        let table = match transport {
            Transport::Tcp => TCP_PORTS,
            Transport::Udp => UDP_PORTS,
        };
        let mut found = Vec::new();
        for port in [ports.0, ports.1] {
            for (_, protocol) in table.iter().filter(|(p, _)| *p == port) {
                push_unique(&mut found, *protocol);
            }
        }
        found
    }

    /// Protocols whose signature matches the start of `payload`. Empty when sniffing is off.
    pub fn sniff(&self, transport: Transport, payload: &[u8]) -> Vec<AppProtocol> {
        let mut found = Vec::new();
        if !self.content_sniffing {
            return found;
        }
        if transport == Transport::Tcp {
            if tls::looks_like_record(payload) {
                found.push(AppProtocol::Tls);
            }
            if smb::looks_like_netbios_smb(payload) {
                found.push(AppProtocol::NetBiosSmb);
            }
            if http::looks_like_http(payload) {
                found.push(AppProtocol::Http);
            }
        }
        if sip::looks_like_sip(payload) {
            found.push(AppProtocol::Sip);
        }
        found
    }

    /// The initial probable list of a session, deduplicated and ordered by the precedence.
    pub fn seed(&self, transport: Transport, ports: (u16, u16), payload: &[u8]) -> Vec<AppProtocol> {
        let by_port = Self::by_port(transport, ports);
        let by_content = self.sniff(transport, payload);
        let (first, second) = match self.precedence {
            Precedence::PortFirst => (by_port, by_content),
            Precedence::ContentFirst => (by_content, by_port),
        };
        let mut probable = first;
        for protocol in second {
            push_unique(&mut probable, protocol);
        }
        probable
    }
}

pub(crate) fn push_unique(list: &mut Vec<AppProtocol>, protocol: AppProtocol) -> bool {
    if list.contains(&protocol) {
        false
    } else {
        list.push(protocol);
        true
    }
}
