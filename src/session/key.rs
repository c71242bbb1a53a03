//! Session keys

use core::fmt;

use std::net::IpAddr;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Transport {
    Tcp,
    Udp,
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transport::Tcp => f.write_str("TCP"),
            Transport::Udp => f.write_str("UDP"),
        }
    }
}

/// Source and destination addresses of the IP header carrying a transport layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IpEndpoints {
    pub src: IpAddr,
    pub dst: IpAddr,
}

impl IpEndpoints {
    pub fn new<A: Into<IpAddr>>(src: A, dst: A) -> Self {
        Self {
            src: src.into(),
            dst: dst.into(),
        }
    }
}

/// Direction independent identity of a transport session.
///
/// The two `(address, port)` pairs are stored in ascending order so that both directions of a
/// session map to the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SessionKey {
    transport: Transport,
    lower: (IpAddr, u16),
    upper: (IpAddr, u16),
}

impl SessionKey {
    pub fn new(transport: Transport, endpoints: &IpEndpoints, src_port: u16, dst_port: u16) -> Self {
        let a = (endpoints.src, src_port);
        let b = (endpoints.dst, dst_port);
        let (lower, upper) = if a <= b { (a, b) } else { (b, a) };
        Self {
            transport,
            lower,
            upper,
        }
    }

    pub fn transport(&self) -> Transport {
        self.transport
    }

    /// Both ports, smaller first.
    pub fn ports(&self) -> (u16, u16) {
        let (p, q) = (self.lower.1, self.upper.1);
        if p <= q {
            (p, q)
        } else {
            (q, p)
        }
    }

    pub fn endpoints(&self) -> [(IpAddr, u16); 2] {
        [self.lower, self.upper]
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}:{} <-> {}:{}",
            self.transport, self.lower.0, self.lower.1, self.upper.0, self.upper.1
        )
    }
}
