//! Definition of IP Address Types
//!
//! Thin wrappers over byte arrays that display and serialize in the usual textual notation and
//! convert to and from [`std::net`] addresses.

use core::convert::TryFrom;
use core::fmt;

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use serde::{Serialize, Serializer};

use crate::errors::Error as CrateError;

#[derive(Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IPv4Address([u8; 4]);

impl IPv4Address {
    pub const fn octets(&self) -> [u8; 4] {
        self.0
    }
}

impl From<[u8; 4]> for IPv4Address {
    fn from(value: [u8; 4]) -> Self {
        Self(value)
    }
}

impl TryFrom<&'_ [u8]> for IPv4Address {
    type Error = CrateError;

    fn try_from(slice: &'_ [u8]) -> Result<Self, Self::Error> {
        <[u8; 4]>::try_from(slice)
            .map(Self)
            .map_err(|_| CrateError::parse(format!("IPv4Address: {}", hex::encode(slice))))
    }
}

impl From<IPv4Address> for Ipv4Addr {
    fn from(addr: IPv4Address) -> Self {
        Ipv4Addr::from(addr.0)
    }
}

impl From<IPv4Address> for IpAddr {
    fn from(addr: IPv4Address) -> Self {
        IpAddr::V4(addr.into())
    }
}

impl fmt::Display for IPv4Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}.{}", self.0[0], self.0[1], self.0[2], self.0[3])
    }
}

impl fmt::Debug for IPv4Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl Serialize for IPv4Address {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(format!("{}", self).as_str())
    }
}

#[derive(Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IPv6Address([u8; 16]);

impl IPv6Address {
    pub const fn octets(&self) -> [u8; 16] {
        self.0
    }
}

impl From<[u8; 16]> for IPv6Address {
    fn from(value: [u8; 16]) -> Self {
        Self(value)
    }
}

impl TryFrom<&'_ [u8]> for IPv6Address {
    type Error = CrateError;

    fn try_from(slice: &'_ [u8]) -> Result<Self, Self::Error> {
        <[u8; 16]>::try_from(slice)
            .map(Self)
            .map_err(|_| CrateError::parse(format!("IPv6Address: {}", hex::encode(slice))))
    }
}

impl TryFrom<&'_ [u16]> for IPv6Address {
    type Error = CrateError;

    fn try_from(segments: &'_ [u16]) -> Result<Self, Self::Error> {
        if segments.len() != 8 {
            return Err(CrateError::parse(format!(
                "IPv6Address: {} segments",
                segments.len()
            )));
        }
        let mut ip = IPv6Address::default();
        for (i, segment) in segments.iter().enumerate() {
            ip.0[2 * i..2 * i + 2].copy_from_slice(&segment.to_be_bytes());
        }
        Ok(ip)
    }
}

impl From<IPv6Address> for Ipv6Addr {
    fn from(addr: IPv6Address) -> Self {
        Ipv6Addr::from(addr.0)
    }
}

impl From<IPv6Address> for IpAddr {
    fn from(addr: IPv6Address) -> Self {
        IpAddr::V6(addr.into())
    }
}

impl fmt::Display for IPv6Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // RFC 5952 compression is what `Ipv6Addr` renders.
        fmt::Display::fmt(&Ipv6Addr::from(self.0), f)
    }
}

impl fmt::Debug for IPv6Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl Serialize for IPv6Address {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(format!("{}", self).as_str())
    }
}
