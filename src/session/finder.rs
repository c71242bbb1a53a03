//! Per session protocol finder

use serde::Serialize;

use crate::errors::Error;
use crate::layer::Decoded;
use crate::packet::Frame;
use crate::range::ByteRange;

use super::policy::push_unique;
use super::{AppProtocol, Transport};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum FinderState {
    /// No protocol proven yet; candidates most likely first.
    Unconfirmed { probable: Vec<AppProtocol> },
    /// Final for the lifetime of the session.
    Confirmed(AppProtocol),
}

/// Outcome of [`ProtocolFinder::identify`] for one payload.
#[derive(Debug)]
pub enum Identification {
    /// The payload decoded as the session's protocol.
    Parsed(AppProtocol, Decoded),
    /// The session is confirmed but this payload failed to decode as its protocol.
    ConfirmedMismatch(AppProtocol, Error),
    /// No candidate accepted the payload.
    Unidentified {
        tried: usize,
        failures: Vec<(AppProtocol, Error)>,
    },
}

impl Identification {
    /// Whether every candidate tried actively failed, as opposed to declining the payload.
    pub fn all_failed(&self) -> bool {
        match self {
            Identification::Unidentified { tried, failures } => {
                *tried > 0 && failures.len() == *tried
            }
            _ => false,
        }
    }
}

/// Tracks which application protocol a transport session carries.
///
/// Once confirmed, the protocol never changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolFinder {
    transport: Transport,
    state: FinderState,
}

impl ProtocolFinder {
    pub fn new(transport: Transport, probable: Vec<AppProtocol>) -> Self {
        let mut unique = Vec::with_capacity(probable.len());
        for protocol in probable {
            push_unique(&mut unique, protocol);
        }
        Self {
            transport,
            state: FinderState::Unconfirmed { probable: unique },
        }
    }

    pub fn transport(&self) -> Transport {
        self.transport
    }

    pub fn state(&self) -> &FinderState {
        &self.state
    }

    pub fn confirmed(&self) -> Option<AppProtocol> {
        match self.state {
            FinderState::Confirmed(p) => Some(p),
            FinderState::Unconfirmed { .. } => None,
        }
    }

    /// Candidates still being tried, empty once confirmed.
    pub fn probable(&self) -> &[AppProtocol] {
        match self.state {
            FinderState::Unconfirmed { ref probable } => probable,
            FinderState::Confirmed(_) => &[],
        }
    }

    /// Appends a candidate at the lowest priority. No effect once confirmed or when already
    /// listed.
    pub fn add_probable(&mut self, protocol: AppProtocol) {
        if let FinderState::Unconfirmed { ref mut probable } = self.state {
            push_unique(probable, protocol);
        }
    }

    /// Confirms `protocol` unless a protocol is already confirmed. Returns the confirmed protocol.
    pub fn confirm(&mut self, protocol: AppProtocol) -> AppProtocol {
        match self.state {
            FinderState::Confirmed(p) => p,
            FinderState::Unconfirmed { .. } => {
                log::trace!("{} session confirmed as {}", self.transport, protocol);
                self.state = FinderState::Confirmed(protocol);
                protocol
            }
        }
    }

    /// Decodes one payload of the session, advancing the state.
    ///
    /// A confirmed session only tries its protocol, and a payload it declines is returned as
    /// [`Identification::ConfirmedMismatch`] with [`Error::Unrecognized`] for the caller to show
    /// quietly. Otherwise the candidates are tried in order and the first one that decodes
    /// becomes the confirmed protocol.
    pub fn identify(&mut self, frame: &Frame, range: ByteRange) -> Identification {
        let probable = match self.state {
            FinderState::Confirmed(p) => {
                return match p.decode(frame, range, self.transport) {
                    Ok(decoded) => Identification::Parsed(p, decoded),
                    Err(e) => Identification::ConfirmedMismatch(p, e),
                };
            }
            FinderState::Unconfirmed { ref probable } => probable.clone(),
        };

        let mut failures = vec![];
        for candidate in probable.iter().copied() {
            match candidate.decode(frame, range, self.transport) {
                Ok(decoded) => {
                    self.confirm(candidate);
                    return Identification::Parsed(candidate, decoded);
                }
                Err(Error::Unrecognized) => {}
                Err(e) => failures.push((candidate, e)),
            }
        }
        Identification::Unidentified {
            tried: probable.len(),
            failures,
        }
    }
}
