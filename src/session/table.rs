//! Table of the sessions seen so far

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{AppProtocol, FinderPolicy, FinderState, ProtocolFinder, SessionKey};

type SharedFinder = Arc<Mutex<ProtocolFinder>>;

/// Protocol finders keyed by session, shared by every thread dissecting frames of the capture.
///
/// The table lock is only held to look a finder up; each finder has its own lock, so frames of
/// different sessions never wait on each other while decoding.
#[derive(Debug, Default)]
pub struct SessionTable {
    policy: FinderPolicy,
    sessions: Mutex<HashMap<SessionKey, SharedFinder>>,
}

impl SessionTable {
    pub fn new(policy: FinderPolicy) -> Self {
        Self {
            policy,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn policy(&self) -> &FinderPolicy {
        &self.policy
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<SessionKey, SharedFinder>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn finder(&self, key: &SessionKey, payload: &[u8]) -> SharedFinder {
        let mut sessions = self.sessions();
        let finder = sessions.entry(*key).or_insert_with(|| {
            let probable = self.policy.seed(key.transport(), key.ports(), payload);
            log::trace!("new session {}, probable {:?}", key, probable);
            Arc::new(Mutex::new(ProtocolFinder::new(key.transport(), probable)))
        });
        Arc::clone(finder)
    }

    /// Runs `f` on the finder of `key`, creating it when the session is new.
    ///
    /// `payload` is the first payload of a new session, used to seed its probable list.
    pub fn with_finder<R, F>(&self, key: &SessionKey, payload: &[u8], f: F) -> R
    where
        F: FnOnce(&mut ProtocolFinder) -> R,
    {
        let finder = self.finder(key, payload);
        let mut guard = finder.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    pub fn state(&self, key: &SessionKey) -> Option<FinderState> {
        let finder = self.sessions().get(key).cloned()?;
        let state = finder
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .state()
            .clone();
        Some(state)
    }

    pub fn confirmed_protocol(&self, key: &SessionKey) -> Option<AppProtocol> {
        match self.state(key)? {
            FinderState::Confirmed(p) => Some(p),
            FinderState::Unconfirmed { .. } => None,
        }
    }

    /// Adds an out-of-band hint to a session, creating the session when needed.
    pub fn hint(&self, key: &SessionKey, protocol: AppProtocol) {
        self.with_finder(key, &[], |finder| finder.add_probable(protocol));
    }

    /// Forgets a session. Eviction is left to the owner of the table.
    pub fn remove(&self, key: &SessionKey) -> Option<FinderState> {
        let finder = self.sessions().remove(key)?;
        let state = finder
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .state()
            .clone();
        Some(state)
    }

    pub fn len(&self) -> usize {
        self.sessions().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{IpEndpoints, Transport};
    use std::net::Ipv4Addr;

    fn key() -> SessionKey {
        let endpoints = IpEndpoints::new(Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 0, 0, 2));
        SessionKey::new(Transport::Tcp, &endpoints, 40000, 443)
    }

    #[test]
    fn seeded_once() {
        let table = SessionTable::default();
        let probable = table.with_finder(&key(), b"", |f| f.probable().to_vec());
        assert_eq!(probable, [AppProtocol::Tls]);

        table.hint(&key(), AppProtocol::Http);
        assert_eq!(
            table.state(&key()),
            Some(FinderState::Unconfirmed {
                probable: vec![AppProtocol::Tls, AppProtocol::Http]
            })
        );
        assert_eq!(table.len(), 1);
        assert_eq!(table.confirmed_protocol(&key()), None);
    }

    #[test]
    fn remove_forgets() {
        let table = SessionTable::default();
        table.with_finder(&key(), b"", |f| f.confirm(AppProtocol::Tls));
        assert_eq!(table.confirmed_protocol(&key()), Some(AppProtocol::Tls));
        assert_eq!(
            table.remove(&key()),
            Some(FinderState::Confirmed(AppProtocol::Tls))
        );
        assert!(table.is_empty());
        assert_eq!(table.state(&key()), None);
    }
}
