//! Application protocol identification
//!
//! Transport payloads are not dispatched through a static table: the protocol they carry is
//! decided per session by a [`ProtocolFinder`]. A new session starts with a list of probable
//! protocols seeded from well-known ports and from the payload's content. Each payload is tried
//! against the candidates in order until one decodes, after which the session is confirmed and
//! only that protocol is tried again.

mod finder;
mod key;
mod policy;
mod protocol;
mod table;

pub use finder::{FinderState, Identification, ProtocolFinder};
pub use key::{IpEndpoints, SessionKey, Transport};
pub use policy::{FinderPolicy, Precedence};
pub use protocol::AppProtocol;
pub use table::SessionTable;

use crate::dispatch;
use crate::errors::Error;
use crate::layer::Decoded;
use crate::packet::Frame;
use crate::range::ByteRange;

/// Identifies and decodes the transport payload `range` of the session `key`.
///
/// Without a table the payload is identified on its own, as the first payload of a new session.
///
/// A payload the confirmed protocol declines, such as a continuation segment of a larger HTTP
/// body, becomes a silent [`Raw`](crate::layers::raw::Raw) node. Only a payload the confirmed
/// protocol recognizes but fails to parse records an anomaly.
pub(crate) fn decode_payload(
    frame: &Frame,
    sessions: Option<&SessionTable>,
    key: &SessionKey,
    range: ByteRange,
) -> Decoded {
    let payload = frame.slice(range);
    let identification = match sessions {
        Some(table) => table.with_finder(key, payload, |finder| {
            if finder.confirmed().is_none() {
                for hint in table.policy().sniff(key.transport(), payload) {
                    finder.add_probable(hint);
                }
            }
            finder.identify(frame, range)
        }),
        None => {
            let policy = FinderPolicy::default();
            let probable = policy.seed(key.transport(), key.ports(), payload);
            ProtocolFinder::new(key.transport(), probable).identify(frame, range)
        }
    };

    match identification {
        Identification::Parsed(_, decoded) => decoded,
        Identification::ConfirmedMismatch(_, Error::Unrecognized) => dispatch::raw(range),
        Identification::ConfirmedMismatch(protocol, e) => {
            frame.record_anomaly(range, format!("{} payload: {}", protocol, e));
            dispatch::raw(range)
        }
        unidentified => {
            if unidentified.all_failed() {
                if let Identification::Unidentified { failures, .. } = unidentified {
                    let reasons: Vec<_> = failures
                        .iter()
                        .map(|(protocol, e)| format!("{}: {}", protocol, e))
                        .collect();
                    frame.record_anomaly(range, reasons.join("; "));
                }
            }
            dispatch::raw(range)
        }
    }
}
