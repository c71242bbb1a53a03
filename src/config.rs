//! Dissection configuration
//!
//! All knobs have defaults; a [`Config`] can also be read from JSON, any missing field keeping its
//! default.

use serde::{Deserialize, Serialize};

use crate::session::FinderPolicy;

/// Limits and modes applied while dissecting a single Frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DissectOptions {
    /// Skip building the human readable attributes of every layer.
    pub quick_parse: bool,
    /// Deepest layer nesting before the remaining bytes are shown raw.
    pub max_depth: usize,
    /// Upper bound on the commands of one SMB AndX chain.
    pub max_andx_chain: usize,
    /// Upper bound on the records a handshake reassembly may look at.
    pub max_reassembly_records: usize,
}

impl Default for DissectOptions {
    fn default() -> Self {
        Self {
            quick_parse: false,
            max_depth: 64,
            max_andx_chain: 16,
            max_reassembly_records: 64,
        }
    }
}

impl DissectOptions {
    pub fn quick() -> Self {
        Self {
            quick_parse: true,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub dissect: DissectOptions,
    pub finder: FinderPolicy,
}

impl Config {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Precedence;

    #[test]
    fn partial_json_keeps_defaults() {
        let config =
            Config::from_json(r#"{"dissect": {"quick_parse": true}, "finder": {"precedence": "content_first"}}"#)
                .unwrap();
        assert!(config.dissect.quick_parse);
        assert_eq!(config.dissect.max_depth, DissectOptions::default().max_depth);
        assert_eq!(config.finder.precedence, Precedence::ContentFirst);
        assert!(config.finder.content_sniffing);
    }

    #[test]
    fn empty_json_is_default() {
        assert_eq!(Config::from_json("{}").unwrap(), Config::default());
    }
}
