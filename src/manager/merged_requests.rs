//! Merged request detection
//!
//! RFC 3261 loop detection for forked requests: two inbound initial requests
//! with the same From-tag, Call-ID and CSeq number are the same request
//! arriving over different paths and must not spawn two independent exchange
//! groups. The manager keeps one [`MergedRequestTable`] of in-flight keys;
//! UAS-created dialog sets register their key at creation and unregister it
//! at teardown.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::errors::{DialogError, DialogResult};
use crate::sip::{CSeq, SipMessage};

/// Key identifying an inbound initial request for duplicate detection
///
/// The full CSeq participates so that a CANCEL, which shares its INVITE's
/// sequence number but not its method, is never mistaken for a merge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MergedRequestKey {
    call_id: String,
    from_tag: String,
    cseq: CSeq,
}

impl MergedRequestKey {
    /// Derive the key from an inbound initial request
    pub fn from_request(msg: &SipMessage) -> DialogResult<Self> {
        debug_assert!(msg.is_request() && msg.is_external());
        let from_tag = msg
            .from_tag()
            .ok_or_else(|| DialogError::malformed("request has no From-tag"))?;
        Ok(Self {
            call_id: msg.call_id().to_string(),
            from_tag: from_tag.to_string(),
            cseq: msg.cseq().clone(),
        })
    }
}

/// Process-wide registry of in-flight merged-request keys
#[derive(Debug, Default)]
pub struct MergedRequestTable {
    keys: HashSet<MergedRequestKey>,
}

impl MergedRequestTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a key; returns `false` if it was already present
    pub fn insert(&mut self, key: MergedRequestKey) -> bool {
        self.keys.insert(key)
    }

    /// Unregister a key; no-op if absent
    pub fn remove(&mut self, key: &MergedRequestKey) {
        self.keys.remove(key);
    }

    pub fn contains(&self, key: &MergedRequestKey) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
