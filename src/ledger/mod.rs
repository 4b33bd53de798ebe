//! Model of the host ledger the surety contracts run on.
//!
//! The host provides caller identity, value attached to a transition, a block-ordered history
//! and an event log. Everything else in the crate is expressed in terms of these types.

pub mod amount;
pub mod events;

pub use amount::{Amount, AmountParseError, BASE_UNITS_PER_UNIT};
pub use events::{EventLog, LedgerEvent, SuretyEvent};

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque account identity, supplied by the host for every transition
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        AccountId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountId {
    fn from(id: &str) -> Self {
        AccountId(id.to_string())
    }
}

impl From<String> for AccountId {
    fn from(id: String) -> Self {
        AccountId(id)
    }
}

/// A single state transition submitted to the ledger: who is calling and how much native
/// value they attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub caller: AccountId,
    pub value: Amount,
}

impl Transition {
    /// A call with no value attached
    pub fn new(caller: impl Into<AccountId>) -> Self {
        Transition {
            caller: caller.into(),
            value: Amount::ZERO,
        }
    }

    pub fn with_value(mut self, value: Amount) -> Self {
        self.value = value;
        self
    }
}

/// Position of a transition in the block-ordered history
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockContext {
    pub height: u64,
    pub timestamp: u64,
}

impl BlockContext {
    /// Context for the block following this one
    pub fn next(&self, timestamp: u64) -> Self {
        BlockContext {
            height: self.height + 1,
            // Wall clocks can step backwards; block time may not.
            timestamp: timestamp.max(self.timestamp),
        }
    }
}

/// Serialize ordered maps with non-string keys as a list of pairs, so snapshots stay
/// representable in JSON.
pub(crate) mod map_as_pairs {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S, K, V>(map: &BTreeMap<K, V>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        K: Serialize,
        V: Serialize,
    {
        serializer.collect_seq(map.iter())
    }

    pub fn deserialize<'de, D, K, V>(deserializer: D) -> Result<BTreeMap<K, V>, D::Error>
    where
        D: Deserializer<'de>,
        K: Deserialize<'de> + Ord,
        V: Deserialize<'de>,
    {
        let pairs: Vec<(K, V)> = Vec::deserialize(deserializer)?;
        Ok(pairs.into_iter().collect())
    }
}
