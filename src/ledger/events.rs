use log::debug;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::insurance::{FlightKey, FlightStatus};
use crate::ledger::{AccountId, Amount, BlockContext};

/// Buffered events per live subscriber before the slowest one starts lagging
pub const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Observable facts emitted by committed transitions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SuretyEvent {
    OperatingStatusChanged {
        operational: bool,
    },
    AirlineFunded {
        airline: AccountId,
        amount: Amount,
        total: Amount,
    },
    AirlineRegistered {
        airline: AccountId,
        committee: usize,
    },
    RegistrationQueued {
        request_id: u64,
        candidate: AccountId,
        committee_at_request: usize,
    },
    RegistrationVote {
        request_id: u64,
        voter: AccountId,
        votes: usize,
    },
    FlightRegistered {
        flight: FlightKey,
    },
    InsurancePurchased {
        flight: FlightKey,
        passenger: AccountId,
        amount: Amount,
    },
    OracleRegistered {
        oracle: AccountId,
        indexes: Vec<u8>,
    },
    /// Oracles holding `index` are asked to report on the flight
    OracleRequest {
        index: u8,
        airline: AccountId,
        designator: String,
        timestamp: u64,
    },
    OracleReport {
        index: u8,
        airline: AccountId,
        designator: String,
        timestamp: u64,
        status: FlightStatus,
    },
    /// Quorum reached; the flight status is final
    FlightStatusInfo {
        index: u8,
        airline: AccountId,
        designator: String,
        timestamp: u64,
        status: FlightStatus,
    },
    PassengerCredited {
        passenger: AccountId,
        flight: FlightKey,
        amount: Amount,
    },
    PassengerPaid {
        passenger: AccountId,
        amount: Amount,
    },
}

/// An event together with its place in the history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEvent {
    pub sequence: u64,
    pub height: u64,
    pub event: SuretyEvent,
}

fn new_channel() -> broadcast::Sender<LedgerEvent> {
    broadcast::channel(EVENT_CHANNEL_CAPACITY).0
}

/// Append-only event history with live fan-out to subscribers
#[derive(Debug, Serialize, Deserialize)]
pub struct EventLog {
    history: Vec<LedgerEvent>,
    next_sequence: u64,
    #[serde(skip, default = "new_channel")]
    sender: broadcast::Sender<LedgerEvent>,
}

impl Default for EventLog {
    fn default() -> Self {
        EventLog {
            history: Vec::new(),
            next_sequence: 0,
            sender: new_channel(),
        }
    }
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a log from persisted history; numbering resumes after the last event
    pub fn from_history(history: Vec<LedgerEvent>) -> Self {
        let next_sequence = history.last().map_or(0, |e| e.sequence + 1);
        EventLog {
            history,
            next_sequence,
            sender: new_channel(),
        }
    }

    /// Append the events of one committed transition
    pub fn commit(&mut self, block: BlockContext, events: Vec<SuretyEvent>) {
        for event in events {
            let record = LedgerEvent {
                sequence: self.next_sequence,
                height: block.height,
                event,
            };
            self.next_sequence += 1;
            // No receivers is not an error: nobody is listening yet.
            if self.sender.send(record.clone()).is_err() {
                debug!("Event {} committed with no live subscribers", record.sequence);
            }
            self.history.push(record);
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.sender.subscribe()
    }

    pub fn history(&self) -> &[LedgerEvent] {
        &self.history
    }

    /// Events with a sequence number at or after `sequence`
    pub fn since(&self, sequence: u64) -> &[LedgerEvent] {
        let start = self.history.partition_point(|e| e.sequence < sequence);
        &self.history[start..]
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}
