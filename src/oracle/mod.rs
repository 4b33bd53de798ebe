//! Oracle registration, request correlation and quorum resolution of flight status.

pub mod index_source;

pub use index_source::{draw_distinct, ChaChaIndexSource, ChainHashIndexSource, IndexSource};

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::SuretyParameters;
use crate::errors::{SuretyError, SuretyResult};
use crate::insurance::{Credit, FlightKey, FlightStatus};
use crate::ledger::{map_as_pairs, AccountId, Amount, BlockContext};

/// A registered oracle and the indexes it answers for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleAccount {
    pub id: AccountId,
    pub indexes: Vec<u8>,
    pub fee_paid: Amount,
    pub registered_at: u64,
}

impl OracleAccount {
    pub fn holds(&self, index: u8) -> bool {
        self.indexes.contains(&index)
    }
}

/// Correlates oracle responses with the request they answer
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestKey {
    pub index: u8,
    pub flight: FlightKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleRequest {
    pub key: RequestKey,
    pub requester: AccountId,
    pub opened_at: u64,
    /// Distinct reporters per status
    #[serde(with = "map_as_pairs")]
    pub tally: BTreeMap<FlightStatus, BTreeSet<AccountId>>,
    pub finalized: bool,
    pub resolved_status: Option<FlightStatus>,
}

impl OracleRequest {
    pub fn count(&self, status: FlightStatus) -> usize {
        self.tally.get(&status).map_or(0, BTreeSet::len)
    }

    fn has_reported(&self, oracle: &AccountId) -> bool {
        self.tally.values().any(|reporters| reporters.contains(oracle))
    }
}

/// What a response will do once applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseDecision {
    /// Count the report; quorum not yet reached
    Record { count: usize },
    /// Count the report and finalize the request with this status
    Finalize { count: usize },
    /// The request was already finalized; nothing changes
    AlreadyFinalized,
    /// This oracle already reported on the request; nothing changes
    DuplicateResponse,
}

/// A validated but not yet applied oracle response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponsePlan {
    pub oracle: AccountId,
    pub key: RequestKey,
    pub status: FlightStatus,
    pub decision: ResponseDecision,
}

/// What `submit_oracle_response` did, as seen by the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseOutcome {
    Recorded {
        status: FlightStatus,
        count: usize,
        required: usize,
    },
    Finalized {
        status: FlightStatus,
        credited: Vec<Credit>,
    },
    AlreadyFinalized,
    DuplicateResponse,
}

/// Oracle registry and request table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OracleResolver {
    oracles: BTreeMap<AccountId, OracleAccount>,
    #[serde(with = "map_as_pairs")]
    requests: BTreeMap<RequestKey, OracleRequest>,
    fees_collected: Amount,
}

impl OracleResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_oracle(
        &mut self,
        params: &SuretyParameters,
        caller: &AccountId,
        fee: Amount,
        source: &mut dyn IndexSource,
        block: &BlockContext,
    ) -> SuretyResult<Vec<u8>> {
        if self.oracles.contains_key(caller) {
            return Err(SuretyError::OracleAlreadyRegistered(caller.clone()));
        }
        if fee < params.oracle_registration_fee {
            return Err(SuretyError::InsufficientFee {
                paid: fee,
                required: params.oracle_registration_fee,
            });
        }
        let fees_collected = self
            .fees_collected
            .checked_add(fee)
            .ok_or(SuretyError::ArithmeticOverflow)?;

        let indexes = draw_distinct(
            source,
            caller,
            block,
            params.oracle_index_space,
            params.indexes_per_oracle,
        );
        info!("Oracle {} registered with indexes {:?}", caller, indexes);

        self.fees_collected = fees_collected;
        self.oracles.insert(
            caller.clone(),
            OracleAccount {
                id: caller.clone(),
                indexes: indexes.clone(),
                fee_paid: fee,
                registered_at: block.height,
            },
        );
        Ok(indexes)
    }

    pub fn my_indexes(&self, caller: &AccountId) -> SuretyResult<&[u8]> {
        self.oracles
            .get(caller)
            .map(|o| o.indexes.as_slice())
            .ok_or_else(|| SuretyError::NotOracle(caller.clone()))
    }

    /// Open (or reuse) a request for a flight under a freshly drawn index.
    /// The caller has already checked that the flight is awaiting its status.
    pub fn open_request(
        &mut self,
        params: &SuretyParameters,
        requester: &AccountId,
        flight: FlightKey,
        source: &mut dyn IndexSource,
        block: &BlockContext,
    ) -> u8 {
        let space = params.oracle_index_space.max(1);
        let index = source.draw(requester, block, params.oracle_index_space) % space;
        let key = RequestKey { index, flight };
        self.requests.entry(key.clone()).or_insert_with(|| {
            debug!("Opening oracle request {} for {}", key.index, key.flight);
            OracleRequest {
                key: key.clone(),
                requester: requester.clone(),
                opened_at: block.height,
                tally: BTreeMap::new(),
                finalized: false,
                resolved_status: None,
            }
        });
        index
    }

    /// Validate a response and decide its effect without changing any state
    pub fn plan_response(
        &self,
        params: &SuretyParameters,
        oracle: &AccountId,
        index: u8,
        flight: FlightKey,
        status: FlightStatus,
    ) -> SuretyResult<ResponsePlan> {
        if !status.is_terminal() {
            return Err(SuretyError::InvalidStatusCode(status.code()));
        }
        if !self.oracles.get(oracle).is_some_and(|o| o.holds(index)) {
            return Err(SuretyError::IndexNotAssigned {
                oracle: oracle.clone(),
                index,
            });
        }

        let key = RequestKey { index, flight };
        let request = self.requests.get(&key).ok_or_else(|| SuretyError::UnknownRequest {
            index,
            flight: key.flight.to_string(),
        })?;

        let decision = if request.finalized {
            ResponseDecision::AlreadyFinalized
        } else if request.has_reported(oracle) {
            ResponseDecision::DuplicateResponse
        } else {
            let count = request.count(status) + 1;
            if count >= params.oracle_quorum {
                ResponseDecision::Finalize { count }
            } else {
                ResponseDecision::Record { count }
            }
        };

        Ok(ResponsePlan {
            oracle: oracle.clone(),
            key,
            status,
            decision,
        })
    }

    /// Apply a plan produced by `plan_response` in the same transition.
    ///
    /// Finalizing a request also closes every other open request for the same flight, so
    /// a flight resolves exactly once whichever index reaches quorum first.
    pub fn apply_response(&mut self, plan: &ResponsePlan) {
        let finalize = match plan.decision {
            ResponseDecision::Record { .. } => false,
            ResponseDecision::Finalize { .. } => true,
            ResponseDecision::AlreadyFinalized | ResponseDecision::DuplicateResponse => return,
        };

        if let Some(request) = self.requests.get_mut(&plan.key) {
            request
                .tally
                .entry(plan.status)
                .or_default()
                .insert(plan.oracle.clone());
        }
        if !finalize {
            return;
        }

        for request in self
            .requests
            .values_mut()
            .filter(|r| r.key.flight == plan.key.flight && !r.finalized)
        {
            request.finalized = true;
            if request.key == plan.key {
                request.resolved_status = Some(plan.status);
            }
        }
        info!(
            "Oracle request {} for {} finalized as {}",
            plan.key.index, plan.key.flight, plan.status
        );
    }

    pub fn request(&self, key: &RequestKey) -> Option<&OracleRequest> {
        self.requests.get(key)
    }

    /// Requests still waiting for a quorum
    pub fn open_requests(&self) -> impl Iterator<Item = &OracleRequest> {
        self.requests.values().filter(|r| !r.finalized)
    }

    pub fn oracle(&self, id: &AccountId) -> Option<&OracleAccount> {
        self.oracles.get(id)
    }

    pub fn oracles(&self) -> impl Iterator<Item = &OracleAccount> {
        self.oracles.values()
    }

    /// Oracles that answer for `index`
    pub fn holders_of(&self, index: u8) -> Vec<&AccountId> {
        self.oracles
            .values()
            .filter(|o| o.holds(index))
            .map(|o| &o.id)
            .collect()
    }

    pub fn fees_collected(&self) -> Amount {
        self.fees_collected
    }
}
