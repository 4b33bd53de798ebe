//! The surety ledger: membership, the insurance book and the oracle resolver behind one lock.
//!
//! Every mutating operation takes a [`Transition`] naming the caller and the value attached.
//! A transition either commits completely, advancing the block and appending its events, or
//! fails and leaves the ledger exactly as it was.

use log::{debug, info};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::config::{SuretyConfig, SuretyParameters};
use crate::errors::{SuretyError, SuretyResult};
use crate::governance::{
    Airline, Membership, QueueEntry, RegistrationOutcome, RegistrationRequest, VoteOutcome,
};
use crate::insurance::{Flight, FlightKey, FlightStatus, InsuranceBook};
use crate::ledger::{
    AccountId, Amount, BlockContext, EventLog, LedgerEvent, SuretyEvent, Transition,
};
use crate::oracle::{
    ChaChaIndexSource, ChainHashIndexSource, IndexSource, OracleAccount, OracleRequest,
    OracleResolver, ResponseDecision, ResponseOutcome,
};
use crate::utils::current_time;

/// Format version written into snapshots
pub const SNAPSHOT_VERSION: u32 = 1;

/// Pick the index source a configuration asks for
pub fn index_source_for(config: &SuretyConfig) -> Box<dyn IndexSource> {
    match config.index_seed {
        Some(seed) => Box::new(ChaChaIndexSource::from_seed(seed)),
        None => Box::new(ChainHashIndexSource::new()),
    }
}

/// Complete persisted state of a ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuretySnapshot {
    pub version: u32,
    pub saved_at: u64,
    pub parameters: SuretyParameters,
    pub owner: AccountId,
    pub operational: bool,
    pub block: BlockContext,
    pub membership: Membership,
    pub book: InsuranceBook,
    pub resolver: OracleResolver,
    pub events: Vec<LedgerEvent>,
}

struct SuretyState {
    owner: AccountId,
    operational: bool,
    block: BlockContext,
    membership: Membership,
    book: InsuranceBook,
    resolver: OracleResolver,
    events: EventLog,
    index_source: Box<dyn IndexSource>,
}

impl SuretyState {
    fn ensure_operational(&self) -> SuretyResult<()> {
        if self.operational {
            Ok(())
        } else {
            Err(SuretyError::NotOperational)
        }
    }

    /// Context the current transition executes in
    fn pending_block(&self) -> BlockContext {
        self.block.next(current_time())
    }

    fn commit(&mut self, block: BlockContext, events: Vec<SuretyEvent>) {
        self.block = block;
        self.events.commit(block, events);
    }
}

pub struct FlightSurety {
    parameters: SuretyParameters,
    state: Mutex<SuretyState>,
}

impl FlightSurety {
    /// Deploy a fresh ledger owned by `owner`, with `first_airline` registered directly
    pub fn deploy(
        owner: AccountId,
        first_airline: AccountId,
        parameters: SuretyParameters,
        index_source: Box<dyn IndexSource>,
    ) -> SuretyResult<Self> {
        let mut membership = Membership::new();
        let committee = membership.register_founder(first_airline.clone())?;

        let mut state = SuretyState {
            owner: owner.clone(),
            operational: true,
            block: BlockContext::default(),
            membership,
            book: InsuranceBook::new(),
            resolver: OracleResolver::new(),
            events: EventLog::new(),
            index_source,
        };
        let block = state.pending_block();
        state.commit(
            block,
            vec![SuretyEvent::AirlineRegistered {
                airline: first_airline.clone(),
                committee,
            }],
        );
        info!(
            "Surety ledger deployed by {} with founding airline {}",
            owner, first_airline
        );

        Ok(FlightSurety {
            parameters,
            state: Mutex::new(state),
        })
    }

    /// Deploy using the parameters and index source named by `config`
    pub fn from_config(
        owner: AccountId,
        first_airline: AccountId,
        config: &SuretyConfig,
    ) -> SuretyResult<Self> {
        Self::deploy(
            owner,
            first_airline,
            config.parameters.clone(),
            index_source_for(config),
        )
    }

    /// Rebuild a ledger from a snapshot. Parameters travel with the snapshot.
    pub fn restore(snapshot: SuretySnapshot, index_source: Box<dyn IndexSource>) -> Self {
        debug!(
            "Restoring ledger at height {} with {} events",
            snapshot.block.height,
            snapshot.events.len()
        );
        FlightSurety {
            parameters: snapshot.parameters,
            state: Mutex::new(SuretyState {
                owner: snapshot.owner,
                operational: snapshot.operational,
                block: snapshot.block,
                membership: snapshot.membership,
                book: snapshot.book,
                resolver: snapshot.resolver,
                events: EventLog::from_history(snapshot.events),
                index_source,
            }),
        }
    }

    pub fn snapshot(&self) -> SuretySnapshot {
        let state = self.state.lock();
        SuretySnapshot {
            version: SNAPSHOT_VERSION,
            saved_at: current_time(),
            parameters: self.parameters.clone(),
            owner: state.owner.clone(),
            operational: state.operational,
            block: state.block,
            membership: state.membership.clone(),
            book: state.book.clone(),
            resolver: state.resolver.clone(),
            events: state.events.history().to_vec(),
        }
    }

    pub fn parameters(&self) -> &SuretyParameters {
        &self.parameters
    }

    // Operating status

    pub fn set_operating_status(&self, tx: &Transition, operational: bool) -> SuretyResult<()> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        if tx.caller != state.owner {
            return Err(SuretyError::NotOwner(tx.caller.clone()));
        }
        let block = state.pending_block();
        if state.operational == operational {
            state.commit(block, Vec::new());
            return Ok(());
        }
        state.operational = operational;
        info!("Operating status set to {} by {}", operational, tx.caller);
        state.commit(block, vec![SuretyEvent::OperatingStatusChanged { operational }]);
        Ok(())
    }

    pub fn is_operational(&self) -> bool {
        self.state.lock().operational
    }

    pub fn owner(&self) -> AccountId {
        self.state.lock().owner.clone()
    }

    // Membership and governance

    pub fn register_airline(
        &self,
        tx: &Transition,
        candidate: AccountId,
    ) -> SuretyResult<RegistrationOutcome> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        state.ensure_operational()?;
        let block = state.pending_block();

        let outcome = state
            .membership
            .register_airline(&self.parameters, &tx.caller, candidate.clone())?;
        let events = match &outcome {
            RegistrationOutcome::Registered { committee } => vec![SuretyEvent::AirlineRegistered {
                airline: candidate,
                committee: *committee,
            }],
            RegistrationOutcome::Queued {
                request_id,
                committee_at_request,
            } => vec![SuretyEvent::RegistrationQueued {
                request_id: *request_id,
                candidate,
                committee_at_request: *committee_at_request,
            }],
            RegistrationOutcome::Ignored => Vec::new(),
        };
        state.commit(block, events);
        Ok(outcome)
    }

    pub fn approve_registration(
        &self,
        tx: &Transition,
        request_id: u64,
    ) -> SuretyResult<VoteOutcome> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        state.ensure_operational()?;
        let block = state.pending_block();

        let outcome = state
            .membership
            .approve_registration(&self.parameters, &tx.caller, request_id)?;
        let events = match &outcome {
            VoteOutcome::Recorded { votes, .. } => vec![SuretyEvent::RegistrationVote {
                request_id,
                voter: tx.caller.clone(),
                votes: *votes,
            }],
            VoteOutcome::Approved {
                candidate,
                votes,
                committee,
            } => vec![
                SuretyEvent::RegistrationVote {
                    request_id,
                    voter: tx.caller.clone(),
                    votes: *votes,
                },
                SuretyEvent::AirlineRegistered {
                    airline: candidate.clone(),
                    committee: *committee,
                },
            ],
            VoteOutcome::DuplicateVote { .. } | VoteOutcome::AlreadyApproved => Vec::new(),
        };
        state.commit(block, events);
        Ok(outcome)
    }

    /// Contribute the attached value to the caller's membership funding and the pool.
    /// Returns the caller's cumulative funding.
    pub fn fund(&self, tx: &Transition) -> SuretyResult<Amount> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        state.ensure_operational()?;
        if tx.value.is_zero() {
            return Err(SuretyError::InvalidAmount);
        }
        let block = state.pending_block();

        // Any one airline's funding is bounded by the pool's total deposits, so once the pool
        // accepts the value the membership total cannot overflow.
        state.book.deposit(tx.value)?;
        let total = state.membership.fund(&tx.caller, tx.value)?;
        state.commit(
            block,
            vec![SuretyEvent::AirlineFunded {
                airline: tx.caller.clone(),
                amount: tx.value,
                total,
            }],
        );
        Ok(total)
    }

    pub fn is_airline_registered(&self, airline: &AccountId) -> bool {
        self.state.lock().membership.is_registered(airline)
    }

    pub fn airline(&self, airline: &AccountId) -> Option<Airline> {
        self.state.lock().membership.airline(airline).cloned()
    }

    pub fn registration_queue(&self) -> Vec<QueueEntry> {
        self.state.lock().membership.registration_queue()
    }

    pub fn registration_request(&self, request_id: u64) -> Option<RegistrationRequest> {
        self.state.lock().membership.request(request_id).cloned()
    }

    pub fn committee(&self) -> usize {
        self.state.lock().membership.committee()
    }

    pub fn vote_count(&self, candidate: &AccountId) -> usize {
        self.state.lock().membership.vote_count(candidate)
    }

    pub fn membership_fee(&self, airline: &AccountId) -> Amount {
        self.state.lock().membership.membership_fee(airline)
    }

    pub fn total_fund(&self) -> Amount {
        self.state.lock().book.total_fund()
    }

    // Flights and insurance

    /// Register a flight operated by the caller; attached value goes to the pool
    pub fn register_flight(
        &self,
        tx: &Transition,
        designator: &str,
        timestamp: u64,
    ) -> SuretyResult<FlightKey> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        state.ensure_operational()?;
        state
            .membership
            .ensure_funded_member(&self.parameters, &tx.caller)?;
        let block = state.pending_block();

        let key = FlightKey::new(tx.caller.clone(), designator, timestamp);
        state.book.register_flight(key.clone(), tx.value)?;
        state.commit(
            block,
            vec![SuretyEvent::FlightRegistered {
                flight: key.clone(),
            }],
        );
        Ok(key)
    }

    /// Buy cover on a flight with the attached value. Returns the caller's cumulative order.
    pub fn buy(
        &self,
        tx: &Transition,
        airline: &AccountId,
        designator: &str,
        timestamp: u64,
    ) -> SuretyResult<Amount> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        state.ensure_operational()?;
        let block = state.pending_block();

        let key = FlightKey::new(airline.clone(), designator, timestamp);
        let total = state
            .book
            .buy(&self.parameters, &tx.caller, &key, tx.value)?;
        state.commit(
            block,
            vec![SuretyEvent::InsurancePurchased {
                flight: key,
                passenger: tx.caller.clone(),
                amount: tx.value,
            }],
        );
        Ok(total)
    }

    /// Withdraw the caller's whole credit. Returns the amount disbursed.
    pub fn pay(&self, tx: &Transition) -> SuretyResult<Amount> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        state.ensure_operational()?;
        let block = state.pending_block();

        let amount = state.book.pay(&tx.caller)?;
        state.book.log_state();
        state.commit(
            block,
            vec![SuretyEvent::PassengerPaid {
                passenger: tx.caller.clone(),
                amount,
            }],
        );
        Ok(amount)
    }

    pub fn flight(&self, key: &FlightKey) -> Option<Flight> {
        self.state.lock().book.flight(key).cloned()
    }

    /// Flights in registration order
    pub fn flight_list(&self) -> Vec<Flight> {
        self.state
            .lock()
            .book
            .flight_list()
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn order(&self, passenger: &AccountId, key: &FlightKey) -> Amount {
        self.state.lock().book.order(passenger, key)
    }

    pub fn flight_status_code(&self, key: &FlightKey) -> SuretyResult<FlightStatus> {
        self.state.lock().book.flight_status_code(key)
    }

    /// Credit currently owed to `passenger`
    pub fn refund(&self, passenger: &AccountId) -> Amount {
        self.state.lock().book.refund(passenger)
    }

    /// Credit owed to all passengers together
    pub fn outstanding_credit(&self) -> SuretyResult<Amount> {
        self.state.lock().book.outstanding_credit()
    }

    // Oracles

    /// Register the caller as an oracle, paying the attached value as fee.
    /// Returns the indexes the oracle answers for.
    pub fn register_oracle(&self, tx: &Transition) -> SuretyResult<Vec<u8>> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        state.ensure_operational()?;
        let block = state.pending_block();

        let indexes = state.resolver.register_oracle(
            &self.parameters,
            &tx.caller,
            tx.value,
            state.index_source.as_mut(),
            &block,
        )?;
        state.commit(
            block,
            vec![SuretyEvent::OracleRegistered {
                oracle: tx.caller.clone(),
                indexes: indexes.clone(),
            }],
        );
        Ok(indexes)
    }

    pub fn my_indexes(&self, tx: &Transition) -> SuretyResult<Vec<u8>> {
        self.state
            .lock()
            .resolver
            .my_indexes(&tx.caller)
            .map(<[u8]>::to_vec)
    }

    /// Ask the oracles for a flight's status. Returns the index oracles must answer on.
    pub fn fetch_flight_status(
        &self,
        tx: &Transition,
        airline: &AccountId,
        designator: &str,
        timestamp: u64,
    ) -> SuretyResult<u8> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        state.ensure_operational()?;

        let key = FlightKey::new(airline.clone(), designator, timestamp);
        match state.book.open_flight(&key) {
            Ok(_) => {}
            Err(SuretyError::NotOpenForPurchase(flight)) => {
                return Err(SuretyError::FlightAlreadyFinalized(flight));
            }
            Err(err) => return Err(err),
        }
        let block = state.pending_block();

        let index = state.resolver.open_request(
            &self.parameters,
            &tx.caller,
            key,
            state.index_source.as_mut(),
            &block,
        );
        debug!("Status of {}/{} requested on index {}", airline, designator, index);
        state.commit(
            block,
            vec![SuretyEvent::OracleRequest {
                index,
                airline: airline.clone(),
                designator: designator.to_string(),
                timestamp,
            }],
        );
        Ok(index)
    }

    /// Record an oracle's report. The report that brings one status to quorum finalizes the
    /// flight and credits its insured passengers in the same transition.
    pub fn submit_oracle_response(
        &self,
        tx: &Transition,
        index: u8,
        airline: &AccountId,
        designator: &str,
        timestamp: u64,
        status_code: u8,
    ) -> SuretyResult<ResponseOutcome> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        state.ensure_operational()?;

        let status = FlightStatus::try_from(status_code)?;
        let key = FlightKey::new(airline.clone(), designator, timestamp);
        let plan = state
            .resolver
            .plan_response(&self.parameters, &tx.caller, index, key.clone(), status)?;
        let block = state.pending_block();

        let report = SuretyEvent::OracleReport {
            index,
            airline: airline.clone(),
            designator: designator.to_string(),
            timestamp,
            status,
        };
        let (outcome, events) = match plan.decision {
            ResponseDecision::AlreadyFinalized => {
                debug!("Late report from {} on {} ignored", tx.caller, key);
                (ResponseOutcome::AlreadyFinalized, Vec::new())
            }
            ResponseDecision::DuplicateResponse => {
                debug!("Repeat report from {} on {} ignored", tx.caller, key);
                (ResponseOutcome::DuplicateResponse, Vec::new())
            }
            ResponseDecision::Record { count } => {
                state.resolver.apply_response(&plan);
                debug!("{} has {} report(s) for {}", key, count, status);
                (
                    ResponseOutcome::Recorded {
                        status,
                        count,
                        required: self.parameters.oracle_quorum,
                    },
                    vec![report],
                )
            }
            ResponseDecision::Finalize { .. } => {
                // Settle first: it is the only fallible step left.
                let credited = state.book.settle_flight(&self.parameters, &key, status)?;
                state.resolver.apply_response(&plan);
                state.book.log_state();

                let mut events = vec![
                    report,
                    SuretyEvent::FlightStatusInfo {
                        index,
                        airline: airline.clone(),
                        designator: designator.to_string(),
                        timestamp,
                        status,
                    },
                ];
                events.extend(credited.iter().map(|credit| SuretyEvent::PassengerCredited {
                    passenger: credit.passenger.clone(),
                    flight: key.clone(),
                    amount: credit.amount,
                }));
                (ResponseOutcome::Finalized { status, credited }, events)
            }
        };
        state.commit(block, events);
        Ok(outcome)
    }

    pub fn oracle(&self, oracle: &AccountId) -> Option<OracleAccount> {
        self.state.lock().resolver.oracle(oracle).cloned()
    }

    pub fn oracles(&self) -> Vec<OracleAccount> {
        self.state.lock().resolver.oracles().cloned().collect()
    }

    /// Oracles answering for `index`
    pub fn oracle_holders(&self, index: u8) -> Vec<AccountId> {
        self.state
            .lock()
            .resolver
            .holders_of(index)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn open_requests(&self) -> Vec<OracleRequest> {
        self.state.lock().resolver.open_requests().cloned().collect()
    }

    /// Registration fees paid by oracles; kept apart from the fund pool
    pub fn oracle_fees(&self) -> Amount {
        self.state.lock().resolver.fees_collected()
    }

    // Events

    /// Live feed of events committed after this call
    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.state.lock().events.subscribe()
    }

    pub fn history(&self) -> Vec<LedgerEvent> {
        self.state.lock().events.history().to_vec()
    }

    pub fn events_since(&self, sequence: u64) -> Vec<LedgerEvent> {
        self.state.lock().events.since(sequence).to_vec()
    }

    pub fn block(&self) -> BlockContext {
        self.state.lock().block
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deploy() -> FlightSurety {
        FlightSurety::deploy(
            AccountId::new("owner"),
            AccountId::new("airline-1"),
            SuretyParameters::default(),
            Box::new(ChaChaIndexSource::from_seed(7)),
        )
        .unwrap()
    }

    fn tx(caller: &str) -> Transition {
        Transition::new(caller)
    }

    fn units(n: u64) -> Amount {
        Amount::from_units(n)
    }

    #[test]
    fn test_deploy_registers_founder() {
        let surety = deploy();
        assert!(surety.is_airline_registered(&AccountId::new("airline-1")));
        assert_eq!(surety.committee(), 1);
        assert!(surety.is_operational());
        assert_eq!(surety.block().height, 1);
        assert!(matches!(
            surety.history()[0].event,
            SuretyEvent::AirlineRegistered { committee: 1, .. }
        ));
    }

    #[test]
    fn test_only_owner_can_pause() {
        let surety = deploy();
        assert_eq!(
            surety.set_operating_status(&tx("airline-1"), false),
            Err(SuretyError::NotOwner(AccountId::new("airline-1")))
        );
        surety.set_operating_status(&tx("owner"), false).unwrap();
        assert!(!surety.is_operational());
    }

    #[test]
    fn test_paused_ledger_rejects_mutations_but_answers_queries() {
        let surety = deploy();
        surety.set_operating_status(&tx("owner"), false).unwrap();

        assert_eq!(
            surety.fund(&tx("airline-1").with_value(units(10))),
            Err(SuretyError::NotOperational)
        );
        assert_eq!(
            surety.register_airline(&tx("airline-1"), AccountId::new("airline-2")),
            Err(SuretyError::NotOperational)
        );
        assert_eq!(surety.pay(&tx("passenger")), Err(SuretyError::NotOperational));
        assert_eq!(surety.total_fund(), Amount::ZERO);
        assert_eq!(surety.committee(), 1);

        surety.set_operating_status(&tx("owner"), true).unwrap();
        assert_eq!(surety.fund(&tx("airline-1").with_value(units(10))), Ok(units(10)));
    }

    #[test]
    fn test_fund_credits_airline_and_pool() {
        let surety = deploy();
        assert_eq!(surety.fund(&tx("airline-1").with_value(units(4))), Ok(units(4)));
        assert_eq!(surety.fund(&tx("airline-1").with_value(units(6))), Ok(units(10)));
        assert_eq!(surety.membership_fee(&AccountId::new("airline-1")), units(10));
        assert_eq!(surety.total_fund(), units(10));

        assert_eq!(surety.fund(&tx("airline-1")), Err(SuretyError::InvalidAmount));
    }

    #[test]
    fn test_unregistered_funder_gets_a_record() {
        let surety = deploy();
        surety.fund(&tx("newcomer").with_value(units(10))).unwrap();
        let record = surety.airline(&AccountId::new("newcomer")).unwrap();
        assert!(!record.is_registered());
        assert_eq!(record.funded_amount, units(10));
    }

    #[test]
    fn test_failed_transition_leaves_no_trace() {
        let surety = deploy();
        let height = surety.block().height;
        let events = surety.history().len();

        assert!(surety.register_flight(&tx("airline-1"), "FLIGHT01", 1).is_err());
        assert!(surety.pay(&tx("passenger")).is_err());

        assert_eq!(surety.block().height, height);
        assert_eq!(surety.history().len(), events);
    }

    #[test]
    fn test_flight_registration_requires_funded_member() {
        let surety = deploy();
        assert_eq!(
            surety.register_flight(&tx("stranger"), "FLIGHT01", 1),
            Err(SuretyError::NotAirline(AccountId::new("stranger")))
        );
        assert!(matches!(
            surety.register_flight(&tx("airline-1"), "FLIGHT01", 1),
            Err(SuretyError::NotFunded { .. })
        ));

        surety.fund(&tx("airline-1").with_value(units(10))).unwrap();
        let key = surety.register_flight(&tx("airline-1"), "FLIGHT01", 1).unwrap();
        assert_eq!(surety.flight_status_code(&key), Ok(FlightStatus::OpenForPurchase));
        assert_eq!(
            surety.register_flight(&tx("airline-1"), "FLIGHT01", 1),
            Err(SuretyError::DuplicateFlight(key.to_string()))
        );
    }

    #[test]
    fn test_fetch_status_checks_flight_state() {
        let surety = deploy();
        let airline = AccountId::new("airline-1");
        assert!(matches!(
            surety.fetch_flight_status(&tx("anyone"), &airline, "NOPE", 1),
            Err(SuretyError::UnknownFlight(_))
        ));

        surety.fund(&tx("airline-1").with_value(units(10))).unwrap();
        surety.register_flight(&tx("airline-1"), "FLIGHT01", 1).unwrap();
        let mut events = surety.subscribe();
        let index = surety
            .fetch_flight_status(&tx("anyone"), &airline, "FLIGHT01", 1)
            .unwrap();
        assert!(index < 10);

        let event = events.try_recv().unwrap();
        assert_eq!(
            event.event,
            SuretyEvent::OracleRequest {
                index,
                airline,
                designator: "FLIGHT01".to_string(),
                timestamp: 1,
            }
        );
        assert_eq!(surety.open_requests().len(), 1);
    }

    #[test]
    fn test_oracle_fees_stay_out_of_pool() {
        let surety = deploy();
        let indexes = surety.register_oracle(&tx("oracle-1").with_value(units(1))).unwrap();
        assert_eq!(indexes.len(), 3);
        assert_eq!(surety.my_indexes(&tx("oracle-1")), Ok(indexes));
        assert_eq!(surety.oracle_fees(), units(1));
        assert_eq!(surety.total_fund(), Amount::ZERO);
        assert_eq!(
            surety.my_indexes(&tx("oracle-2")),
            Err(SuretyError::NotOracle(AccountId::new("oracle-2")))
        );
    }

    #[test]
    fn test_unknown_status_code_is_rejected() {
        let surety = deploy();
        surety.register_oracle(&tx("oracle-1").with_value(units(1))).unwrap();
        let airline = AccountId::new("airline-1");
        assert_eq!(
            surety.submit_oracle_response(&tx("oracle-1"), 0, &airline, "F", 1, 7),
            Err(SuretyError::InvalidStatusCode(7))
        );
    }

    #[test]
    fn test_snapshot_restores_state() {
        let surety = deploy();
        surety.fund(&tx("airline-1").with_value(units(10))).unwrap();
        surety.register_airline(&tx("airline-1"), AccountId::new("airline-2")).unwrap();

        let snapshot = surety.snapshot();
        let restored = FlightSurety::restore(snapshot, Box::new(ChaChaIndexSource::from_seed(1)));
        assert_eq!(restored.committee(), 2);
        assert_eq!(restored.total_fund(), units(10));
        assert_eq!(restored.history(), surety.history());
        assert_eq!(restored.block(), surety.block());
        assert_eq!(restored.owner(), AccountId::new("owner"));
    }
}
