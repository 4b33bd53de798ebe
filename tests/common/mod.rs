#![allow(dead_code)]

use flightsure_core::insurance::FlightKey;
use flightsure_core::ledger::BlockContext;
use flightsure_core::{
    AccountId, Amount, ChaChaIndexSource, FlightSurety, IndexSource, ResponseOutcome,
    SuretyParameters, SuretyResult, Transition,
};

/// Fetch attempts before a helper gives up on finding an index with a quorum of holders
pub const MAX_FETCH_ATTEMPTS: usize = 50;

/// Scheduled departure used by the scenarios
pub const DEPARTURE: u64 = 1_700_000_000;

pub fn units(n: u64) -> Amount {
    Amount::from_units(n)
}

pub fn amount(s: &str) -> Amount {
    s.parse().unwrap()
}

pub fn tx(caller: &str) -> Transition {
    Transition::new(caller)
}

pub fn paying(caller: &str, value: Amount) -> Transition {
    Transition::new(caller).with_value(value)
}

pub fn id(name: &str) -> AccountId {
    AccountId::new(name)
}

/// Always draws the same index, so every oracle holds `{i, i+1, i+2}` and every request
/// lands on `i`
pub struct FixedIndexSource(pub u8);

impl IndexSource for FixedIndexSource {
    fn draw(&mut self, _caller: &AccountId, _block: &BlockContext, _index_space: u8) -> u8 {
        self.0
    }
}

/// Ledger with `airline-1` as founder and a seeded index source
pub fn deploy() -> FlightSurety {
    deploy_with(Box::new(ChaChaIndexSource::from_seed(2024)))
}

pub fn deploy_with(source: Box<dyn IndexSource>) -> FlightSurety {
    FlightSurety::deploy(id("owner"), id("airline-1"), SuretyParameters::default(), source)
        .unwrap()
}

/// Register airlines `airline-2..=airline-n` during bootstrap and fund all of them
pub fn bootstrap_committee(surety: &FlightSurety, n: usize) {
    for i in 2..=n {
        surety
            .register_airline(&tx("airline-1"), id(&format!("airline-{}", i)))
            .unwrap();
    }
    for i in 1..=n {
        surety
            .fund(&paying(&format!("airline-{}", i), units(10)))
            .unwrap();
    }
}

/// Fund `airline-1` and register one open flight for it
pub fn funded_flight(surety: &FlightSurety) -> FlightKey {
    surety.fund(&paying("airline-1", units(10))).unwrap();
    surety
        .register_flight(&tx("airline-1"), "ND1309", DEPARTURE)
        .unwrap()
}

/// Buy `value` of cover on the flight for `passenger`
pub fn insure(
    surety: &FlightSurety,
    passenger: &str,
    key: &FlightKey,
    value: Amount,
) -> SuretyResult<Amount> {
    surety.buy(&paying(passenger, value), &key.airline, &key.designator, key.timestamp)
}

pub fn register_oracles(surety: &FlightSurety, count: usize) -> Vec<AccountId> {
    (1..=count)
        .map(|n| {
            let name = format!("oracle-{}", n);
            surety.register_oracle(&paying(&name, units(1))).unwrap();
            id(&name)
        })
        .collect()
}

/// Request the flight's status until an index with enough holders comes up, then have every
/// holder report `status_code`. Returns the finalizing outcome.
pub fn resolve_flight(surety: &FlightSurety, key: &FlightKey, status_code: u8) -> ResponseOutcome {
    let quorum = surety.parameters().oracle_quorum;
    for _ in 0..MAX_FETCH_ATTEMPTS {
        let index = surety
            .fetch_flight_status(&tx("requester"), &key.airline, &key.designator, key.timestamp)
            .unwrap();
        let holders = surety.oracle_holders(index);
        if holders.len() < quorum {
            continue;
        }
        for oracle in holders {
            let outcome = surety
                .submit_oracle_response(
                    &Transition::new(oracle),
                    index,
                    &key.airline,
                    &key.designator,
                    key.timestamp,
                    status_code,
                )
                .unwrap();
            if let ResponseOutcome::Finalized { .. } = outcome {
                return outcome;
            }
        }
    }
    panic!("no index reached quorum after {} attempts", MAX_FETCH_ATTEMPTS);
}

/// Have `oracle` report on `index` for the flight
pub fn report(
    surety: &FlightSurety,
    oracle: &str,
    index: u8,
    key: &FlightKey,
    status_code: u8,
) -> SuretyResult<ResponseOutcome> {
    surety.submit_oracle_response(
        &tx(oracle),
        index,
        &key.airline,
        &key.designator,
        key.timestamp,
        status_code,
    )
}
