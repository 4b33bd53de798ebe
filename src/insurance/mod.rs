//! Flight registry, insurance orders, passenger credit and the shared fund pool.

pub mod fund_pool;

pub use fund_pool::FundPool;

use std::collections::BTreeMap;
use std::fmt;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::SuretyParameters;
use crate::errors::{SuretyError, SuretyResult};
use crate::ledger::{map_as_pairs, AccountId, Amount};

/// Flight status codes as reported by oracles
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum FlightStatus {
    Unknown = 0,
    OnTime = 10,
    LateAirline = 20,
    LateWeather = 30,
    LateTechnical = 40,
    LateOther = 50,
    OpenForPurchase = 255,
}

impl FlightStatus {
    /// Every status an oracle may report
    pub const TERMINAL: [FlightStatus; 6] = [
        FlightStatus::Unknown,
        FlightStatus::OnTime,
        FlightStatus::LateAirline,
        FlightStatus::LateWeather,
        FlightStatus::LateTechnical,
        FlightStatus::LateOther,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn is_terminal(self) -> bool {
        self != FlightStatus::OpenForPurchase
    }

    /// Terminal statuses that compensate insured passengers
    pub fn is_qualifying(self) -> bool {
        self.is_terminal() && !matches!(self, FlightStatus::OnTime | FlightStatus::Unknown)
    }
}

impl TryFrom<u8> for FlightStatus {
    type Error = SuretyError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(FlightStatus::Unknown),
            10 => Ok(FlightStatus::OnTime),
            20 => Ok(FlightStatus::LateAirline),
            30 => Ok(FlightStatus::LateWeather),
            40 => Ok(FlightStatus::LateTechnical),
            50 => Ok(FlightStatus::LateOther),
            255 => Ok(FlightStatus::OpenForPurchase),
            other => Err(SuretyError::InvalidStatusCode(other)),
        }
    }
}

impl fmt::Display for FlightStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FlightStatus::Unknown => "Unknown",
            FlightStatus::OnTime => "On time",
            FlightStatus::LateAirline => "Late (airline)",
            FlightStatus::LateWeather => "Late (weather)",
            FlightStatus::LateTechnical => "Late (technical)",
            FlightStatus::LateOther => "Late (other)",
            FlightStatus::OpenForPurchase => "Open for purchase",
        };
        write!(f, "{} [{}]", name, self.code())
    }
}

/// Identity of a flight: the operating airline, its designator and scheduled departure
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FlightKey {
    pub airline: AccountId,
    pub designator: String,
    pub timestamp: u64,
}

impl FlightKey {
    pub fn new(
        airline: impl Into<AccountId>,
        designator: impl Into<String>,
        timestamp: u64,
    ) -> Self {
        FlightKey {
            airline: airline.into(),
            designator: designator.into(),
            timestamp,
        }
    }
}

impl fmt::Display for FlightKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}@{}", self.airline, self.designator, self.timestamp)
    }
}

/// A passenger's cumulative cover on one flight
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsuranceOrder {
    pub amount: Amount,
    /// Set once the flight's final status has been applied to this order
    pub settled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flight {
    pub key: FlightKey,
    pub is_registered: bool,
    pub status: FlightStatus,
    pub orders: BTreeMap<AccountId, InsuranceOrder>,
}

impl Flight {
    pub fn is_open(&self) -> bool {
        self.status == FlightStatus::OpenForPurchase
    }

    /// Total cover sold on this flight
    pub fn insured_total(&self) -> SuretyResult<Amount> {
        sum_amounts(self.orders.values().map(|o| o.amount))
    }
}

fn sum_amounts(mut amounts: impl Iterator<Item = Amount>) -> SuretyResult<Amount> {
    amounts
        .try_fold(Amount::ZERO, Amount::checked_add)
        .ok_or(SuretyError::ArithmeticOverflow)
}

/// Credit granted to one passenger by a settlement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credit {
    pub passenger: AccountId,
    pub amount: Amount,
}

/// Flight and insurance ledger state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InsuranceBook {
    #[serde(with = "map_as_pairs")]
    flights: BTreeMap<FlightKey, Flight>,
    /// Registration order, for listing
    flight_order: Vec<FlightKey>,
    credits: BTreeMap<AccountId, Amount>,
    pool: FundPool,
}

impl InsuranceBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a flight. Membership checks are the caller's responsibility.
    pub fn register_flight(&mut self, key: FlightKey, value: Amount) -> SuretyResult<()> {
        if key.designator.trim().is_empty() {
            return Err(SuretyError::InvalidDesignator);
        }
        if self.flights.contains_key(&key) {
            return Err(SuretyError::DuplicateFlight(key.to_string()));
        }

        self.pool.deposit(value)?;
        info!("Flight {} registered and open for purchase", key);
        self.flight_order.push(key.clone());
        self.flights.insert(
            key.clone(),
            Flight {
                key,
                is_registered: true,
                status: FlightStatus::OpenForPurchase,
                orders: BTreeMap::new(),
            },
        );
        Ok(())
    }

    /// Buy cover on an open flight. Returns the passenger's cumulative order.
    pub fn buy(
        &mut self,
        params: &SuretyParameters,
        passenger: &AccountId,
        key: &FlightKey,
        value: Amount,
    ) -> SuretyResult<Amount> {
        let flight = self.open_flight(key)?;
        if value.is_zero() {
            return Err(SuretyError::InvalidAmount);
        }

        let existing = flight
            .orders
            .get(passenger)
            .map(|o| o.amount)
            .unwrap_or_default();
        let total = existing
            .checked_add(value)
            .filter(|total| *total <= params.purchase_cap)
            .ok_or(SuretyError::OverCap {
                existing,
                requested: value,
                cap: params.purchase_cap,
            })?;

        self.pool.deposit(value)?;
        if let Some(flight) = self.flights.get_mut(key) {
            flight.orders.entry(passenger.clone()).or_default().amount = total;
        }
        info!("Passenger {} insured {} on {} (total {})", passenger, value, key, total);
        Ok(total)
    }

    /// Fail unless the flight exists and still awaits its final status
    pub fn open_flight(&self, key: &FlightKey) -> SuretyResult<&Flight> {
        let flight = self
            .flights
            .get(key)
            .ok_or_else(|| SuretyError::UnknownFlight(key.to_string()))?;
        if !flight.is_open() {
            return Err(SuretyError::NotOpenForPurchase(key.to_string()));
        }
        Ok(flight)
    }

    /// Apply a flight's final status and credit insured passengers.
    ///
    /// Every order is settled exactly once; only qualifying statuses produce credit.
    pub fn settle_flight(
        &mut self,
        params: &SuretyParameters,
        key: &FlightKey,
        status: FlightStatus,
    ) -> SuretyResult<Vec<Credit>> {
        if !status.is_terminal() {
            return Err(SuretyError::InvalidStatusCode(status.code()));
        }
        let flight = self
            .flights
            .get(key)
            .ok_or_else(|| SuretyError::UnknownFlight(key.to_string()))?;
        if !flight.is_open() {
            return Err(SuretyError::FlightAlreadyFinalized(key.to_string()));
        }

        // Work out every credit before touching state so overflow cannot leave a
        // half-settled flight.
        let mut credits = Vec::new();
        let mut new_balances = BTreeMap::new();
        if status.is_qualifying() {
            let (numerator, denominator) = params.payout_ratio.as_parts();
            for (passenger, order) in &flight.orders {
                if order.settled || order.amount.is_zero() {
                    continue;
                }
                let amount = order
                    .amount
                    .checked_mul_ratio(numerator, denominator)
                    .ok_or(SuretyError::ArithmeticOverflow)?;
                let balance = self
                    .refund(passenger)
                    .checked_add(amount)
                    .ok_or(SuretyError::ArithmeticOverflow)?;
                new_balances.insert(passenger.clone(), balance);
                credits.push(Credit {
                    passenger: passenger.clone(),
                    amount,
                });
            }
        }

        if let Some(flight) = self.flights.get_mut(key) {
            flight.status = status;
            for order in flight.orders.values_mut() {
                order.settled = true;
            }
        }
        self.credits.extend(new_balances);

        info!(
            "Flight {} settled as {}: {} passenger(s) credited",
            key,
            status,
            credits.len()
        );
        Ok(credits)
    }

    /// Withdraw the caller's full credit from the shared pool
    pub fn pay(&mut self, passenger: &AccountId) -> SuretyResult<Amount> {
        let owed = self.refund(passenger);
        if owed.is_zero() {
            return Err(SuretyError::NothingOwed(passenger.clone()));
        }
        self.pool.withdraw(passenger, owed)?;
        self.credits.remove(passenger);
        info!("Paid {} to {}; pool now {}", owed, passenger, self.pool.balance());
        Ok(owed)
    }

    /// Add value to the pool without an associated flight (airline funding)
    pub fn deposit(&mut self, value: Amount) -> SuretyResult<()> {
        self.pool.deposit(value)
    }

    pub fn flight(&self, key: &FlightKey) -> Option<&Flight> {
        self.flights.get(key)
    }

    /// Flights in registration order
    pub fn flight_list(&self) -> Vec<&Flight> {
        self.flight_order
            .iter()
            .filter_map(|key| self.flights.get(key))
            .collect()
    }

    pub fn order(&self, passenger: &AccountId, key: &FlightKey) -> Amount {
        self.flights
            .get(key)
            .and_then(|f| f.orders.get(passenger))
            .map(|o| o.amount)
            .unwrap_or_default()
    }

    pub fn flight_status_code(&self, key: &FlightKey) -> SuretyResult<FlightStatus> {
        self.flights
            .get(key)
            .map(|f| f.status)
            .ok_or_else(|| SuretyError::UnknownFlight(key.to_string()))
    }

    pub fn refund(&self, passenger: &AccountId) -> Amount {
        self.credits.get(passenger).copied().unwrap_or_default()
    }

    pub fn total_fund(&self) -> Amount {
        self.pool.balance()
    }

    pub fn pool(&self) -> &FundPool {
        &self.pool
    }

    /// Sum of all outstanding passenger credit
    pub fn outstanding_credit(&self) -> SuretyResult<Amount> {
        sum_amounts(self.credits.values().copied())
    }

    pub(crate) fn log_state(&self) {
        match self.outstanding_credit() {
            Ok(credit) => debug!(
                "Insurance book: {} flights, pool {}, outstanding credit {}",
                self.flights.len(),
                self.pool.balance(),
                credit
            ),
            Err(e) => debug!(
                "Insurance book: {} flights, pool {}, outstanding credit unavailable: {}",
                self.flights.len(),
                self.pool.balance(),
                e
            ),
        }
    }
}
