use thiserror::Error;

use crate::ledger::{AccountId, Amount};

/// Reasons a surety transition is rejected.
///
/// A rejected transition leaves no trace in ledger state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SuretyError {
    #[error("Contract is not operational")]
    NotOperational,

    #[error("Caller {0} is not the contract owner")]
    NotOwner(AccountId),

    // Membership and governance
    #[error("Caller {0} is not a registered airline")]
    NotAirline(AccountId),

    #[error("Airline {airline} has funded {funded}, membership requires {required}")]
    NotFunded {
        airline: AccountId,
        funded: Amount,
        required: Amount,
    },

    #[error("Airline {0} is already registered")]
    AlreadyRegistered(AccountId),

    #[error("Airline {candidate} already has pending registration request {request_id}")]
    AlreadyPending {
        candidate: AccountId,
        request_id: u64,
    },

    #[error("Unknown registration request {0}")]
    UnknownRegistrationRequest(u64),

    // Flights and insurance
    #[error("Flight designator must not be empty")]
    InvalidDesignator,

    #[error("Flight {0} is already registered")]
    DuplicateFlight(String),

    #[error("Flight {0} is not registered")]
    UnknownFlight(String),

    #[error("Flight {0} is no longer available for purchase")]
    NotOpenForPurchase(String),

    #[error("Flight {0} already has a final status")]
    FlightAlreadyFinalized(String),

    #[error("Amount must be greater than zero")]
    InvalidAmount,

    #[error("Purchase of {requested} on top of {existing} exceeds the cap of {cap}")]
    OverCap {
        existing: Amount,
        requested: Amount,
        cap: Amount,
    },

    #[error("Nothing is owed to {0}")]
    NothingOwed(AccountId),

    #[error("Fund insufficient: {owed} owed, {available} in pool")]
    InsufficientPool { owed: Amount, available: Amount },

    // Oracles
    #[error("Oracle {0} is already registered")]
    OracleAlreadyRegistered(AccountId),

    #[error("Registration fee of {required} required, {paid} paid")]
    InsufficientFee { paid: Amount, required: Amount },

    #[error("Caller {0} is not a registered oracle")]
    NotOracle(AccountId),

    #[error("Index {index} is not assigned to oracle {oracle}")]
    IndexNotAssigned { oracle: AccountId, index: u8 },

    #[error("No oracle request matches index {index} for flight {flight}")]
    UnknownRequest { index: u8, flight: String },

    #[error("Status code {0} is not a valid oracle report")]
    InvalidStatusCode(u8),

    #[error("Arithmetic overflow in ledger accounting")]
    ArithmeticOverflow,
}

pub type SuretyResult<T> = Result<T, SuretyError>;
