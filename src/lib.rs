pub mod config;
pub mod errors;
pub mod governance;
pub mod insurance;
pub mod ledger;
pub mod oracle;
pub mod storage;
pub mod surety;
pub mod utils;

// Re-export commonly used items
pub use config::{SuretyConfig, SuretyParameters};
pub use errors::{SuretyError, SuretyResult};
pub use governance::{RegistrationOutcome, VoteOutcome};
pub use insurance::{FlightKey, FlightStatus};
pub use ledger::{AccountId, Amount, LedgerEvent, SuretyEvent, Transition};
pub use oracle::{ChaChaIndexSource, ChainHashIndexSource, IndexSource, ResponseOutcome};
pub use storage::{SnapshotStore, StorageError};
pub use surety::{FlightSurety, SuretySnapshot};
