//! Transaction submission module with sequence tracking and gas defaults

mod gas;
mod sequence;
mod submitter;

pub use gas::{Expiration, GasEstimator, GasParams, SubmitOptions};
pub use sequence::{SequenceLease, SequenceManager};
pub use submitter::TransactionSubmitter;
