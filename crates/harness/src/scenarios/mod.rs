//! Built-in scenarios.

mod tx_status;
mod validator_resync;

pub use tx_status::tx_status;
pub use validator_resync::{validator_resync, ValidatorResyncConfig};
