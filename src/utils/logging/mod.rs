//! Logging and progress helpers
//!
//! Library code logs through the `log` facade; the binary decides where it goes.

pub mod log;
pub mod progress;

pub use self::log::{TableKind, log_data_warning, log_load_complete, log_load_start};
pub use self::progress::{create_spinner, finish_spinner, hidden_spinner};
