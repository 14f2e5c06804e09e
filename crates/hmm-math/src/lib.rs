//! HMM engine math utilities: the log-domain arithmetic kernel.

pub mod math;

pub use math::log_space::{is_log_zero, lnsum, lnsum_all, LOG_ZERO};
