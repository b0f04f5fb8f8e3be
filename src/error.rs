//! Setup-time error kinds.
//!
//! Runtime invariant violations (an empty RIT "unswap" search, a group-count
//! table invariant breach) are not represented here — they abort the process
//! via `panic!`/`debug_assert!` at the call site, per the error-kind taxonomy
//! this crate implements (configuration mistakes are recoverable, simulation
//! invariant breaches are not).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("row indirection table full for bank {bank}")]
    RitFull { bank: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
