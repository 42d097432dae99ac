//! Centralized error type for the cocoon umbrella crate.
//!
//! Wraps the subsystem errors so `?` propagates naturally across crate boundaries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Host(#[from] cocoon_host::HostError),

    #[error("Load: {0}")]
    Load(#[from] cocoon_host::LoadError),

    #[cfg(feature = "clap")]
    #[error("CLAP: {0}")]
    Clap(#[from] cocoon_clap::ClapError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
