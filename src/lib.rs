//! Core of a DRAM-controller plugin: the Hydra row-hammer tracker and the
//! address-translation subsystem that feeds it.
//!
//! This crate implements only the hard, self-contained core — the
//! surrounding memory-controller scheduler, DRAM timing engine, front-end
//! request issuer, and physical-to-DRAM translation/reservation layer are
//! opaque collaborators reached through the traits in [`adapter`].

pub mod addr_mapper;
pub mod adapter;
pub mod config;
pub mod error;
pub mod hydra;
pub mod request;
pub mod stats;
pub mod topology;

pub use addr_mapper::{rit::RowIndirectionTable, AddressMapper, MapperScheme};
pub use adapter::{ControllerAdapter, TranslationReserve};
pub use config::{HydraConfig, RccPolicy};
pub use error::{Error, Result};
pub use hydra::Tracker;
pub use request::Request;
pub use stats::HydraStats;
pub use topology::{CommandMeta, Level, Topology};
