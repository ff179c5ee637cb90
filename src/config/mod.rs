//! Runtime configuration, passed explicitly into the store, engine and scheduler.

pub mod hunter;

pub use hunter::HunterConfig;
