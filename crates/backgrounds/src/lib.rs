#![deny(unsafe_code)]
//! Background registry, orchestrator and snapshot rendering.
//!
//! This crate sits between `backdrop-core` (which defines the `Generator`
//! trait and the engine) and the individual generator crates. Both the CLI
//! and the integration tests drive backgrounds through it so the dispatch
//! and swap protocol live in one place.

pub mod orchestrator;
pub mod registry;
pub mod studio;

#[cfg(feature = "png")]
pub mod snapshot;

pub use orchestrator::{Applied, Orchestrator};
pub use registry::BackgroundGenerator;
pub use studio::Studio;
