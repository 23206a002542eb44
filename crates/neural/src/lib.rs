#![deny(unsafe_code)]
//! Neural-network visualization background.
//!
//! A ring of nodes joined to their nearest neighbours by gently curved
//! connections, with data packets travelling along them. Everything is
//! derived from the config through [`pseudo_noise`], so equal configs
//! always yield byte-identical layouts and packet motion.
//!
//! Changing `nodeCount`, `connectionDensity` or `packetCount` fades the
//! current network out, swaps in a regenerated one and fades it in.

pub mod fade;
mod generator;
pub mod network;
pub mod noise;

pub use fade::{step_opacity, FADE_EPSILON, FADE_RATE, TRANSITION_WINDOW_MS};
pub use generator::{NeuralGenerator, TransitionPhase};
pub use network::{DataPacket, Network, NetworkConnection, NetworkNode};
pub use noise::pseudo_noise;
