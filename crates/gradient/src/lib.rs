#![deny(unsafe_code)]
//! Gradient and solid color backgrounds.
//!
//! Both draw a single full-view quad and never rebuild it: every config
//! change rewrites the quad's material in place.

mod gradient;
mod solid;

pub use gradient::GradientGenerator;
pub use solid::SolidGenerator;
