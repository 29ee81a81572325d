//! Water level and surface velocity from a 24 GHz FMCW radar.
//!
//! Each acquisition goes through a range FFT to find the water surface. The complex
//! value of the surface bin is collected over time, and a second (Doppler) FFT over
//! that history gives the flow velocity.

pub mod backend;
pub mod buffer;
pub mod config;
pub mod diagnostics;
pub mod doppler;
pub mod dsp;
pub mod error;
pub mod fallback;
pub mod geometry;
pub mod monitor;
pub mod phase;
pub mod pipeline;
pub mod range;
pub mod ranging;
pub mod rate;

pub use config::Config;
pub use error::{Error, Result};
