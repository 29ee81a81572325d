//! Collaborators around the signal processing: the sensor on one side
//! and the result consumers on the other.

pub mod source;
pub mod telemetry;
