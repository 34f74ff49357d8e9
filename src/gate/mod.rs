//! Request-time credential checks.

pub mod type_gate;

pub use type_gate::{TypeGateLayer, TypeGateService};
