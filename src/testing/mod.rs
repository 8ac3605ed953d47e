//! Test support utilities
//!
//! Mock collaborators for exercising the guard and the bridge loop without a
//! real serial port, network or broker.

pub mod mocks;

pub use mocks::{MockNetwork, MockSerial, MockSession};
