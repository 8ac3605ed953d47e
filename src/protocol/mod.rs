//! Wire protocol for the serial line format and broker topics
//!
//! Every line crossing the bridge, uplink or downlink, is a single JSON object
//! terminated by one newline. This module defines how a parsed line is
//! classified for routing and how the fixed broker topics are built and
//! validated.

pub mod messages;
pub mod topics;

pub use messages::*;
pub use topics::*;
