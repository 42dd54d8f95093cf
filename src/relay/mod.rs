pub mod controller;

pub use controller::{Relay, RelayOutcome, RelayPhase};
