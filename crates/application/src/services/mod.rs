//! Application services - Use case implementations

mod call_relay;

pub use call_relay::{CallRelay, RelayConfig};
