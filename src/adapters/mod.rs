//! Endpoint implementations that need no hardware.

pub mod mock_adapter;

pub use mock_adapter::{MockScpiEndpoint, ScpiCall};
