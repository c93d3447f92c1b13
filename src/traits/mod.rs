//! Hardware-agnostic traits
//!
//! Interfaces the instrument session is written against, so the same driver
//! runs over a TCP socket or a scripted mock.

pub mod scpi_endpoint;

pub use self::scpi_endpoint::ScpiEndpoint;
