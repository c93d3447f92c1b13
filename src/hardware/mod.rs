//! Hardware Communication Adapters
//!
//! SCPI over a LAN socket, and the resource string parsing it needs.

pub mod resource;
pub mod tcp_adapter;

pub use resource::{SocketAddress, SCPI_SOCKET_PORT};
pub use tcp_adapter::{TcpScpiAdapter, TcpScpiAdapterBuilder};
