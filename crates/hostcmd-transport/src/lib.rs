//! Host command transport layer
//!
//! Serves the line protocol over TCP:
//! - TCP: one host at a time, bytes relayed into a parser
//! - Handler: parsed lines become invocations for a dispatcher

pub mod error;
pub mod handler;
pub mod tcp;

pub use error::TransportError;
pub use handler::{Acknowledge, ConnectionHandler, Dispatch, Invocation};
pub use tcp::TcpServer;
