//! hostcmd core - command schemas
//!
//! This crate holds what the parser needs to know about commands:
//! - Parameter kinds and length caps
//! - The append-only command registry
//! - The printf-like definition language used to declare parameters

pub mod error;
pub mod registry;
pub mod schema;

pub use error::{DefinitionError, ErrorCode, Result};
pub use registry::{Registry, DEFAULT_BUFFER_CAPACITY};
pub use schema::{CommandId, CommandSpec, ParamKind, ParamSpec};
