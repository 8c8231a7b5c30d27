//! hostcmd - incremental host command parsing
//!
//! Facade over the workspace crates for embedded use:
//! - [`hostcmd_core`]: command schemas and the definition language
//! - [`hostcmd_protocol`]: the parser, byte sources and replies

pub use hostcmd_core;
pub use hostcmd_protocol;

pub use hostcmd_core::{CommandId, DefinitionError, ErrorCode, ParamKind, ParamSpec, Registry};
pub use hostcmd_protocol::{ByteSource, Echo, MemorySource, ParamValue, Parser, ParserConfig};
