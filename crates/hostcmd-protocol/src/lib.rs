//! Host command protocol
//!
//! A line-oriented command language for small devices talking to a host.
//!
//! ## Command Format
//! ```text
//! NAME [PARAM ...]\n
//! ```
//!
//! Parameters are separated by spaces or tabs. `\` escapes the next byte and
//! quoted-string parameters are wrapped in `'` or `"`. Each command declares
//! its parameters with a printf-like list, e.g. `"d d ?s"`.
//!
//! ## Response Format
//! ```text
//! +OK [message]            # Success
//! -ERR <code> <message>    # Error
//! $<length>\r\n<data>      # Bulk data (JSON)
//! ```

pub mod config;
pub mod decode;
pub mod parser;
pub mod response;
pub mod source;

pub use config::ParserConfig;
pub use decode::ParamValue;
pub use parser::{Parser, Phase};
pub use response::Response;
pub use source::{ByteSource, Echo, EchoBuffer, MemorySource, NullEcho};
