//! Incremental host command parser
//!
//! The parser pulls bytes from a [`ByteSource`] one at a time and keeps at
//! most one token (a command name or a single parameter) in its buffer.
//! Nothing blocks: when the source has no data the poll methods return
//! `false` and the next call picks up where the previous one stopped.
//!
//! ```text
//! while parser.poll_command() {
//!     while parser.poll_parameter() {
//!         // parser.as_int(), parser.as_str(), ...
//!     }
//! }
//! ```

use std::time::{Duration, Instant};

use hostcmd_core::{CommandId, CommandSpec, DefinitionError, ErrorCode, ParamSpec, Registry};
use tracing::{debug, warn};

use crate::config::{self, ParserConfig};
use crate::decode::{self, ParamValue};
use crate::source::{ByteSource, Echo, NullEcho};

const MSG_TOO_LONG: &str = "too long input discarded till EOL";
const MSG_UNKNOWN_COMMAND: &str = "unknown command";

/// Lexical phase of the current line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Nothing received for this line yet
    #[default]
    Clean,
    /// Collecting a command name
    Name,
    /// Collecting a parameter of the matched command
    Param,
}

/// Opening quote of a quoted-string parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quote {
    Double,
    Single,
}

impl Quote {
    fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'"' => Some(Quote::Double),
            b'\'' => Some(Quote::Single),
            _ => None,
        }
    }

    fn byte(self) -> u8 {
        match self {
            Quote::Double => b'"',
            Quote::Single => b'\'',
        }
    }
}

/// Markers orthogonal to [`Phase`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScanFlags {
    /// The current token is fully captured
    pub complete: bool,
    /// The line terminator has been consumed
    pub eol: bool,
    /// The line is rejected; input is skipped until end of line
    pub invalid: bool,
    /// The previous byte was a backslash
    pub escape: bool,
    /// Inside the quotes of a quoted-string parameter
    pub quote: Option<Quote>,
    /// The string token hit its length cap
    pub capped: bool,
}

/// Outcome of one scan call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scan {
    Token,
    Pending,
    Failed,
}

/// Token buffer would reach its capacity
struct Overflow;

/// Host command parser bound to one byte source
pub struct Parser<S, E = NullEcho> {
    registry: Registry,
    source: S,
    echo: E,
    config: ParserConfig,
    capacity: usize,
    buf: Vec<u8>,
    command: Option<CommandId>,
    param: Option<usize>,
    phase: Phase,
    flags: ScanFlags,
    error: ErrorCode,
}

impl<S: ByteSource> Parser<S> {
    /// Create a parser without an echo channel
    pub fn new(source: S, config: ParserConfig) -> Self {
        Self::with_echo(source, NullEcho, config)
    }
}

impl<S: ByteSource, E: Echo> Parser<S, E> {
    /// Create a parser that writes interactive diagnostics to `echo`
    pub fn with_echo(source: S, echo: E, config: ParserConfig) -> Self {
        let registry = Registry::new(config.effective_capacity());
        Self::with_registry(registry, source, echo, config)
    }

    /// Create a parser over an already populated registry
    pub fn with_registry(registry: Registry, source: S, echo: E, config: ParserConfig) -> Self {
        let mut capacity = config.effective_capacity();
        if capacity != config.buffer_capacity {
            warn!(
                requested = config.buffer_capacity,
                used = capacity,
                "Token buffer too small, using default size"
            );
        }

        // string caps were checked against the registry's buffer size
        if registry.max_param_len() >= capacity {
            warn!(
                configured = capacity,
                registry = registry.max_param_len() + 1,
                "Registry built for a larger buffer, growing token buffer"
            );
            capacity = registry.max_param_len() + 1;
        }

        Self {
            registry,
            source,
            echo,
            config,
            capacity,
            buf: Vec::with_capacity(capacity),
            command: None,
            param: None,
            phase: Phase::Clean,
            flags: ScanFlags::default(),
            error: ErrorCode::None,
        }
    }

    // ---- setup -------------------------------------------------------------

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Registry access for step-by-step definitions. Must not be used once
    /// parsing has started.
    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    /// Define a command with a printf-like parameter list, see
    /// [`Registry::define_with`]
    pub fn define(&mut self, name: &str, spec: &str) -> Result<usize, DefinitionError> {
        self.registry.define_with(name, spec)
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Turn diagnostics echo on or off. `prompt` is written after each one.
    pub fn set_interactive(&mut self, interactive: bool, prompt: Option<&str>) {
        self.config.interactive = interactive;
        self.config.prompt = prompt.map(str::to_owned);
    }

    /// Enable or disable `\` escapes
    pub fn set_escapes(&mut self, enabled: bool) {
        self.config.escapes = enabled;
    }

    /// Limit the time a single poll may spend while bytes keep arriving.
    /// A zero budget removes the limit.
    pub fn set_time_budget(&mut self, budget: Option<Duration>) {
        self.config.time_budget_ms = config::budget_ms(budget);
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn echo(&self) -> &E {
        &self.echo
    }

    pub fn echo_mut(&mut self) -> &mut E {
        &mut self.echo
    }

    // ---- processing --------------------------------------------------------

    /// Try to receive the next command.
    ///
    /// A previously matched command is discarded first; if its line was not
    /// finished the rest of it is skipped. Returns true once a known command
    /// name has been read.
    pub fn poll_command(&mut self) -> bool {
        self.error = ErrorCode::None;

        if self.command.is_some() {
            self.discard();
        }

        self.scan() == Scan::Token
    }

    /// Try to receive the next parameter of the current command.
    ///
    /// Returns false when no more parameters are expected, when the data is
    /// not there yet, or on error (see [`Parser::is_invalid`]).
    pub fn poll_parameter(&mut self) -> bool {
        self.error = ErrorCode::None;

        if self.all_parameters_done() {
            return false;
        }

        self.scan() == Scan::Token
    }

    /// Abandon the current line
    pub fn discard(&mut self) {
        let idle = self.phase == Phase::Clean && self.flags == ScanFlags::default();
        let line_done = self.flags.eol;

        self.reset();

        if !(idle || line_done) {
            // swallow the remainder of the line
            self.flags.invalid = true;
        }
    }

    // ---- state -------------------------------------------------------------

    pub fn command_id(&self) -> Option<CommandId> {
        self.command
    }

    pub fn command_spec(&self) -> Option<&CommandSpec> {
        self.command.and_then(|id| self.registry.get(id))
    }

    /// Name of the current command as it was defined, empty if none
    pub fn command_name(&self) -> &str {
        self.command_spec().map_or("", CommandSpec::name)
    }

    pub fn parameter_index(&self) -> Option<usize> {
        self.command.and(self.param)
    }

    pub fn parameter_spec(&self) -> Option<ParamSpec> {
        let index = self.parameter_index()?;
        self.command_spec()?.param(index).copied()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_invalid(&self) -> bool {
        self.flags.invalid
    }

    pub fn is_eol(&self) -> bool {
        self.flags.eol
    }

    /// Error raised by the most recent poll
    pub fn last_error(&self) -> ErrorCode {
        self.error
    }

    /// Description of [`Parser::last_error`]
    pub fn errstr(&self) -> &'static str {
        self.error.message()
    }

    /// True if the current parameter lies in the optional region
    pub fn is_optional(&self) -> bool {
        match (self.command_spec(), self.param) {
            (Some(cmd), Some(index)) => cmd.is_optional(index),
            _ => false,
        }
    }

    /// True when the command needs nothing more: no command, rejected input,
    /// end of line seen, or every required parameter captured.
    pub fn is_complete(&self) -> bool {
        let Some(cmd) = self.command_spec() else {
            return true;
        };

        if self.flags.eol || self.flags.invalid || cmd.params().is_empty() {
            return true;
        }

        self.captured() >= cmd.required_count()
    }

    /// True once the last declared parameter, optional ones included, is
    /// captured, or the line is over
    pub fn all_parameters_done(&self) -> bool {
        let Some(cmd) = self.command_spec() else {
            return true;
        };

        if self.flags.eol || self.flags.invalid || cmd.params().is_empty() {
            return true;
        }

        self.captured() == cmd.params().len()
    }

    fn captured(&self) -> usize {
        match self.param {
            None => 0,
            Some(index) if self.flags.complete => index + 1,
            Some(index) => index,
        }
    }

    // ---- typed accessors ---------------------------------------------------

    fn token(&self) -> Option<&[u8]> {
        let ready = self.command.is_some()
            && self.param.is_some()
            && self.flags.complete
            && !self.flags.invalid;

        ready.then_some(self.buf.as_slice())
    }

    pub fn as_bool(&self) -> bool {
        self.token().map_or(false, decode::parse_bool)
    }

    pub fn as_byte(&self) -> u8 {
        self.token().map_or(0, decode::parse_byte)
    }

    pub fn as_int(&self) -> i32 {
        self.token().map_or(0, decode::parse_int)
    }

    pub fn as_float(&self) -> f32 {
        self.token().map_or(0.0, decode::parse_float)
    }

    /// Raw token, already unquoted and unescaped
    pub fn as_bytes(&self) -> &[u8] {
        self.token().unwrap_or_default()
    }

    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(self.token()?).ok()
    }

    /// Current parameter decoded according to its declared kind
    pub fn value(&self) -> Option<ParamValue> {
        let kind = self.parameter_spec()?.kind();
        self.token().map(|token| ParamValue::decode(kind, token))
    }

    // ---- scanning ----------------------------------------------------------

    fn reset(&mut self) {
        self.command = None;
        self.param = None;
        self.phase = Phase::Clean;
        self.flags = ScanFlags::default();
        self.buf.clear();
    }

    fn current_param(&self) -> Option<ParamSpec> {
        if self.phase != Phase::Param {
            return None;
        }
        self.parameter_spec()
    }

    /// Move past a token the caller has already seen
    fn advance(&mut self) {
        if self.flags.eol {
            self.reset();
            return;
        }

        if !self.flags.complete || self.flags.invalid {
            return;
        }

        let count = self.command_spec().map_or(0, |cmd| cmd.params().len());
        let next = self.param.map_or(0, |index| index + 1);

        if next >= count {
            self.reset();
        } else {
            self.param = Some(next);
            self.phase = Phase::Param;
            self.flags = ScanFlags::default();
            self.buf.clear();
        }
    }

    fn scan(&mut self) -> Scan {
        self.advance();

        let budget = self.config.budget();
        let started = Instant::now();
        let mut first = true;

        loop {
            if let Some(budget) = budget {
                if !first && started.elapsed() >= budget {
                    debug!(budget_ms = budget.as_millis() as u64, "Scan time budget exceeded");
                    self.error = ErrorCode::Timeout;
                    return Scan::Failed;
                }
            }
            first = false;

            match self.source.available() {
                Ok(0) => return Scan::Pending,
                Ok(_) => {}
                Err(e) => return self.source_failed(e),
            }

            let byte = match self.source.read_byte() {
                Ok(byte) => byte,
                Err(e) => return self.source_failed(e),
            };

            if self.flags.invalid {
                if is_eol(byte) {
                    self.reset();
                }
                continue;
            }

            if self.flags.escape {
                self.flags.escape = false;
                if self.store(byte).is_err() {
                    return self.overflow();
                }
                continue;
            }

            if self.buf.is_empty() && self.flags.quote.is_none() && is_blank(byte) {
                continue;
            }

            if is_delimiter(byte) {
                match self.phase {
                    // empty line
                    Phase::Clean => continue,
                    Phase::Name => {
                        self.flags.eol = is_eol(byte);
                        self.flags.complete = true;
                        return self.lookup();
                    }
                    Phase::Param => match self.end_param(byte) {
                        Some(scan) => return scan,
                        None => continue,
                    },
                }
            }

            match self.phase {
                Phase::Clean | Phase::Name => {
                    self.phase = Phase::Name;
                    if self.config.escapes && byte == b'\\' {
                        self.flags.escape = true;
                    } else if self.push(byte).is_err() {
                        return self.overflow();
                    }
                }
                Phase::Param => {
                    if let Some(scan) = self.param_byte(byte) {
                        return scan;
                    }
                }
            }
        }
    }

    /// Resolve a completed command name
    fn lookup(&mut self) -> Scan {
        match self.registry.find_bytes(&self.buf) {
            Some(id) => {
                self.command = Some(id);
                self.param = None;
                debug!(command = %self.registry[id].name(), id = id.index(), "Command received");
                Scan::Token
            }
            None => {
                let eol = self.flags.eol;
                warn!(name = %String::from_utf8_lossy(&self.buf), "Unknown command");

                self.reset();
                self.flags.invalid = true;
                // a consumed terminator ends the rejected line
                self.flags.eol = eol;
                self.error = ErrorCode::UnknownCommand;
                self.diagnose(MSG_UNKNOWN_COMMAND);
                Scan::Failed
            }
        }
    }

    /// Whitespace or line end while collecting a parameter.
    /// Returns `None` when the byte was kept as content.
    fn end_param(&mut self, byte: u8) -> Option<Scan> {
        let spec = self.current_param()?;

        let room = spec.max_len().map_or(true, |max| self.buf.len() < max);
        if self.flags.quote.is_some() && !self.flags.capped && room {
            return match self.push(byte) {
                Ok(()) => None,
                Err(Overflow) => Some(self.overflow()),
            };
        }

        if is_eol(byte) {
            self.flags.eol = true;

            let index = self.param.unwrap_or(0);
            let missing = match self.command_spec() {
                _ if self.buf.is_empty() => Some(index),
                Some(cmd) if index + 1 < cmd.params().len() && !cmd.is_optional(index + 1) => {
                    Some(index + 1)
                }
                _ => None,
            };

            if let Some(missing) = missing {
                return Some(self.reject_missing(missing));
            }
        }

        self.flags.complete = true;
        debug!(
            command = %self.command_name(),
            index = self.param.unwrap_or(0),
            len = self.buf.len(),
            "Parameter received"
        );
        Some(Scan::Token)
    }

    /// Content byte of a parameter. Returns `Some` when the call is over.
    fn param_byte(&mut self, byte: u8) -> Option<Scan> {
        let spec = self.current_param()?;

        if spec.is_quoted() {
            match self.flags.quote {
                None => {
                    return match Quote::from_byte(byte) {
                        Some(quote) => {
                            // opening quote is not stored
                            self.flags.quote = Some(quote);
                            None
                        }
                        None => Some(self.reject_quotes()),
                    };
                }
                Some(quote) if quote.byte() == byte => {
                    self.flags.complete = true;
                    debug!(
                        command = %self.command_name(),
                        index = self.param.unwrap_or(0),
                        len = self.buf.len(),
                        "Quoted parameter received"
                    );
                    return Some(Scan::Token);
                }
                Some(_) => {}
            }
        }

        if self.config.escapes && byte == b'\\' {
            self.flags.escape = true;
            return None;
        }

        if self.flags.capped {
            return None;
        }

        match self.store(byte) {
            Ok(()) => None,
            Err(Overflow) => Some(self.overflow()),
        }
    }

    /// Append a content byte, honouring the parameter's length cap
    fn store(&mut self, byte: u8) -> Result<(), Overflow> {
        if let Some(max) = self.current_param().and_then(|spec| spec.max_len()) {
            if self.buf.len() >= max {
                self.flags.capped = true;
                return Ok(());
            }
        }
        self.push(byte)
    }

    fn push(&mut self, byte: u8) -> Result<(), Overflow> {
        if self.buf.len() + 1 >= self.capacity {
            return Err(Overflow);
        }
        self.buf.push(byte);
        Ok(())
    }

    fn overflow(&mut self) -> Scan {
        warn!(capacity = self.capacity, "Input too long, skipping to end of line");
        self.diagnose(MSG_TOO_LONG);
        self.discard();
        self.error = ErrorCode::ParamTooLong;
        Scan::Failed
    }

    fn reject_missing(&mut self, missing: usize) -> Scan {
        warn!(
            command = %self.command_name(),
            parameter = missing + 1,
            "Required parameter missing"
        );
        self.flags.invalid = true;
        self.error = ErrorCode::RequiredMissing;
        self.diagnose(&format!("attempt to skip non-optional parameter #{}", missing + 1));
        Scan::Failed
    }

    fn reject_quotes(&mut self) -> Scan {
        warn!(
            command = %self.command_name(),
            index = self.param.unwrap_or(0),
            "Quoted string parameter without opening quote"
        );
        self.flags.invalid = true;
        self.error = ErrorCode::MissingQuotes;
        Scan::Failed
    }

    fn source_failed(&mut self, e: std::io::Error) -> Scan {
        warn!(error = %e, "Byte source failed");
        self.error = ErrorCode::Source;
        Scan::Failed
    }

    fn diagnose(&mut self, message: &str) {
        if !self.config.interactive {
            return;
        }

        self.echo.write_line(message);
        if let Some(prompt) = self.config.prompt.as_deref().filter(|p| !p.is_empty()) {
            self.echo.write(prompt);
        }
    }
}

fn is_eol(byte: u8) -> bool {
    byte == b'\n' || byte == b'\r'
}

/// Token terminators
fn is_delimiter(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\n' | b'\r')
}

/// Whitespace dropped in front of a token
fn is_blank(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | 0x0b | 0x0c)
}
