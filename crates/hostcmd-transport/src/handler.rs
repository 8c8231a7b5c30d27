//! Connection handler - turns received bytes into command invocations

use bytes::{BufMut, BytesMut};
use hostcmd_core::{CommandId, ErrorCode, Registry};
use hostcmd_protocol::{
    ByteSource, EchoBuffer, MemorySource, ParamValue, Parser, ParserConfig, Response,
};
use serde::Serialize;
use tracing::{debug, warn};

/// A fully parsed command line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Invocation {
    pub command: String,
    #[serde(skip)]
    pub id: CommandId,
    pub args: Vec<ParamValue>,
}

/// Executes invocations on behalf of the host
pub trait Dispatch {
    fn dispatch(&mut self, invocation: &Invocation) -> Response;
}

impl<D: Dispatch + ?Sized> Dispatch for &mut D {
    fn dispatch(&mut self, invocation: &Invocation) -> Response {
        (**self).dispatch(invocation)
    }
}

/// Replies to every invocation with a JSON echo of its decoded arguments
#[derive(Debug, Default, Clone, Copy)]
pub struct Acknowledge;

impl Dispatch for Acknowledge {
    fn dispatch(&mut self, invocation: &Invocation) -> Response {
        match serde_json::to_vec(invocation) {
            Ok(body) => Response::bulk(body),
            Err(e) => Response::error("ENCODE", e.to_string()),
        }
    }
}

/// Handles a single host connection
pub struct ConnectionHandler<D, S = MemorySource> {
    /// Unique client ID
    pub client_id: String,
    parser: Parser<S, EchoBuffer>,
    dispatcher: D,
    /// Command whose parameters are still arriving
    pending: Option<Invocation>,
}

impl<D: Dispatch> ConnectionHandler<D> {
    pub fn new(client_id: String, registry: Registry, config: ParserConfig, dispatcher: D) -> Self {
        Self::with_source(client_id, registry, config, MemorySource::new(), dispatcher)
    }
}

impl<D, S> ConnectionHandler<D, S>
where
    D: Dispatch,
    S: ByteSource + for<'a> Extend<&'a u8>,
{
    /// Handler reading through a custom byte queue
    pub fn with_source(
        client_id: String,
        registry: Registry,
        config: ParserConfig,
        source: S,
        dispatcher: D,
    ) -> Self {
        Self {
            client_id,
            parser: Parser::with_registry(registry, source, EchoBuffer::new(), config),
            dispatcher,
            pending: None,
        }
    }

    pub fn parser(&self) -> &Parser<S, EchoBuffer> {
        &self.parser
    }

    /// Process incoming data and return the encoded replies
    pub fn process(&mut self, data: &[u8]) -> BytesMut {
        self.parser.source_mut().extend(data);

        let mut out = BytesMut::new();
        while let Some(response) = self.step() {
            self.flush_echo(&mut out);
            response.encode_into(&mut out);
        }
        self.flush_echo(&mut out);

        out
    }

    /// Advance until one reply is ready. `None` means more data is needed.
    fn step(&mut self) -> Option<Response> {
        loop {
            if self.pending.is_none() {
                if !self.parser.poll_command() {
                    match self.interrupted() {
                        Some(Interrupt::Resume) => continue,
                        Some(Interrupt::Wait) => return None,
                        None => return self.failure(),
                    }
                }

                let id = self.parser.command_id()?;
                self.pending = Some(Invocation {
                    command: self.parser.command_name().to_owned(),
                    id,
                    args: Vec::new(),
                });
            }

            while self.parser.poll_parameter() {
                if let (Some(pending), Some(value)) = (self.pending.as_mut(), self.parser.value()) {
                    pending.args.push(value);
                }
            }

            match self.interrupted() {
                Some(Interrupt::Resume) => continue,
                Some(Interrupt::Wait) => return None,
                None => {}
            }

            if self.parser.is_invalid() {
                self.pending = None;
                return self.failure();
            }

            if !self.parser.all_parameters_done() {
                return None;
            }

            let invocation = self.pending.take()?;
            let required = self.parser.command_spec().map_or(0, |cmd| cmd.required_count());

            if invocation.args.len() < required {
                warn!(
                    client = %self.client_id,
                    command = %invocation.command,
                    received = invocation.args.len(),
                    required = required,
                    "Command line ended early"
                );
                return Some(Response::parse_error(ErrorCode::RequiredMissing));
            }

            debug!(
                client = %self.client_id,
                command = %invocation.command,
                args = invocation.args.len(),
                "Dispatching command"
            );
            return Some(self.dispatcher.dispatch(&invocation));
        }
    }

    /// Poll that stopped without rejecting the line. The parser kept its
    /// state, so the partial invocation stays pending.
    fn interrupted(&self) -> Option<Interrupt> {
        match self.parser.last_error() {
            ErrorCode::Timeout => Some(Interrupt::Resume),
            ErrorCode::Source => {
                warn!(client = %self.client_id, "Input stalled, waiting for more data");
                Some(Interrupt::Wait)
            }
            _ => None,
        }
    }

    /// Reply for a failed poll, if it failed with an error
    fn failure(&self) -> Option<Response> {
        let code = self.parser.last_error();
        code.is_error().then(|| Response::parse_error(code))
    }

    fn flush_echo(&mut self, out: &mut BytesMut) {
        let echo = self.parser.echo_mut().take();
        if !echo.is_empty() {
            out.put(echo);
        }
    }
}

enum Interrupt {
    /// Scan ran out of time; the buffered bytes are still there
    Resume,
    /// Source failed; try again on the next chunk
    Wait,
}
