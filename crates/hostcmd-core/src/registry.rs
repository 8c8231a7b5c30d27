//! Command registry - append-only table of command schemas

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{DefinitionError, Result};
use crate::schema::{CommandId, CommandSpec, ParamKind, ParamSpec};

/// Token buffer size used when the requested one is unusable
pub const DEFAULT_BUFFER_CAPACITY: usize = 64;

/// Registry of known commands.
///
/// Commands are never removed or reordered, so a [`CommandId`] stays valid for
/// the lifetime of the registry.
#[derive(Debug, Clone, Serialize)]
pub struct Registry {
    commands: Vec<CommandSpec>,
    #[serde(skip)]
    max_len: usize,
}

impl Registry {
    /// Create a registry for a parser whose token buffer holds `buffer_capacity` bytes
    pub fn new(buffer_capacity: usize) -> Self {
        let capacity = if buffer_capacity < 2 {
            DEFAULT_BUFFER_CAPACITY
        } else {
            buffer_capacity
        };

        Self {
            commands: Vec::new(),
            max_len: capacity - 1,
        }
    }

    /// Longest string parameter the token buffer can hold
    pub fn max_param_len(&self) -> usize {
        self.max_len
    }

    /// Register a command without parameters
    pub fn define(&mut self, name: impl Into<String>) -> Result<CommandId> {
        let name = name.into();

        if self.find(&name).is_some() {
            return Err(DefinitionError::DuplicateName(name));
        }

        let id = CommandId(self.commands.len());
        debug!(command = %name, id = id.index(), "Command defined");
        self.commands.push(CommandSpec::new(name));
        Ok(id)
    }

    /// Register a command and compile its parameter list.
    ///
    /// `spec` is a printf-like definition: `[?][length]type` repeated, where
    /// type is one of `b` (bool), `c` (byte), `d` (int), `f` (float),
    /// `s` (string), `q` (quoted string). Whitespace is ignored.
    ///
    /// Returns the number of parameters. On a definition error the command
    /// stays registered with the parameters compiled so far.
    pub fn define_with(&mut self, name: impl Into<String>, spec: &str) -> Result<usize> {
        let id = self.define(name)?;

        if let Err(e) = self.compile(id, spec) {
            warn!(
                command = %self.commands[id.0].name(),
                spec = spec,
                error = %e,
                "Bad command definition"
            );
            return Err(e);
        }

        Ok(self.commands[id.0].params().len())
    }

    fn compile(&mut self, id: CommandId, spec: &str) -> Result<()> {
        let max = self.max_len;
        let cmd = &mut self.commands[id.0];
        let mut length: Option<usize> = None;

        for c in spec.chars() {
            if c.is_whitespace() {
                continue;
            }

            if c == '?' {
                if cmd.params().is_empty() || !cmd.mark_optional() {
                    return Err(DefinitionError::InvalidParamSpec);
                }
                continue;
            }

            if let Some(digit) = c.to_digit(10) {
                let next = length
                    .unwrap_or(0)
                    .checked_mul(10)
                    .and_then(|n| n.checked_add(digit as usize));

                // a leading zero is most probably a mistake
                match next {
                    Some(n) if n > 0 => length = Some(n),
                    _ => return Err(DefinitionError::BadLength { length: next, max }),
                }
                continue;
            }

            let kind = ParamKind::from_pcode(c).ok_or(DefinitionError::BadPcode(c))?;
            let param = match kind {
                ParamKind::Bool => ParamSpec::Bool,
                ParamKind::Byte => ParamSpec::Byte,
                ParamKind::Int => ParamSpec::Int,
                ParamKind::Float => ParamSpec::Float,
                ParamKind::String => ParamSpec::Str(checked_len(length, max)?),
                ParamKind::QuotedString => ParamSpec::QuotedStr(checked_len(length, max)?),
            };
            cmd.push(param);
            length = None;
        }

        Ok(())
    }

    pub fn add_bool(&mut self) -> Result<()> {
        self.push_param(ParamSpec::Bool)
    }

    pub fn add_byte(&mut self) -> Result<()> {
        self.push_param(ParamSpec::Byte)
    }

    pub fn add_int(&mut self) -> Result<()> {
        self.push_param(ParamSpec::Int)
    }

    pub fn add_float(&mut self) -> Result<()> {
        self.push_param(ParamSpec::Float)
    }

    /// Append a bare string parameter keeping at most `max_len` bytes
    pub fn add_str(&mut self, max_len: usize) -> Result<()> {
        let len = checked_len(Some(max_len), self.max_len)?;
        self.push_param(ParamSpec::Str(len))
    }

    /// Append a quoted string parameter keeping at most `max_len` bytes
    pub fn add_qstr(&mut self, max_len: usize) -> Result<()> {
        let len = checked_len(Some(max_len), self.max_len)?;
        self.push_param(ParamSpec::QuotedStr(len))
    }

    /// Mark all parameters added from now on as optional.
    ///
    /// Does nothing if the region was already started or no command exists.
    pub fn optional_from_here(&mut self) {
        if let Some(cmd) = self.commands.last_mut() {
            cmd.mark_optional();
        }
    }

    fn push_param(&mut self, param: ParamSpec) -> Result<()> {
        let cmd = self.commands.last_mut().ok_or(DefinitionError::NoCommand)?;
        cmd.push(param);
        Ok(())
    }

    /// Look a command up by name, ignoring ASCII case
    pub fn find(&self, name: &str) -> Option<CommandId> {
        self.find_bytes(name.as_bytes())
    }

    /// Same as [`Registry::find`] but for a raw token
    pub fn find_bytes(&self, name: &[u8]) -> Option<CommandId> {
        self.commands
            .iter()
            .position(|cmd| cmd.matches(name))
            .map(CommandId)
    }

    pub fn get(&self, id: CommandId) -> Option<&CommandSpec> {
        self.commands.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (CommandId, &CommandSpec)> {
        self.commands
            .iter()
            .enumerate()
            .map(|(i, cmd)| (CommandId(i), cmd))
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_CAPACITY)
    }
}

impl std::ops::Index<CommandId> for Registry {
    type Output = CommandSpec;

    fn index(&self, id: CommandId) -> &CommandSpec {
        &self.commands[id.0]
    }
}

/// String length attribute: explicit value in 1..=max, or max when absent
fn checked_len(length: Option<usize>, max: usize) -> Result<usize> {
    match length {
        None => Ok(max),
        Some(len) if (1..=max).contains(&len) => Ok(len),
        Some(len) => Err(DefinitionError::BadLength {
            length: Some(len),
            max,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_command_name() {
        let mut reg = Registry::new(64);

        assert_eq!(reg.define_with("C1", "d"), Ok(1));
        assert_eq!(reg.define_with("C2", "10sf"), Ok(2));

        assert_eq!(
            reg.define_with("c1", "q"),
            Err(DefinitionError::DuplicateName("c1".into()))
        );
        assert!(reg.define("C2").is_err());
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn test_bad_definitions() {
        let mut reg = Registry::new(64);

        assert_eq!(reg.define_with("C1", "?d"), Err(DefinitionError::InvalidParamSpec));
        assert_eq!(reg.define_with("C2", "BAD"), Err(DefinitionError::BadPcode('B')));
        assert_eq!(reg.define_with("C3", "-10q"), Err(DefinitionError::BadPcode('-')));
        assert_eq!(reg.define_with("C4", "d?d?d"), Err(DefinitionError::InvalidParamSpec));
        assert!(matches!(
            reg.define_with("C5", "0s"),
            Err(DefinitionError::BadLength { .. })
        ));
        assert!(matches!(
            reg.define_with("C6", "64s"),
            Err(DefinitionError::BadLength { length: Some(64), max: 63 })
        ));
    }

    #[test]
    fn test_failed_definition_stays_registered() {
        let mut reg = Registry::new(64);

        assert_eq!(reg.define_with("CO1", "d ? d"), Ok(2));
        assert!(reg.define_with("CO2", "d ? d ? d").is_err());
        assert_eq!(reg.define_with("CO3", "d ? ddd"), Ok(4));

        let co2 = reg.find("co2").unwrap();
        assert_eq!(co2.index(), 1);
        assert_eq!(reg[co2].params(), &[ParamSpec::Int, ParamSpec::Int]);
        assert_eq!(reg.find("CO3").map(CommandId::index), Some(2));
    }

    #[test]
    fn test_lengths_and_defaults() {
        let mut reg = Registry::new(16);

        assert_eq!(reg.define_with("S", "3s q 12q 7d"), Ok(4));
        let cmd = &reg[reg.find("s").unwrap()];
        assert_eq!(
            cmd.params(),
            &[
                ParamSpec::Str(3),
                ParamSpec::QuotedStr(15),
                ParamSpec::QuotedStr(12),
                ParamSpec::Int,
            ]
        );
        assert_eq!(cmd.optional_start(), None);
    }

    #[test]
    fn test_optional_marker_position() {
        let mut reg = Registry::new(64);

        assert_eq!(reg.define_with("C2", "d d ?s"), Ok(3));
        let cmd = &reg[reg.find("C2").unwrap()];
        assert_eq!(cmd.optional_start(), Some(2));
        assert_eq!(cmd.required_count(), 2);
    }

    #[test]
    fn test_incremental_builders() {
        let mut reg = Registry::new(32);

        assert_eq!(reg.add_int(), Err(DefinitionError::NoCommand));
        reg.optional_from_here();

        let id = reg.define("MOVE").unwrap();
        reg.add_bool().unwrap();
        reg.add_byte().unwrap();
        reg.optional_from_here();
        reg.add_float().unwrap();
        reg.optional_from_here();
        reg.add_str(8).unwrap();
        assert!(reg.add_qstr(32).is_err());
        assert!(reg.add_str(0).is_err());
        reg.add_qstr(31).unwrap();

        let cmd = &reg[id];
        assert_eq!(cmd.params().len(), 5);
        assert_eq!(cmd.optional_start(), Some(2));
        assert_eq!(cmd.to_string(), "MOVE b c ? f 8s 31q");
    }

    #[test]
    fn test_find_first_match_in_order() {
        let mut reg = Registry::default();
        reg.define("alpha").unwrap();
        reg.define("beta").unwrap();

        assert_eq!(reg.find("BETA").map(CommandId::index), Some(1));
        assert_eq!(reg.find_bytes(b"Alpha").map(CommandId::index), Some(0));
        assert_eq!(reg.find("gamma"), None);
        assert_eq!(reg.iter().count(), 2);
    }

    #[test]
    fn test_tiny_capacity_falls_back() {
        let reg = Registry::new(1);
        assert_eq!(reg.max_param_len(), DEFAULT_BUFFER_CAPACITY - 1);
    }
}
