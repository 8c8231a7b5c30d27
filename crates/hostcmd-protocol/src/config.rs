//! Parser configuration

use std::time::Duration;

use hostcmd_core::DEFAULT_BUFFER_CAPACITY;
use serde::{Deserialize, Serialize};

/// Parser settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Token buffer size in bytes. Values below 2 fall back to the default.
    pub buffer_capacity: usize,
    /// Echo diagnostics back to the host
    pub interactive: bool,
    /// Prompt written after every diagnostic in interactive mode
    pub prompt: Option<String>,
    /// Treat `\` as an escape for the next byte
    pub escapes: bool,
    /// Upper bound for a single scan call, in milliseconds. Zero means no limit.
    pub time_budget_ms: Option<u64>,
}

impl ParserConfig {
    pub fn new(buffer_capacity: usize) -> Self {
        Self {
            buffer_capacity,
            ..Self::default()
        }
    }

    pub fn interactive(mut self, prompt: Option<&str>) -> Self {
        self.interactive = true;
        self.prompt = prompt.map(str::to_owned);
        self
    }

    pub fn escapes(mut self, enabled: bool) -> Self {
        self.escapes = enabled;
        self
    }

    pub fn time_budget(mut self, budget: Option<Duration>) -> Self {
        self.time_budget_ms = budget_ms(budget);
        self
    }

    /// Buffer capacity actually used
    pub fn effective_capacity(&self) -> usize {
        if self.buffer_capacity < 2 {
            DEFAULT_BUFFER_CAPACITY
        } else {
            self.buffer_capacity
        }
    }

    /// Effective scan budget, `None` when unlimited
    pub fn budget(&self) -> Option<Duration> {
        self.time_budget_ms
            .filter(|&ms| ms > 0)
            .map(Duration::from_millis)
    }
}

pub(crate) fn budget_ms(budget: Option<Duration>) -> Option<u64> {
    budget
        .map(|d| d.as_millis() as u64)
        .filter(|&ms| ms > 0)
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            interactive: false,
            prompt: None,
            escapes: true,
            time_budget_ms: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ParserConfig::default();
        assert_eq!(config.effective_capacity(), 64);
        assert!(config.escapes);
        assert!(!config.interactive);
        assert_eq!(config.budget(), None);
    }

    #[test]
    fn test_small_capacity_falls_back() {
        assert_eq!(ParserConfig::new(1).effective_capacity(), DEFAULT_BUFFER_CAPACITY);
        assert_eq!(ParserConfig::new(2).effective_capacity(), 2);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: ParserConfig =
            serde_json::from_str(r#"{"interactive": true, "prompt": "> ", "time_budget_ms": 20}"#)
                .unwrap();

        assert!(config.interactive);
        assert_eq!(config.prompt.as_deref(), Some("> "));
        assert_eq!(config.budget(), Some(Duration::from_millis(20)));
        assert_eq!(config.buffer_capacity, 64);
    }

    #[test]
    fn test_zero_budget_is_unlimited() {
        let config: ParserConfig = serde_json::from_str(r#"{"time_budget_ms": 0}"#).unwrap();
        assert_eq!(config.budget(), None);

        let config = ParserConfig::default().time_budget(Some(Duration::ZERO));
        assert_eq!(config.time_budget_ms, None);
        assert_eq!(config.budget(), None);
    }
}
