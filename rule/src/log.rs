//! Per-run log lines.

use rulekit_core::RuleId;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Error,
}

/// One deterministic log line of a run. Never carries timings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunLog {
    pub level: LogLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<RuleId>,
    pub message: String,
}

impl RunLog {
    pub fn info(rule_id: &RuleId, message: impl Into<String>) -> Self {
        Self {
            level: LogLevel::Info,
            rule_id: Some(rule_id.clone()),
            message: message.into(),
        }
    }

    pub fn error(rule_id: &RuleId, message: impl Into<String>) -> Self {
        Self {
            level: LogLevel::Error,
            rule_id: Some(rule_id.clone()),
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == LogLevel::Error
    }
}

impl fmt::Display for RunLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.level {
            LogLevel::Info => "info",
            LogLevel::Error => "error",
        };
        match &self.rule_id {
            Some(id) => write!(f, "[{}] {}: {}", level, id, self.message),
            None => write!(f, "[{}] {}", level, self.message),
        }
    }
}
