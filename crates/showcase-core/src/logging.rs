//! Log level model for `logging/setLevel` and `notifications/message`
//!
//! Levels follow the syslog ordering used by MCP. A message is delivered to
//! a session iff its level is at or above the session's current threshold.

use serde::{Deserialize, Serialize};

/// Totally ordered log severity, lowest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Notice,
    Warning,
    Error,
    Critical,
    Alert,
    Emergency,
}

impl LogLevel {
    /// All levels in ascending severity order
    pub const ALL: [LogLevel; 8] = [
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Notice,
        LogLevel::Warning,
        LogLevel::Error,
        LogLevel::Critical,
        LogLevel::Alert,
        LogLevel::Emergency,
    ];

    /// Whether a message of `level` passes this threshold
    pub fn admits(self, level: LogLevel) -> bool {
        level >= self
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Notice => "notice",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
            LogLevel::Critical => "critical",
            LogLevel::Alert => "alert",
            LogLevel::Emergency => "emergency",
        }
    }
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Debug
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One demo message per level, emitted by the diagnostic log ticker
pub const DEMO_MESSAGES: [(LogLevel, &str); 8] = [
    (LogLevel::Debug, "Debug-level message"),
    (LogLevel::Info, "Info-level message"),
    (LogLevel::Notice, "Notice-level message"),
    (LogLevel::Warning, "Warning-level message"),
    (LogLevel::Error, "Error-level message"),
    (LogLevel::Critical, "Critical-level message"),
    (LogLevel::Alert, "Alert-level message"),
    (LogLevel::Emergency, "Emergency-level message"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ordering() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Warning < LogLevel::Error);
        assert!(LogLevel::Alert < LogLevel::Emergency);
    }

    #[test]
    fn test_threshold_admits() {
        let threshold = LogLevel::Warning;
        assert!(threshold.admits(LogLevel::Warning));
        assert!(threshold.admits(LogLevel::Emergency));
        assert!(!threshold.admits(LogLevel::Info));
        assert!(!threshold.admits(LogLevel::Debug));
    }

    #[test]
    fn test_debug_threshold_admits_everything() {
        for (level, _) in DEMO_MESSAGES {
            assert!(LogLevel::Debug.admits(level));
        }
    }

    #[test]
    fn test_wire_format_is_lowercase() {
        let json = serde_json::to_string(&LogLevel::Emergency).unwrap();
        assert_eq!(json, "\"emergency\"");

        let level: LogLevel = serde_json::from_str("\"notice\"").unwrap();
        assert_eq!(level, LogLevel::Notice);
    }

    #[test]
    fn test_unknown_level_is_rejected() {
        assert!(serde_json::from_str::<LogLevel>("\"verbose\"").is_err());
    }
}
