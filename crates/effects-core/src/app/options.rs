//! ContextOptions - コンテキストの設定
//!
//! Deserializable so hosts can keep it next to the rest of their config.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Options applied when a top-level [`RealContext`](crate::impls::RealContext)
/// is created.
///
/// ```json
/// { "timeout_ms": 5000, "values": { "request_id": "r-42" } }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextOptions {
    /// Deadline relative to context creation. `None` means no deadline.
    pub timeout_ms: Option<u64>,

    /// Scoped values readable through `Context::value`.
    pub values: HashMap<String, Value>,
}

impl ContextOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_partial_json() {
        let opts = ContextOptions::from_json(r#"{ "timeout_ms": 250 }"#).unwrap();
        assert_eq!(opts.timeout(), Some(Duration::from_millis(250)));
        assert!(opts.values.is_empty());

        let opts = ContextOptions::from_json("{}").unwrap();
        assert_eq!(opts, ContextOptions::default());
    }

    #[test]
    fn builder_methods() {
        let opts = ContextOptions::new()
            .with_timeout(Duration::from_secs(2))
            .with_value("request_id", "r-42");
        assert_eq!(opts.timeout_ms, Some(2000));
        assert_eq!(opts.values["request_id"], "r-42");
    }

    #[test]
    fn huge_timeout_saturates() {
        let opts = ContextOptions::new().with_timeout(Duration::MAX);
        assert_eq!(opts.timeout_ms, Some(u64::MAX));
    }

    #[test]
    fn rejects_wrong_types() {
        assert!(ContextOptions::from_json(r#"{ "timeout_ms": "soon" }"#).is_err());
    }
}
