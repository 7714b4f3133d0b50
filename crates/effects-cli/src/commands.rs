//! Commands used by the demo workflow.

use chrono::{DateTime, Utc};
use effects_core::Command;

/// Reads the clock.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Now {
    pub time: Option<DateTime<Utc>>,
}

impl Command for Now {}

/// HTTP GET. `status` and `body` are filled in by the interpreter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Get {
    pub url: String,
    pub status: Option<u16>,
    pub body: String,
}

impl Get {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }
}

impl Command for Get {}
