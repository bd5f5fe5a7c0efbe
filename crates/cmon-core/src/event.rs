//! Monitoring event model
//!
//! Hosts hand the engine plain detail structs; the engine never sees framework
//! objects. Each detail is flattened into an insertion-ordered field map whose
//! key order is fixed per kind, so identical events serialize to identical
//! bytes and land on the same spool file.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Ordered field mapping carried by an event.
///
/// `serde_json` is built with `preserve_order`, so iteration and serialization
/// follow insertion order.
pub type EventFields = Map<String, Value>;

/// Kind of monitoring event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// An application error, caught or uncaught
    Exception,
    /// A deprecation notice
    Deprecation,
}

impl EventKind {
    /// All recognised kinds
    pub const ALL: [EventKind; 2] = [EventKind::Exception, EventKind::Deprecation];

    /// Wire name, used both in spool file names and endpoint paths
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Exception => "exception",
            EventKind::Deprecation => "deprecation",
        }
    }

    /// Parse a wire name; anything unrecognised yields `None`
    pub fn parse(value: &str) -> Option<EventKind> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == value)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Details of an application error, as extracted by the host
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionDetail {
    /// Error message
    pub message: String,
    /// Rendered error text (message, trace, request or command context)
    pub contents: String,
    /// Whether application code already handled the error
    pub caught: bool,
    /// Source file, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// Source line, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    /// Identifier of the user active when the error occurred
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Host correlation token (profiler or trace id)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl ExceptionDetail {
    /// Minimal detail: message, rendered contents, caught flag
    pub fn new(message: impl Into<String>, contents: impl Into<String>, caught: bool) -> Self {
        Self {
            message: message.into(),
            contents: contents.into(),
            caught,
            ..Default::default()
        }
    }

    /// Attach the source location
    pub fn at(mut self, file: impl Into<String>, line: u32) -> Self {
        self.file = Some(file.into());
        self.line = Some(line);
        self
    }

    /// Attach the active user identifier
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Attach a host correlation token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

/// Details of a deprecation notice
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeprecationDetail {
    /// File that triggered the notice
    pub file: String,
    /// Line that triggered the notice
    pub line: u32,
    /// Deprecation message
    pub message: String,
    /// Rendered notice text
    pub contents: String,
}

impl DeprecationDetail {
    pub fn new(
        file: impl Into<String>,
        line: u32,
        message: impl Into<String>,
        contents: impl Into<String>,
    ) -> Self {
        Self {
            file: file.into(),
            line,
            message: message.into(),
            contents: contents.into(),
        }
    }
}

/// A kind plus its canonical field map: the unit the engine delivers or spools
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryEvent {
    pub kind: EventKind,
    pub fields: EventFields,
}

impl DeliveryEvent {
    /// Build an exception event.
    ///
    /// Field order: `file`, `line`, `user`, `message`, `contents`, `caught`,
    /// `token`. Unknown optional values are left out rather than sent as null.
    pub fn exception(detail: &ExceptionDetail) -> Self {
        let mut fields = EventFields::new();
        if let Some(file) = &detail.file {
            fields.insert("file".into(), Value::from(file.as_str()));
        }
        if let Some(line) = detail.line {
            fields.insert("line".into(), Value::from(line));
        }
        if let Some(user) = &detail.user {
            fields.insert("user".into(), Value::from(user.as_str()));
        }
        fields.insert("message".into(), Value::from(detail.message.as_str()));
        fields.insert("contents".into(), Value::from(detail.contents.as_str()));
        fields.insert("caught".into(), Value::Bool(detail.caught));
        if let Some(token) = &detail.token {
            fields.insert("token".into(), Value::from(token.as_str()));
        }

        Self {
            kind: EventKind::Exception,
            fields,
        }
    }

    /// Build a deprecation event with fields `file`, `line`, `message`, `contents`.
    pub fn deprecation(detail: &DeprecationDetail) -> Self {
        let mut fields = EventFields::new();
        fields.insert("file".into(), Value::from(detail.file.as_str()));
        fields.insert("line".into(), Value::from(detail.line));
        fields.insert("message".into(), Value::from(detail.message.as_str()));
        fields.insert("contents".into(), Value::from(detail.contents.as_str()));

        Self {
            kind: EventKind::Deprecation,
            fields,
        }
    }
}
