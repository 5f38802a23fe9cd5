//! Span data model.
//!
//! A `Span` is the immutable record of one completed unit of work. Spans that
//! share a `TraceId` form a trace; traces are never stored as such, they are
//! grouped on demand by the analyzer.

use crate::utils::error::TraceError;
use chrono::{DateTime, Utc};
use rand::Rng;
use std::fmt;
use std::time::Duration;

macro_rules! hex_id {
    ($(#[$meta:meta])* $name:ident, $len:expr, $kind:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name([u8; $len]);

        impl $name {
            /// All-zero id, never produced by `random`
            pub const INVALID: Self = Self([0; $len]);

            pub fn from_bytes(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }

            /// Generate a fresh non-zero id
            pub fn random() -> Self {
                let mut rng = rand::thread_rng();
                loop {
                    let bytes: [u8; $len] = rng.gen();
                    if bytes != [0; $len] {
                        return Self(bytes);
                    }
                }
            }

            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            pub fn is_valid(&self) -> bool {
                *self != Self::INVALID
            }

            /// Fixed-width lowercase hex
            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }

            pub fn from_hex(value: &str) -> Result<Self, TraceError> {
                let invalid = || TraceError::InvalidId {
                    kind: $kind,
                    value: value.to_string(),
                };
                let bytes = hex::decode(value).map_err(|_| invalid())?;
                let bytes: [u8; $len] = bytes.try_into().map_err(|_| invalid())?;
                Ok(Self(bytes))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.to_hex())
            }
        }
    };
}

hex_id!(
    /// 16-byte trace identifier
    TraceId,
    16,
    "trace"
);

hex_id!(
    /// 8-byte span identifier
    SpanId,
    8,
    "span"
);

/// Identity of a span within its trace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpanContext {
    pub trace_id: TraceId,
    pub span_id: SpanId,
}

/// Role of a span in the request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpanKind {
    #[default]
    Unspecified,
    Internal,
    Server,
    Client,
    Producer,
    Consumer,
}

impl SpanKind {
    /// OTLP JSON enum name
    pub fn as_otlp_str(&self) -> &'static str {
        match self {
            SpanKind::Unspecified => "SPAN_KIND_UNSPECIFIED",
            SpanKind::Internal => "SPAN_KIND_INTERNAL",
            SpanKind::Server => "SPAN_KIND_SERVER",
            SpanKind::Client => "SPAN_KIND_CLIENT",
            SpanKind::Producer => "SPAN_KIND_PRODUCER",
            SpanKind::Consumer => "SPAN_KIND_CONSUMER",
        }
    }

    pub fn from_otlp_str(value: &str) -> Result<Self, TraceError> {
        match value {
            "SPAN_KIND_UNSPECIFIED" => Ok(SpanKind::Unspecified),
            "SPAN_KIND_INTERNAL" => Ok(SpanKind::Internal),
            "SPAN_KIND_SERVER" => Ok(SpanKind::Server),
            "SPAN_KIND_CLIENT" => Ok(SpanKind::Client),
            "SPAN_KIND_PRODUCER" => Ok(SpanKind::Producer),
            "SPAN_KIND_CONSUMER" => Ok(SpanKind::Consumer),
            other => Err(TraceError::UnknownKind(other.to_string())),
        }
    }
}

/// Outcome recorded on a span
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SpanStatus {
    #[default]
    Unset,
    Ok,
    Error(String),
}

impl SpanStatus {
    /// Numeric code: 0 = unset, 1 = ok, 2 = error
    pub fn code(&self) -> u8 {
        match self {
            SpanStatus::Unset => 0,
            SpanStatus::Ok => 1,
            SpanStatus::Error(_) => 2,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            SpanStatus::Error(message) if !message.is_empty() => Some(message),
            _ => None,
        }
    }

    /// Rebuild from an exported code; unknown codes read as unset
    pub fn from_code(code: u8, message: Option<String>) -> Self {
        match code {
            1 => SpanStatus::Ok,
            2 => SpanStatus::Error(message.unwrap_or_default()),
            _ => SpanStatus::Unset,
        }
    }
}

/// Typed attribute value
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::String(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Int(value)
    }
}

impl From<usize> for AttributeValue {
    fn from(value: usize) -> Self {
        AttributeValue::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Float(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

/// Attribute key/value pair
#[derive(Debug, Clone, PartialEq)]
pub struct KeyValue {
    pub key: String,
    pub value: AttributeValue,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A completed span
#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub trace_id: TraceId,
    pub span_id: SpanId,
    pub parent_span_id: Option<SpanId>,
    pub name: String,
    pub kind: SpanKind,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub attributes: Vec<KeyValue>,
    pub status: SpanStatus,
}

impl Span {
    pub fn context(&self) -> SpanContext {
        SpanContext {
            trace_id: self.trace_id,
            span_id: self.span_id,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_span_id.is_none()
    }

    /// Elapsed time between start and end; zero if the clock went backwards
    pub fn duration(&self) -> Duration {
        (self.end_time - self.start_time)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes
            .iter()
            .find(|kv| kv.key == key)
            .map(|kv| &kv.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_ids_are_valid() {
        assert!(TraceId::random().is_valid());
        assert!(SpanId::random().is_valid());
        assert!(!TraceId::INVALID.is_valid());
    }

    #[test]
    fn test_id_hex_is_fixed_width() {
        let trace_id = TraceId::from_bytes([0x01; 16]);
        let span_id = SpanId::from_bytes([0, 0, 0, 0, 0, 0, 0, 0x0a]);

        assert_eq!(trace_id.to_hex(), "01".repeat(16));
        assert_eq!(span_id.to_hex(), "000000000000000a");
        assert_eq!(SpanId::from_hex("000000000000000a").unwrap(), span_id);
    }

    #[test]
    fn test_id_from_hex_rejects_wrong_length() {
        assert!(TraceId::from_hex("abcd").is_err());
        assert!(SpanId::from_hex("zzzzzzzzzzzzzzzz").is_err());
    }

    #[test]
    fn test_span_kind_names() {
        for kind in [
            SpanKind::Unspecified,
            SpanKind::Internal,
            SpanKind::Server,
            SpanKind::Client,
            SpanKind::Producer,
            SpanKind::Consumer,
        ] {
            assert_eq!(SpanKind::from_otlp_str(kind.as_otlp_str()).unwrap(), kind);
        }
        assert!(SpanKind::from_otlp_str("SPAN_KIND_BOGUS").is_err());
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(SpanStatus::Unset.code(), 0);
        assert_eq!(SpanStatus::Ok.code(), 1);
        assert_eq!(SpanStatus::Error("boom".to_string()).code(), 2);
        assert_eq!(SpanStatus::Error(String::new()).message(), None);
        assert_eq!(SpanStatus::from_code(7, None), SpanStatus::Unset);
    }

    #[test]
    fn test_negative_duration_clamps_to_zero() {
        let now = Utc::now();
        let span = Span {
            trace_id: TraceId::random(),
            span_id: SpanId::random(),
            parent_span_id: None,
            name: "backwards".to_string(),
            kind: SpanKind::Internal,
            start_time: now,
            end_time: now - chrono::Duration::milliseconds(5),
            attributes: Vec::new(),
            status: SpanStatus::Unset,
        };

        assert_eq!(span.duration(), Duration::ZERO);
    }
}
