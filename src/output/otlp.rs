//! OTLP-style JSON schema for exported traces.
//!
//! The layout is the one Tempo accepts for trace upload: batches of
//! resource-scoped spans grouped by instrumentation library.

use crate::trace::{AttributeValue, KeyValue, Span, SpanId, SpanKind, SpanStatus, TraceId};
use crate::utils::config::{SERVICE_ENVIRONMENT, SERVICE_NAME, SERVICE_VERSION};
use crate::utils::error::TraceError;
use chrono::DateTime;
use serde::{Deserialize, Serialize};

/// Top-level export document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OtlpTrace {
    pub batches: Vec<OtlpBatch>,
}

/// Spans produced by one resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtlpBatch {
    pub resource: OtlpResource,
    pub instrumentation_library_spans: Vec<OtlpInstrumentationLibrarySpans>,
}

/// Resource attributes (service identity)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtlpResource {
    pub attributes: Vec<OtlpAttribute>,
    #[serde(default)]
    pub dropped_attributes_count: u32,
}

/// Spans grouped under the library that produced them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtlpInstrumentationLibrarySpans {
    pub instrumentation_library: OtlpInstrumentationLibrary,
    pub spans: Vec<OtlpSpan>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OtlpInstrumentationLibrary {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
}

/// One exported span
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtlpSpan {
    pub trace_id: String,
    pub span_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_span_id: Option<String>,
    #[serde(default)]
    pub trace_state: String,
    pub name: String,
    pub kind: String,
    pub start_time_unix_nano: i64,
    pub end_time_unix_nano: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<OtlpAttribute>,
    #[serde(default)]
    pub dropped_attributes_count: u32,
    #[serde(default)]
    pub dropped_events_count: u32,
    #[serde(default)]
    pub dropped_links_count: u32,
    pub status: OtlpStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OtlpAttribute {
    pub key: String,
    pub value: OtlpValue,
}

/// Attribute value; exactly one field is set
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtlpValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub string_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub int_value: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_value")]
    pub double_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bool_value: Option<bool>,
}

/// `doubleValue` as proto3 JSON writes it: a number, or one of the strings
/// `"NaN"`, `"Infinity"`, `"-Infinity"` for values JSON numbers cannot hold
mod double_value {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            None => serializer.serialize_none(),
            Some(v) if v.is_nan() => serializer.serialize_some("NaN"),
            Some(v) if *v == f64::INFINITY => serializer.serialize_some("Infinity"),
            Some(v) if *v == f64::NEG_INFINITY => serializer.serialize_some("-Infinity"),
            Some(v) => serializer.serialize_some(v),
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
        match Option::<Raw>::deserialize(deserializer)? {
            None => Ok(None),
            Some(Raw::Number(v)) => Ok(Some(v)),
            Some(Raw::Text(text)) => match text.as_str() {
                "NaN" => Ok(Some(f64::NAN)),
                "Infinity" => Ok(Some(f64::INFINITY)),
                "-Infinity" => Ok(Some(f64::NEG_INFINITY)),
                other => Err(D::Error::custom(format!("invalid doubleValue {:?}", other))),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OtlpStatus {
    pub code: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl OtlpTrace {
    /// Wrap spans in a single resource batch with the service identity
    pub fn from_spans(spans: &[Span]) -> Self {
        let resource = OtlpResource {
            attributes: vec![
                OtlpAttribute::from(&KeyValue::new("service.name", SERVICE_NAME)),
                OtlpAttribute::from(&KeyValue::new("service.version", SERVICE_VERSION)),
                OtlpAttribute::from(&KeyValue::new("environment", SERVICE_ENVIRONMENT)),
            ],
            dropped_attributes_count: 0,
        };

        Self {
            batches: vec![OtlpBatch {
                resource,
                instrumentation_library_spans: vec![OtlpInstrumentationLibrarySpans {
                    instrumentation_library: OtlpInstrumentationLibrary {
                        name: SERVICE_NAME.to_string(),
                        version: SERVICE_VERSION.to_string(),
                    },
                    spans: spans.iter().map(OtlpSpan::from).collect(),
                }],
            }],
        }
    }

    /// Every span in document order
    pub fn spans(&self) -> impl Iterator<Item = &OtlpSpan> {
        self.batches
            .iter()
            .flat_map(|batch| &batch.instrumentation_library_spans)
            .flat_map(|group| &group.spans)
    }

    /// Rebuild the span records held by this document
    pub fn to_spans(&self) -> Result<Vec<Span>, TraceError> {
        self.spans().map(Span::try_from).collect()
    }
}

impl From<&Span> for OtlpSpan {
    fn from(span: &Span) -> Self {
        Self {
            trace_id: span.trace_id.to_hex(),
            span_id: span.span_id.to_hex(),
            parent_span_id: span
                .parent_span_id
                .filter(SpanId::is_valid)
                .map(|id| id.to_hex()),
            trace_state: String::new(),
            name: span.name.clone(),
            kind: span.kind.as_otlp_str().to_string(),
            start_time_unix_nano: span.start_time.timestamp_nanos_opt().unwrap_or(i64::MAX),
            end_time_unix_nano: span.end_time.timestamp_nanos_opt().unwrap_or(i64::MAX),
            attributes: span.attributes.iter().map(OtlpAttribute::from).collect(),
            dropped_attributes_count: 0,
            dropped_events_count: 0,
            dropped_links_count: 0,
            status: OtlpStatus {
                code: span.status.code(),
                message: span.status.message().map(str::to_string),
            },
        }
    }
}

impl TryFrom<&OtlpSpan> for Span {
    type Error = TraceError;

    fn try_from(span: &OtlpSpan) -> Result<Self, Self::Error> {
        Ok(Span {
            trace_id: TraceId::from_hex(&span.trace_id)?,
            span_id: SpanId::from_hex(&span.span_id)?,
            parent_span_id: span
                .parent_span_id
                .as_deref()
                .map(SpanId::from_hex)
                .transpose()?,
            name: span.name.clone(),
            kind: SpanKind::from_otlp_str(&span.kind)?,
            start_time: DateTime::from_timestamp_nanos(span.start_time_unix_nano),
            end_time: DateTime::from_timestamp_nanos(span.end_time_unix_nano),
            attributes: span
                .attributes
                .iter()
                .map(KeyValue::try_from)
                .collect::<Result<_, _>>()?,
            status: SpanStatus::from_code(span.status.code, span.status.message.clone()),
        })
    }
}

impl From<&KeyValue> for OtlpAttribute {
    fn from(kv: &KeyValue) -> Self {
        let mut value = OtlpValue::default();
        match &kv.value {
            AttributeValue::String(v) => value.string_value = Some(v.clone()),
            AttributeValue::Int(v) => value.int_value = Some(*v),
            AttributeValue::Float(v) => value.double_value = Some(*v),
            AttributeValue::Bool(v) => value.bool_value = Some(*v),
        }
        Self {
            key: kv.key.clone(),
            value,
        }
    }
}

impl TryFrom<&OtlpAttribute> for KeyValue {
    type Error = TraceError;

    fn try_from(attr: &OtlpAttribute) -> Result<Self, Self::Error> {
        let value = match &attr.value {
            OtlpValue {
                string_value: Some(v),
                ..
            } => AttributeValue::String(v.clone()),
            OtlpValue {
                int_value: Some(v), ..
            } => AttributeValue::Int(*v),
            OtlpValue {
                double_value: Some(v),
                ..
            } => AttributeValue::Float(*v),
            OtlpValue {
                bool_value: Some(v),
                ..
            } => AttributeValue::Bool(*v),
            _ => return Err(TraceError::EmptyAttribute(attr.key.clone())),
        };
        Ok(KeyValue {
            key: attr.key.clone(),
            value,
        })
    }
}
