use std::any::Any;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};

/// Value type for event fields and metadata.
pub type Value = serde_json::Value;

/// Ordered map of field names to values.
///
/// Values may be nested objects; dotted paths address into them (see
/// [`Event::lookup`]).
pub type Fields = serde_json::Map<String, Value>;

/// Opaque per-event correlation data carried for ack reporting.
///
/// The pipeline never inspects this value; it hands it back verbatim to the
/// producer's ack callback once the event is confirmed.
pub type AckTag = Arc<dyn Any + Send + Sync>;

/// Path prefix addressing the metadata map instead of the fields map.
const METADATA_PREFIX: &str = "@metadata.";

/// Path resolving to the event timestamp in RFC 3339 form.
const TIMESTAMP_KEY: &str = "@timestamp";

/// A timestamped structured record moving through the pipeline.
///
/// Events are immutable once enqueued: publishing transfers ownership into
/// the queue entry, so no reference remains through which a producer could
/// mutate them. The optional [`AckTag`] travels alongside the event purely
/// for ack correlation.
#[derive(Clone)]
pub struct Event {
    /// Event timestamp; the only field the pipeline itself requires.
    pub timestamp: DateTime<Utc>,
    /// Structured event payload.
    pub fields: Fields,
    /// Out-of-band metadata, addressable in templates via `@metadata.`.
    pub metadata: Fields,
    /// Opaque correlation data returned through ack callbacks.
    pub private: Option<AckTag>,
}

impl Event {
    /// Creates an empty event with the given timestamp.
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            fields: Fields::new(),
            metadata: Fields::new(),
            private: None,
        }
    }

    /// Creates an event with the given timestamp and fields.
    pub fn with_fields(timestamp: DateTime<Utc>, fields: Fields) -> Self {
        Self {
            timestamp,
            fields,
            metadata: Fields::new(),
            private: None,
        }
    }

    /// Attaches ack correlation data and returns the modified event.
    pub fn with_private(mut self, tag: AckTag) -> Self {
        self.private = Some(tag);
        self
    }

    /// Resolves a dotted field path against this event.
    ///
    /// Paths starting with `@metadata.` address the metadata map; all other
    /// paths address the fields map. A path segment first matches a literal
    /// key (so flat keys containing dots keep working), then descends into
    /// nested objects segment by segment.
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        if let Some(rest) = path.strip_prefix(METADATA_PREFIX) {
            return lookup_in(&self.metadata, rest);
        }

        lookup_in(&self.fields, path)
    }

    /// Resolves a field path to its string rendering.
    ///
    /// `@timestamp` renders the event timestamp in RFC 3339 form. Scalar
    /// values render naturally (strings unquoted); arrays, objects, and
    /// null resolve to [`None`] since they have no usable destination
    /// rendering.
    pub fn resolve_string(&self, path: &str) -> Option<String> {
        if path == TIMESTAMP_KEY {
            return Some(self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true));
        }

        match self.lookup(path)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }
}

/// Resolves a dotted path inside a field map.
fn lookup_in<'a>(fields: &'a Fields, path: &str) -> Option<&'a Value> {
    if let Some(value) = fields.get(path) {
        return Some(value);
    }

    let (head, rest) = path.split_once('.')?;
    let mut current = fields.get(head)?;
    for segment in rest.split('.') {
        current = current.as_object()?.get(segment)?;
    }

    Some(current)
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("timestamp", &self.timestamp)
            .field("fields", &self.fields)
            .field("metadata", &self.metadata)
            .field("private", &self.private.as_ref().map(|_| "<opaque>"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event_with(fields: Value) -> Event {
        let Value::Object(fields) = fields else {
            panic!("fixture fields must be an object");
        };

        Event::with_fields(Utc::now(), fields)
    }

    #[test]
    fn looks_up_flat_and_nested_paths() {
        let event = event_with(json!({
            "service": "api",
            "log": {"level": "error", "origin": {"file": "main.rs"}},
            "k8s.pod": "web-0",
        }));

        assert_eq!(event.lookup("service"), Some(&json!("api")));
        assert_eq!(event.lookup("log.level"), Some(&json!("error")));
        assert_eq!(event.lookup("log.origin.file"), Some(&json!("main.rs")));
        // Literal keys containing dots win over nested descent.
        assert_eq!(event.lookup("k8s.pod"), Some(&json!("web-0")));
        assert_eq!(event.lookup("missing.path"), None);
    }

    #[test]
    fn metadata_prefix_addresses_metadata_map() {
        let mut event = event_with(json!({"beat": "fields"}));
        event
            .metadata
            .insert("raw_index".to_string(), json!("logs-7"));

        assert_eq!(event.lookup("@metadata.raw_index"), Some(&json!("logs-7")));
        assert_eq!(event.lookup("@metadata.beat"), None);
    }

    #[test]
    fn resolves_scalars_to_strings() {
        let event = event_with(json!({
            "code": 404,
            "ok": false,
            "name": "reader",
            "tags": ["a", "b"],
        }));

        assert_eq!(event.resolve_string("code").as_deref(), Some("404"));
        assert_eq!(event.resolve_string("ok").as_deref(), Some("false"));
        assert_eq!(event.resolve_string("name").as_deref(), Some("reader"));
        assert_eq!(event.resolve_string("tags"), None);
    }

    #[test]
    fn resolves_timestamp_key() {
        let timestamp = DateTime::parse_from_rfc3339("2024-05-01T12:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let event = Event::new(timestamp);

        assert_eq!(
            event.resolve_string("@timestamp").as_deref(),
            Some("2024-05-01T12:30:00.000Z")
        );
    }
}
