use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::types::{AckTag, Event, Value};

/// Fixed timestamp for fixtures that must render deterministically.
pub fn fixed_timestamp() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
        .expect("fixture timestamp is valid")
        .with_timezone(&Utc)
}

/// Builds an event from a JSON object literal of fields.
///
/// # Panics
///
/// Panics if `fields` is not a JSON object; fixtures are always objects.
pub fn event_with_fields(fields: Value) -> Event {
    let Value::Object(fields) = fields else {
        panic!("fixture fields must be a JSON object");
    };

    Event::with_fields(fixed_timestamp(), fields)
}

/// Builds an empty event carrying a string correlation tag.
pub fn tagged_event(tag: &str) -> Event {
    Event::new(fixed_timestamp()).with_private(Arc::new(tag.to_string()))
}

/// Extracts the string form of a correlation tag attached by
/// [`tagged_event`].
pub fn tag_string(tag: &Option<AckTag>) -> Option<String> {
    tag.as_ref()
        .and_then(|tag| tag.downcast_ref::<String>().cloned())
}
