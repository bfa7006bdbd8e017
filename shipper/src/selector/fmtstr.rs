use std::fmt::Write as _;

use crate::error::{ErrorKind, ShipperResult};
use crate::shipper_error;
use crate::types::Event;

/// One compiled piece of an event-format template.
#[derive(Debug, Clone, PartialEq)]
enum Token {
    /// Verbatim text.
    Literal(String),
    /// Field reference `%{[path]}`, optionally with a per-reference
    /// fallback `%{[path]:fallback}`.
    Field {
        path: String,
        fallback: Option<String>,
    },
    /// Timestamp reference `%{+FORMAT}` rendered from the event timestamp
    /// with a chrono format string, e.g. `%{+%Y.%m.%d}`.
    Timestamp(String),
}

/// A compiled event-format template.
///
/// Templates interpolate event fields into destination names:
///
/// ```text
/// logs-%{[agent.version]}-%{+%Y.%m.%d}
/// ```
///
/// Compilation happens once at configuration time; rendering is
/// allocation-light and safe for unlimited concurrent use. `%%` escapes a
/// literal percent sign.
#[derive(Debug, Clone, PartialEq)]
pub struct EventFormat {
    tokens: Vec<Token>,
}

impl EventFormat {
    /// Compiles a template string.
    ///
    /// Fails with [`ErrorKind::InvalidTemplate`] on syntax errors:
    /// unterminated groups, empty groups, or malformed field references.
    pub fn compile(template: &str) -> ShipperResult<Self> {
        let mut tokens = Vec::new();
        let mut literal = String::new();
        let mut chars = template.chars();

        while let Some(c) = chars.next() {
            if c != '%' {
                literal.push(c);
                continue;
            }

            match chars.next() {
                Some('%') => literal.push('%'),
                Some('{') => {
                    let mut group = String::new();
                    let mut terminated = false;
                    for g in chars.by_ref() {
                        if g == '}' {
                            terminated = true;
                            break;
                        }
                        group.push(g);
                    }

                    if !terminated {
                        return Err(unterminated(template));
                    }

                    if !literal.is_empty() {
                        tokens.push(Token::Literal(std::mem::take(&mut literal)));
                    }
                    tokens.push(parse_group(template, &group)?);
                }
                _ => {
                    return Err(shipper_error!(
                        ErrorKind::InvalidTemplate,
                        "Stray `%` in template",
                        format!("expected `%%` or `%{{...}}` in `{template}`")
                    ));
                }
            }
        }

        if !literal.is_empty() {
            tokens.push(Token::Literal(literal));
        }

        Ok(Self { tokens })
    }

    /// Returns true if rendering does not depend on any event.
    pub fn is_const(&self) -> bool {
        self.tokens
            .iter()
            .all(|token| matches!(token, Token::Literal(_)))
    }

    /// Renders the template against an event.
    ///
    /// A referenced field that is absent (and has no per-reference
    /// fallback) fails with [`ErrorKind::MissingEventField`]; callers
    /// decide whether that degrades to a fallback value.
    pub fn render(&self, event: &Event) -> ShipperResult<String> {
        let mut out = String::new();
        for token in &self.tokens {
            match token {
                Token::Literal(text) => out.push_str(text),
                Token::Field { path, fallback } => {
                    match event.resolve_string(path).or_else(|| fallback.clone()) {
                        Some(value) => out.push_str(&value),
                        None => {
                            return Err(shipper_error!(
                                ErrorKind::MissingEventField,
                                "Event field referenced by template is missing",
                                path.clone()
                            ));
                        }
                    }
                }
                Token::Timestamp(format) => {
                    // chrono's Display for formatted dates cannot fail for
                    // the format strings accepted at compile time.
                    let _ = write!(out, "{}", event.timestamp.format(format));
                }
            }
        }

        Ok(out)
    }

    /// Renders a constant template without an event.
    ///
    /// Only valid when [`EventFormat::is_const`] returns true; used by the
    /// selector builder for compile-time constant folding.
    pub fn render_const(&self) -> ShipperResult<String> {
        if !self.is_const() {
            return Err(shipper_error!(
                ErrorKind::InvalidState,
                "Template references event data and cannot render without an event"
            ));
        }

        let mut out = String::new();
        for token in &self.tokens {
            if let Token::Literal(text) = token {
                out.push_str(text);
            }
        }

        Ok(out)
    }
}

/// Parses the inside of one `%{...}` group.
fn parse_group(template: &str, group: &str) -> ShipperResult<Token> {
    if let Some(format) = group.strip_prefix('+') {
        if format.is_empty() {
            return Err(shipper_error!(
                ErrorKind::InvalidTemplate,
                "Empty timestamp format in template",
                template.to_string()
            ));
        }
        // Validate the chrono format eagerly so malformed specifiers fail
        // at configuration time instead of during publishing.
        let probe = chrono::DateTime::UNIX_EPOCH;
        let mut rendered = String::new();
        if write!(rendered, "{}", probe.format(format)).is_err() {
            return Err(shipper_error!(
                ErrorKind::InvalidTemplate,
                "Invalid timestamp format in template",
                format!("`{format}` in `{template}`")
            ));
        }
        return Ok(Token::Timestamp(format.to_string()));
    }

    let Some(rest) = group.strip_prefix('[') else {
        return Err(shipper_error!(
            ErrorKind::InvalidTemplate,
            "Expected `[field]` or `+format` inside template group",
            format!("`{group}` in `{template}`")
        ));
    };

    let Some((path, after)) = rest.split_once(']') else {
        return Err(unterminated(template));
    };

    if path.is_empty() {
        return Err(shipper_error!(
            ErrorKind::InvalidTemplate,
            "Empty field reference in template",
            template.to_string()
        ));
    }

    let fallback = match after {
        "" => None,
        _ => match after.strip_prefix(':') {
            Some(fallback) => Some(fallback.to_string()),
            None => {
                return Err(shipper_error!(
                    ErrorKind::InvalidTemplate,
                    "Unexpected trailing characters after field reference",
                    format!("`{after}` in `{template}`")
                ));
            }
        },
    };

    Ok(Token::Field {
        path: path.to_string(),
        fallback,
    })
}

fn unterminated(template: &str) -> crate::error::ShipperError {
    shipper_error!(
        ErrorKind::InvalidTemplate,
        "Unterminated group in template",
        template.to_string()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use serde_json::json;

    fn event() -> Event {
        let timestamp = DateTime::parse_from_rfc3339("2024-05-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let mut event = Event::new(timestamp);
        event.fields.insert("user".to_string(), json!("bob"));
        event.fields.insert(
            "agent".to_string(),
            json!({"name": "reader", "version": "8.1.0"}),
        );
        event
    }

    #[test]
    fn renders_literals_and_fields() {
        let format = EventFormat::compile("logs-%{[agent.version]}-out").unwrap();
        assert!(!format.is_const());
        assert_eq!(format.render(&event()).unwrap(), "logs-8.1.0-out");
    }

    #[test]
    fn missing_field_without_fallback_errors() {
        let format = EventFormat::compile("%{[missing]}").unwrap();
        let err = format.render(&event()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingEventField);
    }

    #[test]
    fn per_reference_fallback_fills_missing_field() {
        let format = EventFormat::compile("%{[missing]:anon}").unwrap();
        assert_eq!(format.render(&event()).unwrap(), "anon");

        // The fallback only applies when the field is absent.
        let format = EventFormat::compile("%{[user]:anon}").unwrap();
        assert_eq!(format.render(&event()).unwrap(), "bob");
    }

    #[test]
    fn renders_timestamp_tokens() {
        let format = EventFormat::compile("logs-%{+%Y.%m.%d}").unwrap();
        assert!(!format.is_const());
        assert_eq!(format.render(&event()).unwrap(), "logs-2024.05.01");
    }

    #[test]
    fn escapes_percent_signs() {
        let format = EventFormat::compile("cpu%%-%{[user]}").unwrap();
        assert_eq!(format.render(&event()).unwrap(), "cpu%-bob");
    }

    #[test]
    fn const_templates_render_without_event() {
        let format = EventFormat::compile("plain-name").unwrap();
        assert!(format.is_const());
        assert_eq!(format.render_const().unwrap(), "plain-name");
    }

    #[test]
    fn rejects_malformed_templates() {
        for template in [
            "%{[unterminated",
            "%{unbracketed}",
            "%{}",
            "%{[]}",
            "%{[a]junk}",
            "%{+}",
            "trailing-%",
            "%x",
        ] {
            let err = EventFormat::compile(template).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidTemplate, "{template}");
        }
    }
}
