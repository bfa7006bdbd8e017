//! Error types and result definitions for shipper operations.
//!
//! Provides an error system with classification and captured diagnostic
//! metadata for publisher pipeline operations. The [`ShipperError`] type
//! supports single errors, errors with additional detail, and multiple
//! aggregated errors for multi-client failure scenarios.

use std::backtrace::Backtrace;
use std::borrow::Cow;
use std::error;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

/// Convenient result type for shipper operations using [`ShipperError`] as the error type.
pub type ShipperResult<T> = Result<T, ShipperError>;

/// Detailed payload stored for single [`ShipperError`] instances.
#[derive(Debug, Clone)]
struct ErrorPayload {
    kind: ErrorKind,
    description: Cow<'static, str>,
    detail: Option<Cow<'static, str>>,
    source: Option<Arc<dyn error::Error + Send + Sync>>,
    location: &'static Location<'static>,
    backtrace: Arc<Backtrace>,
}

/// Main error type for shipper operations.
///
/// [`ShipperError`] can represent a single classified error, optionally
/// enriched with dynamic detail and a source error, or multiple aggregated
/// errors collected while shutting down several clients at once.
#[derive(Debug, Clone)]
pub struct ShipperError {
    repr: ErrorRepr,
}

/// Internal representation of error data.
#[derive(Debug, Clone)]
enum ErrorRepr {
    /// Single error payload holding rich metadata.
    Single(ErrorPayload),
    /// Multiple aggregated errors.
    ///
    /// This variant is mainly useful to capture failures from several
    /// clients during pipeline shutdown.
    Many {
        errors: Vec<ShipperError>,
        location: &'static Location<'static>,
    },
}

/// Specific categories of errors that can occur during shipper operations.
///
/// Error kinds are organized by functional area so callers can distinguish
/// construction-time configuration problems from runtime admission
/// rejections.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // Configuration errors, surfaced at construction time.
    ConfigError,
    InvalidTemplate,
    InvalidCondition,

    // Routing errors.
    MissingEventField,

    // Admission errors.
    ClientClosed,
    PipelineClosed,
    QueueRejected,

    // State errors.
    InvalidState,

    // Unknown / uncategorized.
    Unknown,
}

impl ShipperError {
    /// Returns the [`ErrorKind`] of this error.
    ///
    /// For multiple errors, returns the kind of the first error or
    /// [`ErrorKind::Unknown`] if the error list is empty.
    pub fn kind(&self) -> ErrorKind {
        match self.repr {
            ErrorRepr::Single(ref payload) => payload.kind,
            ErrorRepr::Many { ref errors, .. } => errors
                .first()
                .map(|err| err.kind())
                .unwrap_or(ErrorKind::Unknown),
        }
    }

    /// Returns all [`ErrorKind`]s present in this error.
    ///
    /// For single errors, returns a vector with one element. For multiple
    /// errors, returns a flattened vector of all error kinds.
    pub fn kinds(&self) -> Vec<ErrorKind> {
        match self.repr {
            ErrorRepr::Single(ref payload) => vec![payload.kind],
            ErrorRepr::Many { ref errors, .. } => errors
                .iter()
                .flat_map(|err| err.kinds())
                .collect::<Vec<_>>(),
        }
    }

    /// Returns the detailed error information if available.
    ///
    /// For multiple errors, returns the detail of the first error that has one.
    pub fn detail(&self) -> Option<&str> {
        match self.repr {
            ErrorRepr::Single(ref payload) => payload.detail.as_deref(),
            ErrorRepr::Many { ref errors, .. } => errors.iter().find_map(|e| e.detail()),
        }
    }

    /// Returns the captured backtrace for this error.
    pub fn backtrace(&self) -> Option<&Backtrace> {
        match self.repr {
            ErrorRepr::Single(ref payload) => Some(payload.backtrace.as_ref()),
            ErrorRepr::Many { .. } => None,
        }
    }

    /// Returns the captured callsite location for this error.
    pub fn location(&self) -> &'static Location<'static> {
        match self.repr {
            ErrorRepr::Single(ref payload) => payload.location,
            ErrorRepr::Many { location, .. } => location,
        }
    }

    /// Attaches an originating [`error::Error`] to this error and returns the modified instance.
    ///
    /// The stored source is preserved across clones and exposed via
    /// [`error::Error::source`]. Has no effect on aggregated errors because
    /// aggregates forward the first contained error as their source.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: error::Error + Send + Sync + 'static,
    {
        if let ErrorRepr::Single(ref mut payload) = self.repr {
            payload.source = Some(Arc::new(source));
        }
        self
    }

    /// Creates a [`ShipperError`] from its components.
    #[track_caller]
    fn from_components(
        kind: ErrorKind,
        description: Cow<'static, str>,
        detail: Option<Cow<'static, str>>,
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    ) -> Self {
        let location = Location::caller();
        let backtrace = Arc::new(Backtrace::capture());

        ShipperError {
            repr: ErrorRepr::Single(ErrorPayload {
                kind,
                description,
                detail,
                source,
                location,
                backtrace,
            }),
        }
    }
}

impl PartialEq for ShipperError {
    fn eq(&self, other: &ShipperError) -> bool {
        match (&self.repr, &other.repr) {
            (ErrorRepr::Single(a), ErrorRepr::Single(b)) => a.kind == b.kind,
            (
                ErrorRepr::Many {
                    errors: errors_a, ..
                },
                ErrorRepr::Many {
                    errors: errors_b, ..
                },
            ) => {
                errors_a.len() == errors_b.len()
                    && errors_a.iter().zip(errors_b.iter()).all(|(a, b)| a == b)
            }
            _ => false,
        }
    }
}

impl fmt::Display for ShipperError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        match &self.repr {
            ErrorRepr::Single(payload) => {
                let location = payload.location;
                write!(
                    f,
                    "[{:?}] {} @ {}:{}:{}",
                    payload.kind,
                    payload.description,
                    location.file(),
                    location.line(),
                    location.column()
                )?;

                if let Some(detail) = payload.detail.as_deref() {
                    write!(f, "\n  Detail: {detail}")?;
                }

                Ok(())
            }
            ErrorRepr::Many { errors, location } => {
                let count = errors.len();
                write!(
                    f,
                    "[Many] {} error{} aggregated @ {}:{}:{}",
                    count,
                    if count == 1 { "" } else { "s" },
                    location.file(),
                    location.line(),
                    location.column()
                )?;

                for (index, error) in errors.iter().enumerate() {
                    let rendered = format!("{error}");
                    let mut lines = rendered.lines();
                    if let Some(first_line) = lines.next() {
                        write!(f, "\n  {}. {}", index + 1, first_line)?;
                    }
                    for line in lines {
                        write!(f, "\n     {line}")?;
                    }
                }

                Ok(())
            }
        }
    }
}

impl error::Error for ShipperError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match &self.repr {
            ErrorRepr::Single(payload) => payload
                .source
                .as_ref()
                .map(|source| source as &(dyn error::Error + 'static)),
            // For aggregated errors, we forward the first contained error as the source.
            ErrorRepr::Many { errors, .. } => errors
                .first()
                .map(|error| error as &(dyn error::Error + 'static)),
        }
    }
}

/// Creates a [`ShipperError`] from an error kind and static description.
impl From<(ErrorKind, &'static str)> for ShipperError {
    #[track_caller]
    fn from((kind, desc): (ErrorKind, &'static str)) -> ShipperError {
        ShipperError::from_components(kind, Cow::Borrowed(desc), None, None)
    }
}

/// Creates a [`ShipperError`] from an error kind, static description, and dynamic detail.
impl<D> From<(ErrorKind, &'static str, D)> for ShipperError
where
    D: Into<Cow<'static, str>>,
{
    #[track_caller]
    fn from((kind, desc, detail): (ErrorKind, &'static str, D)) -> ShipperError {
        ShipperError::from_components(kind, Cow::Borrowed(desc), Some(detail.into()), None)
    }
}

/// Creates a [`ShipperError`] from a vector of errors for aggregation.
///
/// If the vector contains exactly one error, returns that error directly
/// without wrapping it in the aggregation variant.
impl<E> From<Vec<E>> for ShipperError
where
    E: Into<ShipperError>,
{
    #[track_caller]
    fn from(errors: Vec<E>) -> ShipperError {
        let location = Location::caller();

        let mut errors: Vec<ShipperError> = errors.into_iter().map(Into::into).collect();

        if errors.len() == 1 {
            return errors.pop().expect("just checked length is 1");
        }

        ShipperError {
            repr: ErrorRepr::Many { errors, location },
        }
    }
}

/// Converts [`serde_json::Error`] to [`ShipperError`] with [`ErrorKind::ConfigError`].
///
/// Field values and configuration tables are JSON-shaped, so a JSON error
/// here always means malformed configuration input.
impl From<serde_json::Error> for ShipperError {
    #[track_caller]
    fn from(err: serde_json::Error) -> ShipperError {
        let detail = err.to_string();
        let source = Arc::new(err);
        ShipperError::from_components(
            ErrorKind::ConfigError,
            Cow::Borrowed("JSON configuration handling failed"),
            Some(Cow::Owned(detail)),
            Some(source),
        )
    }
}

/// Converts a config-crate [`shipper_config::shared::ValidationError`] into a
/// [`ShipperError`] with [`ErrorKind::ConfigError`].
impl From<shipper_config::shared::ValidationError> for ShipperError {
    #[track_caller]
    fn from(err: shipper_config::shared::ValidationError) -> ShipperError {
        let detail = err.to_string();
        let source = Arc::new(err);
        ShipperError::from_components(
            ErrorKind::ConfigError,
            Cow::Borrowed("Invalid configuration"),
            Some(Cow::Owned(detail)),
            Some(source),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{bail, shipper_error};

    fn fail(kind: ErrorKind) -> ShipperResult<()> {
        bail!(kind, "operation failed");
    }

    #[test]
    fn single_error_exposes_kind_and_location() {
        let err = shipper_error!(ErrorKind::ConfigError, "bad config", "missing key");
        assert_eq!(err.kind(), ErrorKind::ConfigError);
        assert_eq!(err.detail(), Some("missing key"));
        assert!(err.location().file().ends_with("error.rs"));
    }

    #[test]
    fn bail_returns_early() {
        let err = fail(ErrorKind::ClientClosed).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ClientClosed);
    }

    #[test]
    fn aggregation_flattens_single_element() {
        let errors = vec![shipper_error!(ErrorKind::QueueRejected, "rejected")];
        let err: ShipperError = errors.into();
        assert_eq!(err.kinds(), vec![ErrorKind::QueueRejected]);
    }

    #[test]
    fn aggregation_collects_all_kinds() {
        let errors = vec![
            shipper_error!(ErrorKind::ClientClosed, "closed"),
            shipper_error!(ErrorKind::QueueRejected, "rejected"),
        ];
        let err: ShipperError = errors.into();
        assert_eq!(
            err.kinds(),
            vec![ErrorKind::ClientClosed, ErrorKind::QueueRejected]
        );
        assert!(format!("{err}").contains("2 errors aggregated"));
    }

    #[test]
    fn errors_compare_by_kind() {
        let a = shipper_error!(ErrorKind::ConfigError, "one");
        let b = shipper_error!(ErrorKind::ConfigError, "two");
        assert_eq!(a, b);
    }
}
