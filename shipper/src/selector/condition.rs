use shipper_config::shared::ConditionConfig;

use crate::error::{ErrorKind, ShipperResult};
use crate::shipper_error;
use crate::types::{Event, Value};

/// A compiled event predicate.
///
/// Conditions guard selector entries: an entry whose condition does not
/// match yields nothing and evaluation moves on to the next entry. Compiled
/// once from [`ConditionConfig`]; checking is side-effect free.
#[derive(Debug, Clone)]
pub enum Condition {
    /// Every listed field equals the configured scalar value.
    Equals(Vec<(String, Value)>),
    /// Every listed string field contains the configured substring.
    Contains(Vec<(String, String)>),
    /// Every listed field exists on the event.
    HasFields(Vec<String>),
    /// Negation of the nested condition.
    Not(Box<Condition>),
    /// All nested conditions match.
    And(Vec<Condition>),
    /// At least one nested condition matches.
    Or(Vec<Condition>),
}

impl Condition {
    /// Compiles a condition from its configuration.
    ///
    /// The configuration must carry exactly one top-level clause; anything
    /// else fails with [`ErrorKind::InvalidCondition`].
    pub fn from_config(config: &ConditionConfig) -> ShipperResult<Self> {
        if let Err(err) = config.validate() {
            return Err(shipper_error!(
                ErrorKind::InvalidCondition,
                "Invalid condition configuration",
                err.to_string()
            ));
        }

        if let Some(equals) = &config.equals {
            let mut checks: Vec<_> = equals
                .iter()
                .map(|(path, value)| (path.clone(), value.clone()))
                .collect();
            // HashMap iteration order is arbitrary; sort so behavior and
            // error messages are deterministic.
            checks.sort_by(|a, b| a.0.cmp(&b.0));
            return Ok(Self::Equals(checks));
        }

        if let Some(contains) = &config.contains {
            let mut checks: Vec<_> = contains
                .iter()
                .map(|(path, needle)| (path.clone(), needle.clone()))
                .collect();
            checks.sort_by(|a, b| a.0.cmp(&b.0));
            return Ok(Self::Contains(checks));
        }

        if let Some(has_fields) = &config.has_fields {
            return Ok(Self::HasFields(has_fields.clone()));
        }

        if let Some(not) = &config.not {
            return Ok(Self::Not(Box::new(Self::from_config(not)?)));
        }

        if let Some(and) = &config.and {
            let nested = and
                .iter()
                .map(Self::from_config)
                .collect::<ShipperResult<Vec<_>>>()?;
            return Ok(Self::And(nested));
        }

        if let Some(or) = &config.or {
            let nested = or
                .iter()
                .map(Self::from_config)
                .collect::<ShipperResult<Vec<_>>>()?;
            return Ok(Self::Or(nested));
        }

        // validate() guarantees exactly one clause is present.
        Err(shipper_error!(
            ErrorKind::InvalidCondition,
            "Condition configuration has no clause"
        ))
    }

    /// Checks the condition against an event.
    pub fn check(&self, event: &Event) -> bool {
        match self {
            Self::Equals(checks) => checks
                .iter()
                .all(|(path, expected)| event.lookup(path) == Some(expected)),
            Self::Contains(checks) => checks.iter().all(|(path, needle)| {
                event
                    .lookup(path)
                    .and_then(Value::as_str)
                    .is_some_and(|value| value.contains(needle.as_str()))
            }),
            Self::HasFields(paths) => paths.iter().all(|path| event.lookup(path).is_some()),
            Self::Not(inner) => !inner.check(event),
            Self::And(nested) => nested.iter().all(|condition| condition.check(event)),
            Self::Or(nested) => nested.iter().any(|condition| condition.check(event)),
        }
    }
}
