use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// Configuration for a destination selector.
///
/// Supports a single-template shorthand (`key`), an ordered list of guarded
/// entries (`keys`), or both; entries from `keys` are evaluated first, in
/// declaration order, with the shorthand appended last.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SelectorConfig {
    /// Single event-format template, e.g. `"events-%{[agent.version]}"`.
    #[serde(default)]
    pub key: Option<String>,
    /// Ordered list of selector entries, each with its own template,
    /// optional lookup table, fallback, and guarding condition.
    #[serde(default)]
    pub keys: Vec<SelectorEntryConfig>,
}

impl SelectorConfig {
    /// Returns true if neither the shorthand nor the entry list is set.
    pub fn is_empty(&self) -> bool {
        self.key.is_none() && self.keys.is_empty()
    }

    /// Validates all entries of the selector configuration.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(key) = &self.key
            && key.is_empty()
        {
            return Err(ValidationError::EmptySelectorKey);
        }

        for entry in &self.keys {
            entry.validate()?;
        }

        Ok(())
    }
}

/// One entry of a multi-entry selector.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SelectorEntryConfig {
    /// Event-format template producing the lookup key or the destination
    /// itself when no mapping table is configured.
    pub key: String,
    /// Value used when the template references missing fields or the
    /// mapping table has no matching row.
    #[serde(default)]
    pub default: Option<String>,
    /// Static lookup table applied to the rendered template.
    #[serde(default)]
    pub mappings: HashMap<String, String>,
    /// Condition guarding this entry; an unmatched condition makes the
    /// entry yield nothing and evaluation moves to the next one.
    #[serde(default)]
    pub when: Option<ConditionConfig>,
}

impl SelectorEntryConfig {
    /// Validates the entry, including its guarding condition.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.key.is_empty() {
            return Err(ValidationError::EmptySelectorKey);
        }

        if let Some(when) = &self.when {
            when.validate()?;
        }

        Ok(())
    }
}

/// Declarative event predicate used to guard selector entries.
///
/// Exactly one top-level clause must be set. Combinators nest arbitrarily.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ConditionConfig {
    /// Field-by-field scalar equality.
    #[serde(default)]
    pub equals: Option<HashMap<String, serde_json::Value>>,
    /// Substring match on string-valued fields.
    #[serde(default)]
    pub contains: Option<HashMap<String, String>>,
    /// All listed fields must exist on the event.
    #[serde(default)]
    pub has_fields: Option<Vec<String>>,
    /// Negation of the nested condition.
    #[serde(default)]
    pub not: Option<Box<ConditionConfig>>,
    /// All nested conditions must match.
    #[serde(default)]
    pub and: Option<Vec<ConditionConfig>>,
    /// At least one nested condition must match.
    #[serde(default)]
    pub or: Option<Vec<ConditionConfig>>,
}

impl ConditionConfig {
    /// Counts the top-level clauses set on this condition.
    fn clauses(&self) -> usize {
        [
            self.equals.is_some(),
            self.contains.is_some(),
            self.has_fields.is_some(),
            self.not.is_some(),
            self.and.is_some(),
            self.or.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count()
    }

    /// Validates that exactly one clause is set, recursing into combinators.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let clauses = self.clauses();
        if clauses != 1 {
            return Err(ValidationError::InvalidConditionClauses(clauses));
        }

        if let Some(not) = &self.not {
            not.validate()?;
        }
        for nested in self.and.iter().flatten() {
            nested.validate()?;
        }
        for nested in self.or.iter().flatten() {
            nested.validate()?;
        }

        Ok(())
    }
}
