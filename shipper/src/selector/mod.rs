//! Destination selection for published events.
//!
//! A [`Selector`] maps an event to the name of the logical destination
//! (index, topic, partition key) it should be shipped to. Selectors are
//! compiled once from configuration into an immutable expression tree and
//! are safe for unlimited concurrent evaluation.
//!
//! Configuration supports a single-template shorthand and an ordered list
//! of entries, each with an optional static lookup table, fallback, and
//! guarding condition:
//!
//! ```text
//! keys:
//!   - key: "%{[event.level]}"
//!     mappings: { critical: alerts, error: alerts }
//!     default: logs
//!     when: { has_fields: [event.level] }
//!   - key: "logs-%{+%Y.%m.%d}"
//! ```
//!
//! Templates whose rendering cannot depend on any event are folded into
//! constants at build time; the fold is semantically transparent.

mod condition;
mod expr;
mod fmtstr;

pub use condition::Condition;
pub use expr::SelectorExpr;
pub use fmtstr::EventFormat;

use shipper_config::shared::{SelectorConfig, SelectorEntryConfig};

use crate::error::{ErrorKind, ShipperResult};
use crate::shipper_error;
use crate::types::Event;

/// Names and policies used when building a selector from configuration.
///
/// The key names only shape error messages; the configuration shape itself
/// is fixed by [`SelectorConfig`].
#[derive(Debug, Clone)]
pub struct Settings {
    /// Logical name of the single-template field (e.g. `"index"`).
    pub key: &'static str,
    /// Logical name of the multi-entry field (e.g. `"indices"`).
    pub multi_key: &'static str,
    /// Whether the single-template shorthand is honored.
    pub enable_single_only: bool,
    /// Fail building when neither form is present.
    pub fail_empty: bool,
}

/// A compiled destination selector.
///
/// An empty selection is not an error; it is up to the caller to decide
/// whether that means "drop" or "use the output's default routing".
#[derive(Debug, Clone)]
pub struct Selector {
    expr: SelectorExpr,
}

impl Selector {
    /// Builds a selector from a list of expressions.
    ///
    /// Zero expressions select nothing, one evaluates directly, several
    /// evaluate as ordered alternatives.
    pub fn make(mut exprs: Vec<SelectorExpr>) -> Self {
        let expr = match exprs.len() {
            0 => SelectorExpr::Empty,
            1 => exprs.pop().expect("just checked length is 1"),
            _ => SelectorExpr::concat(exprs),
        };

        Self { expr }
    }

    /// Runs the selector against an event.
    ///
    /// Returns an empty string when no alternative matched. Errors surface
    /// only from `mapping` nodes without a fallback and from templates
    /// without any fallback; see the module documentation of
    /// [`SelectorExpr`] for the exact rules.
    pub fn select(&self, event: &Event) -> ShipperResult<String> {
        self.expr.eval(event)
    }

    /// Returns true when this selector can never select anything.
    pub fn is_empty(&self) -> bool {
        self.expr.is_empty()
    }

    /// Returns true when this selector yields the same value for every event.
    pub fn is_const(&self) -> bool {
        matches!(self.expr, SelectorExpr::Empty | SelectorExpr::Const(_))
    }

    /// Builds a selector from configuration.
    ///
    /// Entries from the multi-entry list are compiled first, in declaration
    /// order, followed by the single-template shorthand when enabled.
    /// Violating `fail_empty` is a configuration error, surfaced here and
    /// never defaulted.
    pub fn from_config(config: &SelectorConfig, settings: &Settings) -> ShipperResult<Selector> {
        let mut exprs = Vec::new();
        let mut found = false;

        if !config.keys.is_empty() {
            found = true;

            for entry in &config.keys {
                let expr = build_single(entry)?;
                if !expr.is_empty() {
                    exprs.push(expr);
                }
            }
        }

        if settings.enable_single_only
            && let Some(template) = &config.key
        {
            found = true;

            let format = EventFormat::compile(template)?;
            if format.is_const() {
                // Constant folding: evaluate once now; an empty constant
                // contributes nothing at runtime.
                let value = format.render_const()?;
                if !value.is_empty() {
                    exprs.push(SelectorExpr::constant(value));
                }
            } else {
                exprs.push(SelectorExpr::format(format, ""));
            }
        }

        if settings.fail_empty && !found {
            if settings.enable_single_only {
                return Err(shipper_error!(
                    ErrorKind::ConfigError,
                    "Missing required selector configuration",
                    format!(
                        "one of `{}` or `{}` must be present",
                        settings.key, settings.multi_key
                    )
                ));
            }

            return Err(shipper_error!(
                ErrorKind::ConfigError,
                "Missing required selector configuration",
                format!("`{}` must be present", settings.multi_key)
            ));
        }

        Ok(Selector::make(exprs))
    }
}

/// Compiles one multi-entry selector row.
fn build_single(entry: &SelectorEntryConfig) -> ShipperResult<SelectorExpr> {
    let format = EventFormat::compile(&entry.key)?;
    let otherwise = entry.default.clone().unwrap_or_default();

    let mut expr = if !entry.mappings.is_empty() {
        if format.is_const() {
            // Constant folding through the lookup table: resolve the row at
            // build time so runtime evaluation skips table and template.
            let key = format.render_const()?;
            let value = entry
                .mappings
                .get(&key)
                .cloned()
                .filter(|mapped| !mapped.is_empty())
                .unwrap_or(otherwise);

            SelectorExpr::constant(value)
        } else {
            SelectorExpr::lookup(
                SelectorExpr::format(format, ""),
                entry.mappings.clone(),
                otherwise,
            )
        }
    } else if format.is_const() {
        SelectorExpr::constant(format.render_const()?)
    } else {
        SelectorExpr::format(format, otherwise)
    };

    if let Some(when) = &entry.when
        && !expr.is_empty()
    {
        expr = SelectorExpr::guarded(expr, Condition::from_config(when)?);
    }

    Ok(expr)
}
