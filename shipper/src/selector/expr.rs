use std::collections::HashMap;

use crate::error::ShipperResult;
use crate::selector::condition::Condition;
use crate::selector::fmtstr::EventFormat;
use crate::types::Event;

/// One node of a compiled selector expression tree.
///
/// Evaluation maps an event to a destination string. An empty result is not
/// an error: it means "this node selects nothing" and makes a surrounding
/// [`SelectorExpr::List`] move on to its next alternative.
#[derive(Debug, Clone)]
pub enum SelectorExpr {
    /// Selects nothing, always.
    Empty,
    /// Always selects the same destination.
    Const(String),
    /// Renders a template; degraded lookups resolve to `otherwise`.
    ///
    /// When `otherwise` is empty the underlying missing-field error is
    /// propagated instead, so that an enclosing [`SelectorExpr::Mapping`]
    /// can apply its own fallback to the real failure.
    Format {
        format: EventFormat,
        otherwise: String,
    },
    /// First non-empty result of the alternatives, in declaration order.
    List(Vec<SelectorExpr>),
    /// Evaluates the inner expression only when the condition matches.
    Conditional {
        inner: Box<SelectorExpr>,
        condition: Condition,
    },
    /// Evaluates `from`, then maps the result through a static table.
    Mapping {
        from: Box<SelectorExpr>,
        table: HashMap<String, String>,
        otherwise: String,
    },
}

impl SelectorExpr {
    /// Builds a constant node, collapsing empty strings to [`SelectorExpr::Empty`].
    pub fn constant(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.is_empty() {
            Self::Empty
        } else {
            Self::Const(value)
        }
    }

    /// Builds a template node with a node-level fallback.
    pub fn format(format: EventFormat, otherwise: impl Into<String>) -> Self {
        Self::Format {
            format,
            otherwise: otherwise.into(),
        }
    }

    /// Builds an ordered-alternatives node.
    pub fn concat(exprs: Vec<SelectorExpr>) -> Self {
        Self::List(exprs)
    }

    /// Wraps an expression behind a guard condition.
    pub fn guarded(inner: SelectorExpr, condition: Condition) -> Self {
        Self::Conditional {
            inner: Box::new(inner),
            condition,
        }
    }

    /// Builds a table-lookup node over a sub-expression.
    pub fn lookup(
        from: SelectorExpr,
        table: HashMap<String, String>,
        otherwise: impl Into<String>,
    ) -> Self {
        Self::Mapping {
            from: Box::new(from),
            table,
            otherwise: otherwise.into(),
        }
    }

    /// Returns true for the node that can never select anything.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Evaluates the expression against an event.
    pub fn eval(&self, event: &Event) -> ShipperResult<String> {
        match self {
            Self::Empty => Ok(String::new()),

            Self::Const(value) => Ok(value.clone()),

            Self::Format { format, otherwise } => match format.render(event) {
                Ok(rendered) if rendered.is_empty() => Ok(otherwise.clone()),
                Ok(rendered) => Ok(rendered),
                // A non-empty fallback absorbs the missing-field condition;
                // an empty one lets the caller see the real error.
                Err(err) => {
                    if otherwise.is_empty() {
                        Err(err)
                    } else {
                        Ok(otherwise.clone())
                    }
                }
            },

            Self::List(alternatives) => {
                for alternative in alternatives {
                    let result = alternative.eval(event)?;
                    if !result.is_empty() {
                        return Ok(result);
                    }
                }

                Ok(String::new())
            }

            Self::Conditional { inner, condition } => {
                if !condition.check(event) {
                    return Ok(String::new());
                }
                inner.eval(event)
            }

            Self::Mapping {
                from,
                table,
                otherwise,
            } => {
                let key = match from.eval(event) {
                    Ok(key) => key,
                    Err(err) => {
                        if otherwise.is_empty() {
                            return Err(err);
                        }
                        return Ok(otherwise.clone());
                    }
                };

                if key.is_empty() {
                    return Ok(otherwise.clone());
                }

                match table.get(&key) {
                    Some(mapped) if !mapped.is_empty() => Ok(mapped.clone()),
                    _ => Ok(otherwise.clone()),
                }
            }
        }
    }
}
