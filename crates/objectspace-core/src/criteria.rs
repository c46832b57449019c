//! The criteria AST: dialect-independent row filters.
//!
//! A [`WhereClause`] is a small binary expression tree. Leaves compare one
//! property against a literal value; inner nodes combine two sub-clauses with
//! a logical operator. Statement builders walk the tree to emit dialect text;
//! in-memory backends can evaluate it directly.

use crate::value::Value;
use serde::{Deserialize, Serialize};

/// Comparison operator for a criteria leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComparisonOperator {
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
}

/// Logical operator for an inner criteria node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicOperator {
    And,
    Or,
    Not,
}

/// A composable row filter.
///
/// Clauses are immutable; [`and`](WhereClause::and) and
/// [`or`](WhereClause::or) build new trees around existing ones.
///
/// # Example
///
/// ```
/// use objectspace_core::{ComparisonOperator, Value, WhereClause};
///
/// let done = WhereClause::compare("done", Value::Bool(true), ComparisonOperator::Equal);
/// let urgent = WhereClause::compare("hours", Value::Int(8), ComparisonOperator::Greater);
/// let filter = done.and(urgent);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WhereClause {
    /// property OP literal
    Compare {
        property: String,
        operator: ComparisonOperator,
        value: Value,
    },
    /// left OP right
    Combine {
        left: Box<WhereClause>,
        right: Box<WhereClause>,
        operator: LogicOperator,
    },
}

impl WhereClause {
    /// Create a leaf clause comparing `property` against `value`.
    pub fn compare(
        property: impl Into<String>,
        value: impl Into<Value>,
        operator: ComparisonOperator,
    ) -> Self {
        WhereClause::Compare {
            property: property.into(),
            operator,
            value: value.into(),
        }
    }

    /// Shorthand for the most common leaf: `property = value`.
    pub fn equals(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(property, value, ComparisonOperator::Equal)
    }

    /// Combine with another clause using AND.
    #[must_use]
    pub fn and(self, clause: WhereClause) -> Self {
        WhereClause::Combine {
            left: Box::new(self),
            right: Box::new(clause),
            operator: LogicOperator::And,
        }
    }

    /// Combine with another clause using OR.
    #[must_use]
    pub fn or(self, clause: WhereClause) -> Self {
        WhereClause::Combine {
            left: Box::new(self),
            right: Box::new(clause),
            operator: LogicOperator::Or,
        }
    }

    /// AND with an optional clause; `None` leaves `self` unchanged.
    #[must_use]
    pub fn and_opt(self, clause: Option<WhereClause>) -> Self {
        match clause {
            Some(c) => self.and(c),
            None => self,
        }
    }

    /// OR with an optional clause; `None` leaves `self` unchanged.
    #[must_use]
    pub fn or_opt(self, clause: Option<WhereClause>) -> Self {
        match clause {
            Some(c) => self.or(c),
            None => self,
        }
    }

    /// Evaluate this clause against a property lookup function.
    ///
    /// This is the reference semantics statement builders must agree with:
    /// a leaf whose operands cannot be compared (NULL involved, or variant
    /// mismatch) matches only for `Equal`/`NotEqual` on two NULLs vs. one.
    pub fn evaluate<F>(&self, lookup: &F) -> bool
    where
        F: Fn(&str) -> Value,
    {
        match self {
            WhereClause::Compare {
                property,
                operator,
                value,
            } => {
                let actual = lookup(property);
                match operator {
                    ComparisonOperator::Equal => actual == *value,
                    ComparisonOperator::NotEqual => actual != *value,
                    ComparisonOperator::Less => {
                        actual.compare(value) == Some(std::cmp::Ordering::Less)
                    }
                    ComparisonOperator::LessOrEqual => matches!(
                        actual.compare(value),
                        Some(std::cmp::Ordering::Less | std::cmp::Ordering::Equal)
                    ),
                    ComparisonOperator::Greater => {
                        actual.compare(value) == Some(std::cmp::Ordering::Greater)
                    }
                    ComparisonOperator::GreaterOrEqual => matches!(
                        actual.compare(value),
                        Some(std::cmp::Ordering::Greater | std::cmp::Ordering::Equal)
                    ),
                }
            }
            WhereClause::Combine {
                left,
                right,
                operator,
            } => match operator {
                LogicOperator::And => left.evaluate(lookup) && right.evaluate(lookup),
                LogicOperator::Or => left.evaluate(lookup) || right.evaluate(lookup),
                LogicOperator::Not => !right.evaluate(lookup),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_in<'a>(map: &'a HashMap<&'static str, Value>) -> impl Fn(&str) -> Value + 'a {
        |name| map.get(name).cloned().unwrap_or(Value::Null)
    }

    fn fixture() -> HashMap<&'static str, Value> {
        HashMap::from([
            ("hours", Value::Int(6)),
            ("done", Value::Bool(false)),
            ("title", Value::Text("triage".into())),
        ])
    }

    #[test]
    fn leaf_comparisons() {
        let row = fixture();
        let l = lookup_in(&row);

        assert!(WhereClause::equals("title", "triage").evaluate(&l));
        assert!(!WhereClause::equals("title", "other").evaluate(&l));
        assert!(
            WhereClause::compare("hours", Value::Int(4), ComparisonOperator::Greater).evaluate(&l)
        );
        assert!(
            WhereClause::compare("hours", Value::Int(6), ComparisonOperator::LessOrEqual)
                .evaluate(&l)
        );
        assert!(
            !WhereClause::compare("done", Value::Bool(false), ComparisonOperator::NotEqual)
                .evaluate(&l)
        );
    }

    #[test]
    fn and_or_composition_matches_reference_logic() {
        let row = fixture();
        let l = lookup_in(&row);

        // (hours > 4 AND done = true) OR title = "triage"
        let clause = WhereClause::compare("hours", Value::Int(4), ComparisonOperator::Greater)
            .and(WhereClause::equals("done", true))
            .or(WhereClause::equals("title", "triage"));

        let a = row["hours"].compare(&Value::Int(4)) == Some(std::cmp::Ordering::Greater);
        let b = row["done"] == Value::Bool(true);
        let c = row["title"] == Value::Text("triage".into());
        assert_eq!(clause.evaluate(&l), (a && b) || c);
    }

    #[test]
    fn opt_combinators_keep_self_on_none() {
        let base = WhereClause::equals("done", true);
        assert_eq!(base.clone().and_opt(None), base);
        assert_eq!(base.clone().or_opt(None), base);
        assert_ne!(base.clone().and_opt(Some(WhereClause::equals("x", 1))), base);
    }

    #[test]
    fn null_comparisons_never_order() {
        let row: HashMap<&'static str, Value> = HashMap::new();
        let l = lookup_in(&row);

        // missing column reads NULL: ordering comparisons all fail
        assert!(!WhereClause::compare("ghost", Value::Int(1), ComparisonOperator::Less).evaluate(&l));
        assert!(
            !WhereClause::compare("ghost", Value::Int(1), ComparisonOperator::GreaterOrEqual)
                .evaluate(&l)
        );
        // equality against NULL still works
        assert!(WhereClause::compare("ghost", Value::Null, ComparisonOperator::Equal).evaluate(&l));
    }
}
