//! Prefix-notation predicate algebra for record filters.
//!
//! A domain is a flat sequence of prefix operators (`&`, `|`, `!`) and
//! comparison leaves, the list form used by the ORM. An empty domain
//! matches every record and is neutral under AND.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Comparison operators accepted in a leaf.
const COMPARISON_OPERATORS: &[&str] = &[
    "=", "!=", "<", "<=", ">", ">=", "=?", "=like", "=ilike", "like", "not like", "ilike",
    "not ilike", "in", "not in", "child_of", "parent_of",
];

/// Error raised when a domain cannot be evaluated or combined.
#[derive(Debug, Clone, Error)]
pub enum DomainError {
    /// A term was structurally malformed. Carries the offending term and
    /// the root cause so the caller can surface both.
    #[error("failed to evaluate the domain {term}: {reason}")]
    Evaluation { term: String, reason: String },
}

/// Boolean connective in prefix position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Connective {
    And,
    Or,
    Not,
}

impl Connective {
    pub fn symbol(&self) -> &'static str {
        match self {
            Connective::And => "&",
            Connective::Or => "|",
            Connective::Not => "!",
        }
    }
}

/// A single comparison condition on a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leaf {
    pub field: String,
    pub operator: String,
    pub value: Value,
}

impl Leaf {
    pub fn new(field: impl Into<String>, operator: impl Into<String>, value: Value) -> Self {
        Self {
            field: field.into(),
            operator: operator.into(),
            value,
        }
    }
}

impl fmt::Display for Leaf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({:?}, {:?}, {})",
            self.field, self.operator, self.value
        )
    }
}

/// One token of a domain: a connective or a leaf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DomainItem {
    Connective(Connective),
    Leaf(Leaf),
}

/// A boolean filter predicate in prefix list form.
///
/// Consecutive terms without an explicit connective are implicitly
/// AND-combined; [`Domain::normalize`] makes that explicit.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Domain(Vec<DomainItem>);

impl Domain {
    /// The empty domain: matches everything, neutral under AND.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A domain consisting of a single comparison leaf.
    pub fn leaf(field: impl Into<String>, operator: impl Into<String>, value: Value) -> Self {
        Self(vec![DomainItem::Leaf(Leaf::new(field, operator, value))])
    }

    /// A domain of implicitly AND-combined leaves.
    pub fn from_leaves(leaves: Vec<Leaf>) -> Self {
        Self(leaves.into_iter().map(DomainItem::Leaf).collect())
    }

    /// Build a domain from raw tokens. The sequence is validated on
    /// [`Domain::normalize`], not here, matching how stored clauses are
    /// checked only when they reach a composition.
    pub fn from_items(items: Vec<DomainItem>) -> Self {
        Self(items)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn items(&self) -> &[DomainItem] {
        &self.0
    }

    /// Make the implicit AND between top-level terms explicit.
    ///
    /// Walks the token sequence tracking how many operand slots remain
    /// open; whenever the count reaches zero with tokens left, an `&` is
    /// prepended. A sequence that does not consume exactly its operand
    /// slots is malformed.
    pub fn normalize(&self) -> Result<Domain, DomainError> {
        if self.0.is_empty() {
            return Ok(Domain::empty());
        }

        let mut result: Vec<DomainItem> = Vec::with_capacity(self.0.len());
        let mut expected: i32 = 1;
        for item in &self.0 {
            if expected == 0 {
                result.insert(0, DomainItem::Connective(Connective::And));
                expected = 1;
            }
            match item {
                DomainItem::Connective(Connective::And | Connective::Or) => expected += 1,
                DomainItem::Connective(Connective::Not) => {}
                DomainItem::Leaf(leaf) => {
                    if !COMPARISON_OPERATORS.contains(&leaf.operator.as_str()) {
                        return Err(DomainError::Evaluation {
                            term: leaf.to_string(),
                            reason: format!("unknown comparison operator {:?}", leaf.operator),
                        });
                    }
                    expected -= 1;
                }
            }
            result.push(item.clone());
        }

        if expected != 0 {
            return Err(DomainError::Evaluation {
                term: self.to_string(),
                reason: format!("{expected} operand(s) missing"),
            });
        }

        Ok(Domain(result))
    }

    /// AND-combine domains. Empty domains are dropped as neutral terms;
    /// term order is preserved, so repeated calls on the same inputs
    /// yield an identical token sequence.
    pub fn and(domains: &[Domain]) -> Result<Domain, DomainError> {
        Self::combine(Connective::And, domains)
    }

    /// OR-combine domains. An empty input list yields the empty domain.
    pub fn or(domains: &[Domain]) -> Result<Domain, DomainError> {
        Self::combine(Connective::Or, domains)
    }

    fn combine(connective: Connective, domains: &[Domain]) -> Result<Domain, DomainError> {
        let mut normalized = Vec::with_capacity(domains.len());
        for domain in domains {
            let n = domain.normalize()?;
            if !n.is_empty() {
                normalized.push(n);
            }
        }

        match normalized.len() {
            0 => Ok(Domain::empty()),
            1 => Ok(normalized.pop().unwrap_or_default()),
            n => {
                let mut items = vec![DomainItem::Connective(connective); n - 1];
                for domain in normalized {
                    items.extend(domain.0);
                }
                Ok(Domain(items))
            }
        }
    }

    /// Serialize to the JSON list form consumed by the ORM: connectives
    /// as strings, leaves as `[field, operator, value]` triples.
    pub fn to_list(&self) -> Vec<Value> {
        self.0
            .iter()
            .map(|item| match item {
                DomainItem::Connective(c) => Value::String(c.symbol().to_string()),
                DomainItem::Leaf(leaf) => Value::Array(vec![
                    Value::String(leaf.field.clone()),
                    Value::String(leaf.operator.clone()),
                    leaf.value.clone(),
                ]),
            })
            .collect()
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, item) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match item {
                DomainItem::Connective(c) => write!(f, "{:?}", c.symbol())?,
                DomainItem::Leaf(leaf) => write!(f, "{leaf}")?,
            }
        }
        write!(f, "]")
    }
}
