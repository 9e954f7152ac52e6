use crate::errors::PageError;
use serde_json::Value;

// Safety limits to prevent resource abuse
pub(crate) const MAX_PATH_DEPTH: usize = 32;
pub(crate) const MAX_IN_SET: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CmpOp {
    /// Parses `>`, `>=`, `=`, `<=`, `<`.
    pub fn parse(s: &str) -> Result<Self, PageError> {
        match s.trim() {
            "=" | "==" => Ok(Self::Eq),
            ">" => Ok(Self::Gt),
            ">=" => Ok(Self::Gte),
            "<" => Ok(Self::Lt),
            "<=" => Ok(Self::Lte),
            other => Err(PageError::InvalidFilter(format!("unsupported operator '{other}'"))),
        }
    }
}

/// A row predicate. Paths are dotted (`author.name`).
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    True,
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
    Exists { path: String, exists: bool },
    In { path: String, values: Vec<Value> },
    Nin { path: String, values: Vec<Value> },
    Cmp { path: String, op: CmpOp, value: Value },
    /// Substring match against the string form of the field.
    Contains { path: String, needle: String, case_insensitive: bool },
}

impl Predicate {
    #[must_use]
    pub fn eq(path: impl Into<String>, value: Value) -> Self {
        Self::Cmp { path: path.into(), op: CmpOp::Eq, value }
    }

    /// Folds a list into one predicate; an empty list matches everything.
    #[must_use]
    pub fn all(mut predicates: Vec<Self>) -> Self {
        match predicates.len() {
            0 => Self::True,
            1 => predicates.remove(0),
            _ => Self::And(predicates),
        }
    }
}
