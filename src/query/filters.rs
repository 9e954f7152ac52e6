//! Named filters: request arguments to row predicates.

use crate::errors::PageError;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::types::{CmpOp, Predicate};

/// Builds a predicate from filter arguments; `Ok(None)` means the filter is not applied.
pub type CustomFilter = Arc<dyn Fn(&Value) -> Result<Option<Predicate>, PageError> + Send + Sync>;

#[derive(Clone)]
pub enum FilterKind {
    /// Scalar argument: equality. Array argument: membership.
    Attribute { column: String },
    /// `{"value": x | [x, ...], "exclude": "true" | "false"}`.
    Enum { column: String },
    /// `{"min_value": a, "max_value": b}`, both inclusive and optional.
    Range { column: String },
    /// `{"operator": ">" | ">=" | "=" | "<=" | "<", "value": n}`.
    Numeric { column: String },
    /// `{"value": "Yes" | "No" | ""}`; the empty string leaves the filter off.
    Boolean { column: String },
    Custom(CustomFilter),
}

impl fmt::Debug for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Attribute { column } => write!(f, "Attribute({column})"),
            Self::Enum { column } => write!(f, "Enum({column})"),
            Self::Range { column } => write!(f, "Range({column})"),
            Self::Numeric { column } => write!(f, "Numeric({column})"),
            Self::Boolean { column } => write!(f, "Boolean({column})"),
            Self::Custom(_) => f.write_str("Custom"),
        }
    }
}

impl FilterKind {
    #[must_use]
    pub fn attribute(column: impl Into<String>) -> Self {
        Self::Attribute { column: column.into() }
    }

    pub fn custom(
        f: impl Fn(&Value) -> Result<Option<Predicate>, PageError> + Send + Sync + 'static,
    ) -> Self {
        Self::Custom(Arc::new(f))
    }

    /// # Errors
    /// Returns [`PageError::InvalidFilter`] when the arguments do not fit this kind.
    pub fn predicate(&self, name: &str, args: &Value) -> Result<Option<Predicate>, PageError> {
        if args.is_null() {
            return Ok(None);
        }
        match self {
            Self::Attribute { column } => attribute(name, column, args),
            Self::Enum { column } => enumeration(name, column, args),
            Self::Range { column } => range(column, args),
            Self::Numeric { column } => numeric(name, column, args),
            Self::Boolean { column } => boolean(name, column, args),
            Self::Custom(f) => f(args),
        }
    }
}

/// Maps filter names to filter kinds.
#[derive(Debug, Clone, Default)]
pub struct FilterRegistry {
    filters: BTreeMap<String, FilterKind>,
    use_default_filter: bool,
}

impl FilterRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// When enabled, an unregistered name is treated as an attribute filter on the column of
    /// the same name instead of failing.
    #[must_use]
    pub const fn with_default_filter(mut self, enabled: bool) -> Self {
        self.use_default_filter = enabled;
        self
    }

    #[must_use]
    pub fn register(mut self, name: impl Into<String>, kind: FilterKind) -> Self {
        self.filters.insert(name.into(), kind);
        self
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.filters.contains_key(name)
    }

    /// Builds one predicate per applied filter, in argument order.
    ///
    /// # Errors
    /// Returns [`PageError::InvalidFilter`] for an unknown name or bad arguments.
    pub fn predicates(&self, filters: &Map<String, Value>) -> Result<Vec<Predicate>, PageError> {
        let mut out = Vec::with_capacity(filters.len());
        for (name, args) in filters {
            let predicate = match self.filters.get(name) {
                Some(kind) => kind.predicate(name, args)?,
                None if self.use_default_filter => attribute(name, name, args)?,
                None => return Err(PageError::InvalidFilter(format!("Unsupported filter: {name}"))),
            };
            out.extend(predicate);
        }
        Ok(out)
    }
}

fn bad(name: &str, args: &Value, why: &str) -> PageError {
    PageError::InvalidFilter(format!("Invalid filter options for {name}: {args} ({why})"))
}

fn is_blank(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        _ => false,
    }
}

fn attribute(name: &str, column: &str, args: &Value) -> Result<Option<Predicate>, PageError> {
    match args {
        Value::Null => Ok(None),
        Value::Array(values) => Ok(Some(Predicate::In { path: column.to_string(), values: values.clone() })),
        Value::Object(_) => Err(bad(name, args, "expected a value or a list of values")),
        scalar => Ok(Some(Predicate::eq(column, scalar.clone()))),
    }
}

fn enumeration(name: &str, column: &str, args: &Value) -> Result<Option<Predicate>, PageError> {
    let (value, exclude) = match args {
        Value::Object(obj) => (obj.get("value").unwrap_or(&Value::Null), obj.get("exclude")),
        other => (other, None),
    };
    if value.is_null() {
        return Ok(None);
    }
    let exclude = match exclude {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) if s.eq_ignore_ascii_case("true") => true,
        Some(Value::String(s)) if s.eq_ignore_ascii_case("false") => false,
        Some(_) => return Err(bad(name, args, "exclude must be either true or false")),
    };
    let values = match value {
        Value::Array(a) => a.clone(),
        v if is_blank(v) => Vec::new(),
        v => vec![v.clone()],
    };
    let path = column.to_string();
    Ok(Some(if exclude { Predicate::Nin { path, values } } else { Predicate::In { path, values } }))
}

fn range(column: &str, args: &Value) -> Result<Option<Predicate>, PageError> {
    let bound = |key: &str| args.get(key).filter(|v| !is_blank(v)).cloned();
    let mut parts = Vec::new();
    if let Some(min) = bound("min_value") {
        parts.push(Predicate::Cmp { path: column.to_string(), op: CmpOp::Gte, value: min });
    }
    if let Some(max) = bound("max_value") {
        parts.push(Predicate::Cmp { path: column.to_string(), op: CmpOp::Lte, value: max });
    }
    Ok((!parts.is_empty()).then(|| Predicate::all(parts)))
}

fn numeric(name: &str, column: &str, args: &Value) -> Result<Option<Predicate>, PageError> {
    let value = match args.get("value") {
        None => return Ok(None),
        Some(v) if is_blank(v) => return Ok(None),
        Some(Value::Number(n)) => Value::Number(n.clone()),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| bad(name, args, "value must be numeric"))?,
        Some(_) => return Err(bad(name, args, "value must be numeric")),
    };
    let operator = args
        .get("operator")
        .and_then(Value::as_str)
        .ok_or_else(|| bad(name, args, "operator is required"))?;
    let op = CmpOp::parse(operator)?;
    Ok(Some(Predicate::Cmp { path: column.to_string(), op, value }))
}

fn boolean(name: &str, column: &str, args: &Value) -> Result<Option<Predicate>, PageError> {
    let value = match args {
        Value::Object(obj) => obj.get("value").unwrap_or(&Value::Null),
        other => other,
    };
    let flag = match value {
        Value::Null => return Ok(None),
        Value::Bool(b) => *b,
        Value::String(s) if s.trim().is_empty() => return Ok(None),
        Value::String(s) if s.eq_ignore_ascii_case("yes") || s.eq_ignore_ascii_case("true") => true,
        Value::String(s) if s.eq_ignore_ascii_case("no") || s.eq_ignore_ascii_case("false") => false,
        _ => return Err(bad(name, args, "value must be Yes or No")),
    };
    Ok(Some(Predicate::eq(column, Value::Bool(flag))))
}
