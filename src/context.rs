use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::errors::{FormulaError, Result};

/// Variable values for one evaluation.
///
/// Numbers inserted from Rust are kept as `f64`, so infinities and NaN survive.
/// Entries loaded from a JSON document stay JSON; the ones that are not numbers
/// resolve like missing ones. Names are case-sensitive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    vars: HashMap<String, Slot>,
}

/// One stored value.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    Num(f64),
    Json(Value),
}

impl From<f64> for Slot {
    fn from(n: f64) -> Self {
        Slot::Num(n)
    }
}

impl From<Value> for Slot {
    fn from(v: Value) -> Self {
        Slot::Json(v)
    }
}

impl From<&str> for Slot {
    fn from(s: &str) -> Self {
        Slot::Json(Value::String(s.to_string()))
    }
}

impl From<String> for Slot {
    fn from(s: String) -> Self {
        Slot::Json(Value::String(s))
    }
}

impl From<bool> for Slot {
    fn from(b: bool) -> Self {
        Slot::Json(Value::Bool(b))
    }
}

/// Outcome of looking a name up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Lookup<'a> {
    Number(f64),
    NotNumeric(&'a Value),
    Missing,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON object such as `{"valor_total": 25000}`.
    pub fn from_json(json: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| FormulaError::Context(e.to_string()))?;
        match value {
            Value::Object(map) => Ok(Self::from(map)),
            other => Err(FormulaError::Context(format!(
                "expected a JSON object, got {other}"
            ))),
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Slot>) -> Option<Slot> {
        self.vars.insert(name.into(), value.into())
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Slot>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn lookup(&self, name: &str) -> Lookup<'_> {
        match self.vars.get(name) {
            None => Lookup::Missing,
            Some(Slot::Num(n)) => Lookup::Number(*n),
            Some(Slot::Json(v)) => match v.as_f64() {
                Some(n) => Lookup::Number(n),
                None => Lookup::NotNumeric(v),
            },
        }
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl From<Map<String, Value>> for Context {
    fn from(map: Map<String, Value>) -> Self {
        Self {
            vars: map.into_iter().map(|(k, v)| (k, Slot::Json(v))).collect(),
        }
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for Context {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        let mut ctx = Context::new();
        for (k, v) in iter {
            ctx.insert(k, v);
        }
        ctx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn lookup_distinguishes_missing_and_non_numeric() {
        let ctx = Context::new().with("a", 2.5).with("label", "kWp");
        assert_eq!(ctx.lookup("a"), Lookup::Number(2.5));
        assert_eq!(ctx.lookup("label"), Lookup::NotNumeric(&json!("kWp")));
        assert_eq!(ctx.lookup("A"), Lookup::Missing);
    }

    #[test]
    fn from_json_requires_object() {
        let ctx = Context::from_json(r#"{"valor_total": 25000, "n": null}"#).unwrap();
        assert_eq!(ctx.len(), 2);
        assert_eq!(ctx.lookup("valor_total"), Lookup::Number(25000.0));

        let err = Context::from_json("[1, 2]").unwrap_err();
        assert_eq!(err.kind(), "context");
        assert!(Context::from_json("{").is_err());
    }

    #[test]
    fn collects_from_pairs() {
        let ctx: Context = vec![("a", 1.0), ("b", 2.0)].into_iter().collect();
        assert_eq!(ctx.lookup("b"), Lookup::Number(2.0));
    }

    #[test]
    fn non_finite_numbers_stay_numbers() {
        let ctx = Context::new().with("inf", f64::INFINITY);
        assert_eq!(ctx.lookup("inf"), Lookup::Number(f64::INFINITY));
        assert!(matches!(ctx.lookup("inf"), Lookup::Number(n) if n.is_infinite()));

        let ctx: Context = vec![("nan", f64::NAN)].into_iter().collect();
        assert!(matches!(ctx.lookup("nan"), Lookup::Number(n) if n.is_nan()));

        let mut ctx = Context::new();
        ctx.insert("x", json!(3));
        assert_eq!(ctx.insert("x", 4.0), Some(Slot::Json(json!(3))));
        assert_eq!(ctx.lookup("x"), Lookup::Number(4.0));
    }
}
