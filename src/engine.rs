use serde::{Deserialize, Serialize};

use crate::errors::{FormulaError, Result};

/// =========================
/// Options
/// =========================

/// Deepest nesting evaluated by default; each level costs three stack frames.
pub const DEFAULT_MAX_DEPTH: usize = 1_000;
pub const DEFAULT_MAX_LENGTH: usize = 1_000_000;

/// Resource guards applied before and during evaluation.
///
/// `None` disables a guard. Loadable from JSON, missing fields take defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalOptions {
    /// Maximum expression length in characters.
    pub max_length: Option<usize>,
    /// Maximum nesting of parentheses and unary minus.
    pub max_depth: Option<usize>,
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self {
            max_length: Some(DEFAULT_MAX_LENGTH),
            max_depth: Some(DEFAULT_MAX_DEPTH),
        }
    }
}

impl EvalOptions {
    pub fn unbounded() -> Self {
        Self {
            max_length: None,
            max_depth: None,
        }
    }

    pub(crate) fn check_length(&self, expression: &str) -> Result<()> {
        if let Some(max) = self.max_length {
            let len = expression.chars().count();
            if len > max {
                return Err(FormulaError::Limit(format!(
                    "expression is {len} characters long, limit is {max}"
                )));
            }
        }
        Ok(())
    }
}

/// =========================
/// Public result types
/// =========================

/// Authoring-time verdict on an expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self {
            valid: true,
            error: None,
        }
    }

    pub fn invalid(err: &FormulaError) -> Self {
        Self {
            valid: false,
            error: Some(err.to_string()),
        }
    }
}

impl From<Result<()>> for ValidationResult {
    fn from(r: Result<()>) -> Self {
        match r {
            Ok(()) => Self::ok(),
            Err(e) => Self::invalid(&e),
        }
    }
}

/// A tenant-defined variable as stored in a proposal template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomVariable {
    pub name: String,
    pub expression: String,
}

/// Round to 4 decimals, halves toward +inf. Non-finite input or output is `None`.
pub(crate) fn round4(x: f64) -> Option<f64> {
    if !x.is_finite() {
        return None;
    }
    let scaled = x * 10_000.0;
    if !scaled.is_finite() {
        return None;
    }
    let floor = scaled.floor();
    let rounded = if scaled - floor >= 0.5 { floor + 1.0 } else { floor };
    // + 0.0 turns -0 into 0
    let out = rounded / 10_000.0 + 0.0;
    out.is_finite().then_some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn rounds_to_four_places() {
        assert_eq!(round4(1.0 / 3.0), Some(0.3333));
        assert_eq!(round4(2.0 / 3.0), Some(0.6667));
        assert_eq!(round4(14.0), Some(14.0));
        assert_eq!(round4(-2.0), Some(-2.0));
    }

    #[test]
    fn negative_values_round_to_nearest() {
        assert_eq!(round4(-0.00004), Some(0.0));
        assert_eq!(round4(-0.00006), Some(-0.0001));
        assert_eq!(round4(-1.0 / 3.0), Some(-0.3333));
    }

    #[test]
    fn exact_halves_round_toward_positive_infinity() {
        assert_eq!(round4(0.5 / 10_000.0), Some(0.0001));
        assert_eq!(round4(-0.5 / 10_000.0), Some(0.0));
        assert_eq!(round4(-2.5 / 10_000.0), Some(-0.0002));
    }

    #[test]
    fn negative_zero_is_normalized() {
        let r = round4(-0.0).unwrap();
        assert!(r == 0.0 && r.is_sign_positive());
        assert!(round4(-0.00001).unwrap().is_sign_positive());
    }

    #[test]
    fn non_finite_is_none() {
        assert_eq!(round4(f64::INFINITY), None);
        assert_eq!(round4(f64::NAN), None);
        assert_eq!(round4(f64::MAX), None);
    }

    #[test]
    fn length_guard() {
        let opts = EvalOptions {
            max_length: Some(3),
            max_depth: None,
        };
        assert!(opts.check_length("1+2").is_ok());
        assert_eq!(
            opts.check_length("1+22").unwrap_err().to_string(),
            "expression is 4 characters long, limit is 3"
        );
        assert!(EvalOptions::unbounded().check_length(&"1".repeat(50_000)).is_ok());
    }

    #[test]
    fn default_guards_accept_long_formulas() {
        let opts = EvalOptions::default();
        let long = vec!["[valor_total]"; 10_000].join("+");
        assert!(opts.check_length(&long).is_ok());
        assert!(opts.check_length(&"1".repeat(DEFAULT_MAX_LENGTH + 1)).is_err());
    }

    #[test]
    fn options_from_json() {
        let opts: EvalOptions = serde_json::from_str(r#"{"max_depth": 8}"#).unwrap();
        assert_eq!(opts.max_depth, Some(8));
        assert_eq!(opts.max_length, Some(DEFAULT_MAX_LENGTH));

        let opts: EvalOptions =
            serde_json::from_str(r#"{"max_length": null, "max_depth": null}"#).unwrap();
        assert_eq!(opts, EvalOptions::unbounded());
    }

    #[test]
    fn validation_result_json_shape() {
        let ok = serde_json::to_string(&ValidationResult::ok()).unwrap();
        assert_eq!(ok, r#"{"valid":true}"#);
        let bad = ValidationResult::invalid(&FormulaError::Empty);
        assert_eq!(
            serde_json::to_value(&bad).unwrap(),
            serde_json::json!({"valid": false, "error": "empty expression"})
        );
    }
}
