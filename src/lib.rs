pub mod errors;
pub mod context;
pub mod engine;
pub mod observer;  // warning hook for soft failures
pub mod lexer;
mod expression;
mod extract;

use lazy_static::lazy_static;
use std::collections::BTreeMap;
use std::sync::Arc;

use engine::round4;
use observer::builtins::{SilentObserver, TracingObserver};

pub use context::{Context, Lookup, Slot};
pub use engine::{CustomVariable, EvalOptions, ValidationResult, DEFAULT_MAX_DEPTH, DEFAULT_MAX_LENGTH};
pub use errors::{FormulaError, Result};
pub use extract::extract_variables;
pub use observer::{Event, Observer};

/// Safe evaluator for template formulas such as `[economia_anual]/[valor_total]*100`.
///
/// Holds no per-call state, so one instance can be shared between threads.
#[derive(Clone)]
pub struct Evaluator {
    options: EvalOptions,
    observer: Arc<dyn Observer>,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl Evaluator {
    pub fn new() -> Self {
        Self {
            options: EvalOptions::default(),
            observer: Arc::new(TracingObserver),
        }
    }

    pub fn with_options(mut self, options: EvalOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_observer<O: Observer + 'static>(mut self, observer: O) -> Self {
        self.observer = Arc::new(observer);
        self
    }

    pub fn options(&self) -> &EvalOptions {
        &self.options
    }

    /// Compute a formula, rounded to 4 decimals.
    ///
    /// `None` means "could not compute": empty input, a syntax error, or a
    /// non-finite result. Errors are reported to the observer, never returned.
    pub fn evaluate(&self, expression: &str, ctx: &Context) -> Option<f64> {
        if expression.trim().is_empty() {
            return None;
        }
        match self.run(expression, ctx, self.observer.as_ref()) {
            Ok(raw) => {
                let out = round4(raw);
                tracing::debug!(expression, raw, result = ?out, "evaluated");
                out
            }
            Err(e) => {
                self.observer.evaluation_failed(expression, &e);
                None
            }
        }
    }

    /// Grammar check only: variables are not required and resolve to 0 silently.
    pub fn validate_expression(&self, expression: &str) -> ValidationResult {
        if expression.trim().is_empty() {
            return ValidationResult::invalid(&FormulaError::Empty);
        }
        self.run(expression, &Context::new(), &SilentObserver)
            .map(|_| ())
            .into()
    }

    /// Evaluate every custom variable of a template against the same context.
    ///
    /// Variables do not see each other's results.
    pub fn evaluate_all(
        &self,
        vars: &[CustomVariable],
        ctx: &Context,
    ) -> BTreeMap<String, Option<f64>> {
        vars.iter()
            .map(|v| (v.name.clone(), self.evaluate(&v.expression, ctx)))
            .collect()
    }

    pub fn extract_variables(&self, expression: &str) -> Vec<String> {
        extract::extract_variables(expression)
    }

    fn run(&self, expression: &str, ctx: &Context, observer: &dyn Observer) -> Result<f64> {
        self.options.check_length(expression)?;
        let tokens = lexer::tokenize(expression)?;
        tracing::trace!(count = tokens.len(), "tokenized");
        crate::expression::eval_tokens(&tokens, ctx, observer, self.options.max_depth)
    }
}

lazy_static! {
    static ref DEFAULT: Evaluator = Evaluator::new();
}

/// Convenience: evaluate with default options and `tracing` warnings.
pub fn evaluate(expression: &str, ctx: &Context) -> Option<f64> {
    DEFAULT.evaluate(expression, ctx)
}

/// Convenience: validate with default options.
pub fn validate_expression(expression: &str) -> ValidationResult {
    DEFAULT.validate_expression(expression)
}
