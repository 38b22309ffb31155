use serde_json::Value;
use std::sync::{Arc, Mutex};

use crate::errors::FormulaError;

/// Hook for the soft failures the engine swallows.
///
/// `evaluate` never fails loudly; an observer is how an embedder learns that a
/// variable was defaulted to zero or that a formula could not be computed.
pub trait Observer: Send + Sync {
    /// `value` is `None` when the name is absent, or the non-numeric value found.
    fn unresolved_variable(&self, name: &str, value: Option<&Value>);
    fn evaluation_failed(&self, expression: &str, error: &FormulaError);
}

impl<O: Observer + ?Sized> Observer for Arc<O> {
    fn unresolved_variable(&self, name: &str, value: Option<&Value>) {
        (**self).unresolved_variable(name, value)
    }

    fn evaluation_failed(&self, expression: &str, error: &FormulaError) {
        (**self).evaluation_failed(expression, error)
    }
}

/// What a [`builtins::RecordingObserver`] keeps.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    UnresolvedVariable { name: String, value: Option<Value> },
    EvaluationFailed { expression: String, error: FormulaError },
}

pub mod builtins {
    use super::*;

    /// Default observer: warnings through `tracing`.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct TracingObserver;

    impl Observer for TracingObserver {
        fn unresolved_variable(&self, name: &str, value: Option<&Value>) {
            match value {
                None => tracing::warn!(variable = name, "variable not found, using 0"),
                Some(v) => {
                    tracing::warn!(variable = name, value = %v, "variable is not numeric, using 0")
                }
            }
        }

        fn evaluation_failed(&self, expression: &str, error: &FormulaError) {
            tracing::warn!(
                expression,
                kind = error.kind(),
                error = %error,
                "could not evaluate expression"
            );
        }
    }

    #[derive(Debug, Clone, Copy, Default)]
    pub struct SilentObserver;

    impl Observer for SilentObserver {
        fn unresolved_variable(&self, _name: &str, _value: Option<&Value>) {}
        fn evaluation_failed(&self, _expression: &str, _error: &FormulaError) {}
    }

    /// Keeps every event in memory, e.g. to show them next to a template.
    #[derive(Debug, Default)]
    pub struct RecordingObserver {
        events: Mutex<Vec<Event>>,
    }

    impl RecordingObserver {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn events(&self) -> Vec<Event> {
            self.lock().clone()
        }

        /// Names reported as unresolved, in report order.
        pub fn unresolved(&self) -> Vec<String> {
            self.lock()
                .iter()
                .filter_map(|e| match e {
                    Event::UnresolvedVariable { name, .. } => Some(name.clone()),
                    Event::EvaluationFailed { .. } => None,
                })
                .collect()
        }

        pub fn take(&self) -> Vec<Event> {
            std::mem::take(&mut *self.lock())
        }

        fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Event>> {
            // a poisoned log is still a usable log
            self.events.lock().unwrap_or_else(|p| p.into_inner())
        }
    }

    impl Observer for RecordingObserver {
        fn unresolved_variable(&self, name: &str, value: Option<&Value>) {
            self.lock().push(Event::UnresolvedVariable {
                name: name.to_string(),
                value: value.cloned(),
            });
        }

        fn evaluation_failed(&self, expression: &str, error: &FormulaError) {
            self.lock().push(Event::EvaluationFailed {
                expression: expression.to_string(),
                error: error.clone(),
            });
        }
    }
}
