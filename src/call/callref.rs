use crate::{
    call::{CallRegistry, ValidationContext, Value, ValueKind},
    log::{Logger, Warning},
};

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
/// A bound call site: a registry name plus literal arguments.
///
/// Call sites appear as standalone effects, embedded in requirement leaves,
/// as the written value of a `~set`, and inside templated text. The target
/// function is resolved by name and argument types on every invocation, so
/// a `CallRef` round-trips through the binary format without carrying any
/// function pointer.
pub struct CallRef {
    /// Lowercase function name.
    pub name: String,
    /// Literal arguments in call order.
    pub args: Vec<Value>,
    /// Return type resolved against a registry, if one was available.
    pub ret: Option<ValueKind>,
    /// Original call text for diagnostics.
    pub source: String,
}

impl CallRef {
    pub(crate) fn new(name: String, args: Vec<Value>, source: String) -> Self {
        CallRef {
            name,
            args,
            ret: None,
            source,
        }
    }

    /// Resolve the declared return type against a registry.
    ///
    /// Logs a binding warning when no overload matches. Safe to call again
    /// after loading from binary, where the resolved type is restored but
    /// the registry may have changed.
    pub(crate) fn bind(&mut self, registry: &CallRegistry, logger: &mut Logger) -> bool {
        match registry.return_kind(&self.name, &self.args) {
            Some(kind) => {
                self.ret = Some(kind);
                true
            }
            None => {
                logger.warn(
                    Warning::CallBindingFailed {
                        name: self.name.clone(),
                    },
                    None,
                );
                false
            }
        }
    }

    /// Run the call's validation hook, if its registry entry has one.
    pub(crate) fn validate(
        &self,
        registry: &CallRegistry,
        context: &ValidationContext,
        logger: &mut Logger,
    ) -> bool {
        if registry.find(&self.name, &self.args).is_none() {
            logger.warn(
                Warning::CallBindingFailed {
                    name: self.name.clone(),
                },
                None,
            );
            return false;
        }

        if !registry.run_validator(&self.name, &self.args, context) {
            logger.warn(
                Warning::CallValidateFailed {
                    name: self.name.clone(),
                },
                None,
            );
            return false;
        }

        true
    }

    /// Invoke the call, returning `None` on any failure.
    ///
    /// Failures are logged; callers substitute the context default (a false
    /// requirement, a skipped set, an empty print substitution).
    pub(crate) fn invoke(&self, registry: &CallRegistry, logger: &mut Logger) -> Option<Value> {
        match registry.find(&self.name, &self.args) {
            Some(entry) => {
                let result = entry.call(&self.args);

                if result.is_none() && entry.ret != ValueKind::Unit {
                    logger.warn(
                        Warning::CallFailed {
                            name: self.name.clone(),
                        },
                        None,
                    );
                }

                result
            }
            None => {
                logger.warn(
                    Warning::CallBindingFailed {
                        name: self.name.clone(),
                    },
                    None,
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_registry() -> CallRegistry {
        let mut registry = CallRegistry::new();

        registry.register("mostlove", &[], ValueKind::Text, |_| {
            Some(Value::from("anemone"))
        });

        registry
    }

    #[test]
    fn binding_resolves_the_return_kind() {
        let registry = sample_registry();
        let mut logger = Logger::default();

        let mut call = CallRef::new("mostlove".to_string(), Vec::new(), "call".to_string());

        assert!(call.bind(&registry, &mut logger));
        assert_eq!(call.ret, Some(ValueKind::Text));
        assert!(logger.is_empty());
    }

    #[test]
    fn binding_an_unknown_call_logs_a_warning() {
        let registry = sample_registry();
        let mut logger = Logger::default();

        let mut call = CallRef::new("hascard".to_string(), Vec::new(), "call".to_string());

        assert!(!call.bind(&registry, &mut logger));
        assert_eq!(logger.len(), 1);
    }

    #[test]
    fn invoking_an_unbound_call_returns_none_and_logs() {
        let registry = sample_registry();
        let mut logger = Logger::default();

        let call = CallRef::new("hascard".to_string(), Vec::new(), "call".to_string());

        assert_eq!(call.invoke(&registry, &mut logger), None);
        assert_eq!(logger.len(), 1);
    }
}
