use crate::call::{Value, ValueKind};

use std::collections::HashMap;
use std::fmt;

type CallFn = Box<dyn Fn(&[Value]) -> Option<Value>>;
type ValidateFn = Box<dyn Fn(&[Value], &ValidationContext) -> bool>;

/// Context handed to validation hooks while a batch is being validated.
pub struct ValidationContext<'a> {
    /// Id of the story the validated call site belongs to.
    pub story_id: &'a str,
}

/// A single registered function: its signature and its implementation.
pub(crate) struct CallEntry {
    pub params: Vec<ValueKind>,
    pub ret: ValueKind,
    func: CallFn,
    validate: Option<ValidateFn>,
}

impl CallEntry {
    pub(crate) fn call(&self, args: &[Value]) -> Option<Value> {
        (self.func)(args)
    }
}

#[derive(Default)]
/// Host-supplied registry of functions stories may invoke by name.
///
/// Names are lowercased on registration and lookup. Overloads are allowed
/// as long as their parameter lists differ; resolution matches the call
/// site's argument count and types against each overload in registration
/// order.
///
/// # Examples
/// ```
/// use fabula::{CallRegistry, Value, ValueKind};
///
/// let mut registry = CallRegistry::new();
///
/// registry.register("hascard", &[ValueKind::Text], ValueKind::Bool, |args| {
///     let id = match &args[0] {
///         Value::Text(id) => id,
///         _ => return None,
///     };
///     Some(Value::Bool(id == "sword"))
/// });
///
/// let result = registry.invoke("hascard", &[Value::from("sword")]);
/// assert_eq!(result, Some(Value::Bool(true)));
/// ```
pub struct CallRegistry {
    entries: HashMap<String, Vec<CallEntry>>,
}

impl CallRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a function under a name with a fixed signature.
    ///
    /// The function receives the call site's arguments and returns its
    /// result, or `None` to signal failure. Functions registered with a
    /// [`Unit`][ValueKind::Unit] return type should return `None`.
    pub fn register<F>(&mut self, name: &str, params: &[ValueKind], ret: ValueKind, func: F)
    where
        F: Fn(&[Value]) -> Option<Value> + 'static,
    {
        self.entries
            .entry(name.trim().to_lowercase())
            .or_insert_with(Vec::new)
            .push(CallEntry {
                params: params.to_vec(),
                ret,
                func: Box::new(func),
                validate: None,
            });
    }

    /// Attach a validation hook to an already registered overload.
    ///
    /// The hook runs during the batch validation pass with the literal
    /// arguments of each call site and may reject them, e.g. when an
    /// argument names an entity the host does not know.
    pub fn register_validator<F>(&mut self, name: &str, params: &[ValueKind], validate: F)
    where
        F: Fn(&[Value], &ValidationContext) -> bool + 'static,
    {
        let name = name.trim().to_lowercase();

        if let Some(overloads) = self.entries.get_mut(&name) {
            for entry in overloads.iter_mut() {
                if entry.params == params {
                    entry.validate = Some(Box::new(validate));
                    return;
                }
            }
        }
    }

    /// Look up the overload matching a name and argument list.
    pub(crate) fn find(&self, name: &str, args: &[Value]) -> Option<&CallEntry> {
        let overloads = self.entries.get(&name.trim().to_lowercase())?;

        overloads.iter().find(|entry| {
            entry.params.len() == args.len()
                && entry
                    .params
                    .iter()
                    .zip(args.iter())
                    .all(|(param, arg)| *param == arg.kind())
        })
    }

    /// Whether any overload exists under the given name.
    pub fn has(&self, name: &str) -> bool {
        self.entries.contains_key(&name.trim().to_lowercase())
    }

    /// Declared return type of the overload matching a call site.
    pub fn return_kind(&self, name: &str, args: &[Value]) -> Option<ValueKind> {
        self.find(name, args).map(|entry| entry.ret)
    }

    /// Invoke the overload matching a name and argument list.
    ///
    /// Returns `None` when no overload matches or the function fails; the
    /// caller decides the context default and logs the failure.
    pub fn invoke(&self, name: &str, args: &[Value]) -> Option<Value> {
        let entry = self.find(name, args)?;

        (entry.func)(args)
    }

    /// Run the validation hook for a call site, if one is registered.
    ///
    /// Call sites with no hook validate successfully.
    pub(crate) fn run_validator(
        &self,
        name: &str,
        args: &[Value],
        context: &ValidationContext,
    ) -> bool {
        match self.find(name, args).and_then(|entry| entry.validate.as_ref()) {
            Some(validate) => validate(args, context),
            None => true,
        }
    }
}

impl fmt::Debug for CallRegistry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut names: Vec<_> = self.entries.keys().collect();
        names.sort();

        f.debug_struct("CallRegistry").field("names", &names).finish()
    }
}
