//! The boundary through which stories invoke host code.
//!
//! Hosts register named functions with fixed parameter and return types;
//! story text reaches them through `~call name(args)` effects, `call_`
//! requirement leaves and `[=call_name(args)]` print substitutions. A call
//! site is resolved by lowercase name plus the number and types of its
//! arguments, so one name may have several overloads.
//!
//! Calls are best-effort by contract: an unresolved or failing call is
//! logged and evaluates to the context's default value, never aborting
//! parsing or interpretation.

mod callref;
mod registry;
mod value;

pub use callref::CallRef;
pub use registry::{CallRegistry, ValidationContext};
pub use value::{parse_bool_int_string, Value, ValueKind};
