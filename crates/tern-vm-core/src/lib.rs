//! Core execution engine for Tern: the tagged value domain, the shared heap
//! objects, lexical environments, the dual sync/async tree-walking
//! evaluator, generator state machines, and the built-in method tables.
//!
//! The runtime crate (`tern-vm-runtime`) layers module linking, the event
//! loop and the process surface on top of this; the parser and type checker
//! produce the `tern-ast` artifacts this crate consumes.

pub mod array;
pub mod builtins;
pub mod date;
pub mod env;
pub mod error;
pub mod error_object;
pub mod function;
pub mod generator;
pub mod interp;
pub mod map_data;
pub mod object;
pub mod promise;
pub mod regexp;
pub mod symbol;
pub mod timeout;
pub mod typed_array;
pub mod value;

pub use error::{ErrorKind, VmError, VmResult};
pub use interp::{AsyncCx, Completion, EvalContext, EventLoopHook, Interpreter, Job, ModuleHost, ModuleRecord, OutputSink, SyncCx};
pub use value::{HeapRef, Value};
