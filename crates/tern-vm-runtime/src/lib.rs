//! Module linker, event loop and process surface for the Tern VM.
//!
//! The execution pipeline: the host parses and type-checks source into
//! `tern-ast` artifacts, the [`Linker`] executes modules in dependency
//! order against a `tern-vm-core` interpreter, and the [`Engine`] drives
//! the whole program — top-level statements, `main()`, then the
//! [`EventLoop`] until no refed handles and no live timers remain.
//!
//! [`Linker`]: linker::Linker
//! [`Engine`]: engine::Engine
//! [`EventLoop`]: event_loop::EventLoop

pub mod console;
pub mod engine;
pub mod event_loop;
pub mod globals;
pub mod handles;
pub mod linker;
pub mod module;
pub mod process;
pub mod timer;

pub use engine::{Engine, EngineOptions};
pub use event_loop::EventLoop;
pub use linker::Linker;
pub use module::{ModuleInstance, Resolver};
