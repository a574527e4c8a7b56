//! The module linker: dependency-ordered execution and import binding.
//!
//! Cycle rejection happens in the external dependency-ordering pass; the
//! linker's own guard is that it refuses to bind from a module that has not
//! executed yet. Scripts (non-module files) share one script environment so
//! their top-level declarations are mutually visible; each module gets a
//! fresh child of the globals.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use tern_ast::{ExportDecl, ImportSpecifier, SourceFile, Stmt};
use tern_vm_core::env::Env;
use tern_vm_core::interp::AsyncCx;
use tern_vm_core::{Interpreter, ModuleHost, ModuleRecord, Value, VmError, VmResult};

use crate::module::{ModuleInstance, Resolver};

pub struct Linker {
    resolver: Resolver,
    registry: RefCell<FxHashMap<String, Rc<ModuleInstance>>>,
    /// Shared top-level environment for script files.
    script_env: RefCell<Option<Env>>,
}

impl Linker {
    pub fn new(resolver: Resolver) -> Rc<Self> {
        Rc::new(Self { resolver, registry: RefCell::new(FxHashMap::default()), script_env: RefCell::new(None) })
    }

    pub fn instance(&self, canonical: &str) -> Option<Rc<ModuleInstance>> {
        self.registry.borrow().get(canonical).cloned()
    }

    /// Execute `files` in the given order (dependencies first). Each module
    /// executes exactly once; re-running an already-linked path is a no-op.
    pub fn link(self: &Rc<Self>, vm: &mut Interpreter, files: &[SourceFile]) -> VmResult<Vec<Rc<ModuleInstance>>> {
        let mut out = Vec::with_capacity(files.len());
        for file in files {
            out.push(self.execute_file(vm, file)?);
        }
        Ok(out)
    }

    fn script_env(&self, vm: &Interpreter) -> Env {
        let mut slot = self.script_env.borrow_mut();
        slot.get_or_insert_with(|| vm.globals.child()).clone()
    }

    fn execute_file(self: &Rc<Self>, vm: &mut Interpreter, file: &SourceFile) -> VmResult<Rc<ModuleInstance>> {
        let canonical = self.resolver.canonicalize(&file.path);
        if let Some(existing) = self.instance(&canonical) {
            return Ok(existing);
        }
        debug!(path = %canonical, is_module = file.is_module, "executing module");

        let env = if file.is_module { vm.globals.child() } else { self.script_env(vm) };
        let record = ModuleRecord::new(canonical.clone());

        self.bind_imports(&canonical, &env, &file.body)?;

        let saved_module = vm.current_module.replace(record.clone());
        // top level runs suspension-aware so top-level await works
        let outcome = vm.run_scoped(&AsyncCx, &env, &file.body);
        vm.current_module = saved_module;

        match outcome {
            Ok(_) => {}
            // engine-fatal conditions (process.exit, blown stack) propagate
            Err(e @ (VmError::Internal(_) | VmError::StackOverflow)) => return Err(e),
            Err(e) => {
                // an unhandled throw stops this module's remaining top-level
                // statements but not the process
                warn!(path = %canonical, "top-level throw: {}", e.message());
                vm.write_err(&format!("Runtime Error: {}\n", e.message()));
            }
        }

        self.copy_re_exports(&canonical, &file.body, &record)?;

        let instance = Rc::new(ModuleInstance { path: canonical.clone(), record, env });
        self.registry.borrow_mut().insert(canonical, instance.clone());
        Ok(instance)
    }

    /// Pre-bind every import into the module environment. The source module
    /// must already be in the registry — topological order guarantees it.
    fn bind_imports(&self, importer: &str, env: &Env, body: &[Stmt]) -> VmResult<()> {
        for stmt in body {
            match stmt {
                Stmt::Import(decl) => {
                    if decl.type_only {
                        continue;
                    }
                    let source = self.require_executed(importer, &decl.source)?;
                    for specifier in &decl.specifiers {
                        match specifier {
                            ImportSpecifier::Default(local) => {
                                let value =
                                    source.record.default_export.borrow().clone().ok_or_else(|| {
                                        VmError::reference_error(format!(
                                            "module '{}' has no default export",
                                            source.path
                                        ))
                                    })?;
                                env.define(local.clone(), value);
                            }
                            ImportSpecifier::Namespace(local) => {
                                env.define(local.clone(), source.namespace_view());
                            }
                            ImportSpecifier::Named { exported, local } => {
                                let value = source.record.get_export(exported).ok_or_else(|| {
                                    VmError::reference_error(format!(
                                        "module '{}' does not export '{exported}'",
                                        source.path
                                    ))
                                })?;
                                env.define(local.clone(), value);
                            }
                            ImportSpecifier::TypeOnly(_) => {}
                        }
                    }
                }
                Stmt::ImportRequire { name, source } => {
                    let source = self.require_executed(importer, source)?;
                    // `export =` wins over the namespace view
                    let value = source
                        .record
                        .export_assignment
                        .borrow()
                        .clone()
                        .unwrap_or_else(|| source.namespace_view());
                    env.define(name.clone(), value);
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Copy re-exports (`export {x} from 'p'`, `export * from 'p'`) from
    /// their already-executed sources.
    fn copy_re_exports(&self, importer: &str, body: &[Stmt], record: &Rc<ModuleRecord>) -> VmResult<()> {
        for stmt in body {
            match stmt {
                Stmt::Export(ExportDecl::Named { specifiers, source: Some(source) }) => {
                    let source = self.require_executed(importer, source)?;
                    for (exported_there, exported_here) in specifiers {
                        let value = source.record.get_export(exported_there).ok_or_else(|| {
                            VmError::reference_error(format!(
                                "module '{}' does not export '{exported_there}'",
                                source.path
                            ))
                        })?;
                        record.set_export(exported_here.clone(), value);
                    }
                }
                Stmt::Export(ExportDecl::Star { source }) => {
                    let source = self.require_executed(importer, source)?;
                    for (k, v) in source.record.exports.borrow().iter() {
                        record.set_export(k.clone(), v.clone());
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn require_executed(&self, importer: &str, specifier: &str) -> VmResult<Rc<ModuleInstance>> {
        let canonical = self.resolver.resolve(importer, specifier);
        self.instance(&canonical).ok_or_else(|| {
            VmError::internal(format!(
                "module '{canonical}' imported by '{importer}' has not executed yet (dependency order violated)"
            ))
        })
    }
}

impl ModuleHost for Linker {
    fn dynamic_import(&self, specifier: &str, from: &str) -> VmResult<Value> {
        let canonical = self.resolver.resolve(from, specifier);
        self.instance(&canonical)
            .map(|m| m.namespace_view())
            .ok_or_else(|| VmError::reference_error(format!("Cannot find module '{specifier}'")))
    }
}
