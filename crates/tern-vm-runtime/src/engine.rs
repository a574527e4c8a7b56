//! The top-level driver: link, run, invoke `main`, drain, dispose.

use std::rc::Rc;

use tracing::debug;

use tern_ast::{Resolutions, SourceFile, TypeMap};
use tern_vm_core::interp::{AsyncCx, EvalContext, OutputSink};
use tern_vm_core::{HeapRef, Interpreter, Value, VmError, VmResult};

use crate::event_loop::EventLoop;
use crate::globals::install_globals;
use crate::linker::Linker;
use crate::module::Resolver;
use crate::process::ExitRequest;

/// Engine options.
pub struct EngineOptions {
    /// Source extension for module resolution.
    pub extension: String,
    /// `[runtime, script, ...user args]`.
    pub argv: Vec<String>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self { extension: "tn".to_string(), argv: vec!["tern".to_string()] }
    }
}

/// The runtime engine: owns the interpreter, the event loop and the linker.
pub struct Engine {
    pub vm: Interpreter,
    event_loop: Rc<EventLoop>,
    linker: Rc<Linker>,
    exit: ExitRequest,
}

impl Engine {
    pub fn new(resolutions: Rc<Resolutions>, type_map: Rc<TypeMap>, options: EngineOptions) -> Self {
        let mut vm = Interpreter::new(resolutions, type_map);
        let event_loop = Rc::new(EventLoop::new());
        let linker = Linker::new(Resolver::new(options.extension.clone()));
        let exit = ExitRequest::new();

        install_globals(&mut vm, &event_loop, &options.argv, &exit);
        vm.event_loop = Some(event_loop.clone());
        vm.module_host = Some(linker.clone());

        Self { vm, event_loop, linker, exit }
    }

    pub fn with_sink(mut self, sink: Rc<dyn OutputSink>) -> Self {
        self.vm = self.vm.with_sink(sink);
        self
    }

    pub fn linker(&self) -> &Rc<Linker> {
        &self.linker
    }

    pub fn event_loop(&self) -> &Rc<EventLoop> {
        &self.event_loop
    }

    /// Run a program: execute `files` in dependency order (entry last),
    /// invoke a declared `main(argv?)`, drain the event loop, dispose.
    /// Returns the process exit code.
    pub fn run(&mut self, files: &[SourceFile]) -> VmResult<i32> {
        let instances = match self.linker.link(&mut self.vm, files) {
            Ok(instances) => instances,
            Err(VmError::Internal(tag)) if tag == "process.exit" => {
                let code = self.exit.code.get().unwrap_or(0);
                self.shutdown();
                return Ok(code);
            }
            Err(e) => return Err(e),
        };

        if let Some(code) = self.exit.code.get() {
            self.shutdown();
            return Ok(code);
        }

        let mut exit_code = 0;
        if let Some(entry) = instances.last() {
            match self.invoke_main(&entry.env) {
                Ok(Some(code)) => exit_code = code,
                Ok(None) => {}
                Err(VmError::Internal(tag)) if tag == "process.exit" => {}
                Err(e) => {
                    self.vm.write_err(&format!("Runtime Error: {}\n", e.message()));
                    exit_code = 1;
                }
            }
        }
        if let Some(code) = self.exit.code.get() {
            self.shutdown();
            return Ok(code);
        }

        self.event_loop.run_until_idle(&mut self.vm)?;

        // an explicit process.exitCode wins over main()'s return
        if let Some(code) = self.exit_code_property() {
            if code != 0 {
                exit_code = code;
            }
        }
        let final_code = self.exit.code.get().unwrap_or(exit_code);
        self.shutdown();
        Ok(final_code)
    }

    /// Invoke `main(argv?)` when the entry module declares it with an
    /// acceptable signature. Numeric return becomes the exit code; promise
    /// returns are awaited; a throw aborts with a non-zero exit.
    fn invoke_main(&mut self, entry_env: &tern_vm_core::env::Env) -> VmResult<Option<i32>> {
        let Ok(main) = entry_env.lookup("main") else { return Ok(None) };
        if !main.is_callable() {
            return Ok(None);
        }
        if let Value::Ref(HeapRef::Function(f)) = &main
            && f.arity() > 1
        {
            return Ok(None);
        }
        debug!("invoking main()");
        let argv = self
            .vm
            .globals
            .lookup("process")
            .ok()
            .and_then(|p| p.as_object().and_then(|o| o.get("argv")))
            .unwrap_or(Value::Undefined);
        let result = self.vm.call_value(&AsyncCx, &main, Value::Undefined, vec![argv])?;
        let result = AsyncCx.resolve(&mut self.vm, result)?;
        Ok(result.as_number().map(|n| n as i32))
    }

    fn exit_code_property(&self) -> Option<i32> {
        self.vm
            .globals
            .lookup("process")
            .ok()
            .and_then(|p| p.as_object().and_then(|o| o.get("exitCode")))
            .and_then(|v| v.as_number())
            .map(|n| n as i32)
    }

    /// Shutdown: flip the disposed flag (every pending timer callback
    /// checks it), cancel timers, drop loop state.
    fn shutdown(&mut self) {
        self.vm.dispose();
        self.event_loop.dispose();
    }
}
