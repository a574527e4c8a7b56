//! Module instances and path resolution.

use std::rc::Rc;

use tern_vm_core::env::Env;
use tern_vm_core::object::JsObject;
use tern_vm_core::{ModuleRecord, Value};

/// A resolved module: its export record plus its post-execution
/// environment. Owned by the linker registry for the life of the process.
pub struct ModuleInstance {
    pub path: String,
    pub record: Rc<ModuleRecord>,
    pub env: Env,
}

impl ModuleInstance {
    /// Object view of all exports (`import * as ns`), default included
    /// under its own key. Frozen: namespace objects are not writable.
    pub fn namespace_view(&self) -> Value {
        let obj = JsObject::new();
        for (k, v) in self.record.exports.borrow().iter() {
            obj.set(k.clone(), v.clone());
        }
        if let Some(default) = self.record.default_export.borrow().clone() {
            obj.set("default", default);
        }
        obj.freeze();
        Value::object(Rc::new(obj))
    }
}

/// Maps import specifiers to canonical paths. Paths with and without the
/// source extension resolve identically; nested directories are supported.
pub struct Resolver {
    /// Source extension, without the dot.
    pub extension: String,
}

impl Resolver {
    pub fn new(extension: impl Into<String>) -> Self {
        Self { extension: extension.into() }
    }

    /// Canonicalize a path already relative to the compilation root.
    pub fn canonicalize(&self, path: &str) -> String {
        let with_ext = if path.ends_with(&format!(".{}", self.extension)) {
            path.to_string()
        } else {
            format!("{path}.{}", self.extension)
        };
        normalize(&with_ext)
    }

    /// Resolve `specifier` against the importing module's path.
    pub fn resolve(&self, from: &str, specifier: &str) -> String {
        if let Some(rest) = specifier.strip_prefix("./") {
            let dir = parent_dir(from);
            return self.canonicalize(&join(dir, rest));
        }
        if specifier.starts_with("../") {
            let dir = parent_dir(from);
            return self.canonicalize(&join(dir, specifier));
        }
        self.canonicalize(specifier)
    }
}

fn parent_dir(path: &str) -> &str {
    match path.rfind('/') {
        Some(i) => &path[..i],
        None => "",
    }
}

fn join(dir: &str, rest: &str) -> String {
    if dir.is_empty() { rest.to_string() } else { format!("{dir}/{rest}") }
}

/// Collapse `.` and `..` segments.
fn normalize(path: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_optional_paths_canonicalize_identically() {
        let r = Resolver::new("tn");
        assert_eq!(r.canonicalize("lib/util"), r.canonicalize("lib/util.tn"));
    }

    #[test]
    fn relative_resolution_handles_nesting() {
        let r = Resolver::new("tn");
        assert_eq!(r.resolve("app/main.tn", "./util"), "app/util.tn");
        assert_eq!(r.resolve("app/sub/mod.tn", "../shared"), "app/shared.tn");
        assert_eq!(r.resolve("app/main.tn", "lib/deep/thing"), "lib/deep/thing.tn");
    }
}
