//! The `console` global: JS-style value formatting through the swappable
//! output sink.

use std::rc::Rc;

use tern_vm_core::function::NativeFunction;
use tern_vm_core::object::JsObject;
use tern_vm_core::{HeapRef, Value};

/// Nesting depth cap for object/array rendering.
const MAX_DEPTH: usize = 4;

/// Render one console argument. Top-level strings print unquoted; nested
/// ones are quoted.
pub fn format_value(value: &Value, depth: usize, top_level: bool) -> String {
    match value {
        Value::String(s) if top_level => s.to_string(),
        Value::String(s) => format!("'{s}'"),
        Value::Ref(HeapRef::Array(a)) => {
            if depth >= MAX_DEPTH {
                return "[Array]".to_string();
            }
            let items: Vec<String> =
                a.iter_snapshot().iter().map(|v| format_value(v, depth + 1, false)).collect();
            if items.is_empty() { "[]".to_string() } else { format!("[ {} ]", items.join(", ")) }
        }
        Value::Ref(HeapRef::Object(o)) => {
            if depth >= MAX_DEPTH {
                return "[Object]".to_string();
            }
            let entries: Vec<String> = o
                .entries()
                .iter()
                .map(|(k, v)| format!("{k}: {}", format_value(v, depth + 1, false)))
                .collect();
            if entries.is_empty() { "{}".to_string() } else { format!("{{ {} }}", entries.join(", ")) }
        }
        Value::Ref(HeapRef::Instance(inst)) => {
            if depth >= MAX_DEPTH {
                return format!("[{}]", inst.class.name);
            }
            let entries: Vec<String> = inst
                .fields
                .borrow()
                .iter()
                .map(|(k, v)| format!("{k}: {}", format_value(v, depth + 1, false)))
                .collect();
            if entries.is_empty() {
                format!("{} {{}}", inst.class.name)
            } else {
                format!("{} {{ {} }}", inst.class.name, entries.join(", "))
            }
        }
        Value::Ref(HeapRef::Map(m)) => {
            let entries: Vec<String> = m
                .entries_snapshot()
                .iter()
                .map(|(k, v)| {
                    format!("{} => {}", format_value(k, depth + 1, false), format_value(v, depth + 1, false))
                })
                .collect();
            format!("Map({}) {{ {} }}", entries.len(), entries.join(", "))
        }
        Value::Ref(HeapRef::Set(s)) => {
            let members: Vec<String> =
                s.values_snapshot().iter().map(|v| format_value(v, depth + 1, false)).collect();
            format!("Set({}) {{ {} }}", members.len(), members.join(", "))
        }
        Value::Ref(HeapRef::Promise(p)) => match p.state() {
            tern_vm_core::promise::PromiseState::Pending => "Promise { <pending> }".to_string(),
            tern_vm_core::promise::PromiseState::Fulfilled(v) => {
                format!("Promise {{ {} }}", format_value(&v, depth + 1, false))
            }
            tern_vm_core::promise::PromiseState::Rejected(r) => {
                format!("Promise {{ <rejected> {} }}", format_value(&r, depth + 1, false))
            }
        },
        other => other.to_display_string(),
    }
}

fn format_args(args: &[Value]) -> String {
    let parts: Vec<String> = args.iter().map(|v| format_value(v, 0, true)).collect();
    parts.join(" ")
}

/// Build the `console` global.
pub fn create_console_object() -> Value {
    let obj = JsObject::new();
    for name in ["log", "info", "debug"] {
        obj.set(
            name,
            Value::Ref(HeapRef::Native(NativeFunction::new(name, |vm, _this, args| {
                vm.write_out(&format!("{}\n", format_args(args)));
                Ok(Value::Undefined)
            }))),
        );
    }
    for name in ["error", "warn"] {
        obj.set(
            name,
            Value::Ref(HeapRef::Native(NativeFunction::new(name, |vm, _this, args| {
                vm.write_err(&format!("{}\n", format_args(args)));
                Ok(Value::Undefined)
            }))),
        );
    }
    Value::object(Rc::new(obj))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tern_vm_core::array::JsArray;

    #[test]
    fn top_level_strings_are_unquoted_nested_are_quoted() {
        assert_eq!(format_value(&Value::string("hi"), 0, true), "hi");
        let arr = Value::array(Rc::new(JsArray::from_vec(vec![Value::string("hi"), Value::Number(2.0)])));
        assert_eq!(format_value(&arr, 0, true), "[ 'hi', 2 ]");
    }

    #[test]
    fn objects_render_in_insertion_order() {
        let obj = tern_vm_core::object::JsObject::new();
        obj.set("b", Value::Number(1.0));
        obj.set("a", Value::Boolean(true));
        assert_eq!(format_value(&Value::object(Rc::new(obj)), 0, true), "{ b: 1, a: true }");
    }
}
