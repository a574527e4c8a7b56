//! RegExp prototype methods: `test`/`exec` with global/`lastIndex`
//! semantics.

use std::rc::Rc;

use crate::array::JsArray;
use crate::error::{VmError, VmResult};
use crate::interp::{EvalContext, Interpreter};
use crate::regexp::JsRegExp;
use crate::value::{HeapRef, Value};

fn receiver(recv: &Value) -> VmResult<Rc<JsRegExp>> {
    match recv {
        Value::Ref(HeapRef::RegExp(re)) => Ok(re.clone()),
        _ => Err(VmError::type_error("receiver is not a RegExp")),
    }
}

fn search_start(re: &JsRegExp) -> usize {
    if re.is_global() || re.is_sticky() { re.last_index() } else { 0 }
}

fn test(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    let re = receiver(recv)?;
    let text = args[0].to_display_string();
    match re.find_at(&text, search_start(&re)) {
        Some(m) => {
            if re.is_global() || re.is_sticky() {
                re.set_last_index(m.end);
            }
            Ok(Value::Boolean(true))
        }
        None => {
            if re.is_global() || re.is_sticky() {
                re.set_last_index(0);
            }
            Ok(Value::Boolean(false))
        }
    }
}

fn exec(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    let re = receiver(recv)?;
    let text = args[0].to_display_string();
    match re.find_at(&text, search_start(&re)) {
        Some(m) => {
            if re.is_global() || re.is_sticky() {
                let next = if m.end > m.start {
                    m.end
                } else {
                    let mut j = m.end + 1;
                    while j < text.len() && !text.is_char_boundary(j) {
                        j += 1;
                    }
                    j
                };
                re.set_last_index(next);
            }
            let mut out = vec![Value::string(&text[m.start..m.end])];
            for c in &m.captures {
                out.push(match c {
                    Some((a, b)) => Value::string(&text[*a..*b]),
                    None => Value::Undefined,
                });
            }
            Ok(Value::array(Rc::new(JsArray::from_vec(out))))
        }
        None => {
            if re.is_global() || re.is_sticky() {
                re.set_last_index(0);
            }
            Ok(Value::Null)
        }
    }
}

fn to_string(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, _args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    Ok(Value::string(receiver(recv)?.to_pattern_string()))
}

method_table! {
    pub fn method {
        "test" => sync(1, 1, test),
        "exec" => sync(1, 1, exec),
        "toString" => sync(0, 0, to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::SyncCx;
    use tern_ast::{Resolutions, TypeMap};

    fn vm() -> Interpreter {
        Interpreter::new(Rc::new(Resolutions::new()), Rc::new(TypeMap::new()))
    }

    fn regex(pattern: &str, flags: &str) -> Value {
        Value::Ref(HeapRef::RegExp(Rc::new(JsRegExp::compile(pattern, flags).unwrap())))
    }

    #[test]
    fn global_exec_advances_last_index() {
        let mut vm = vm();
        let re = regex("\\d+", "g");
        let text = Value::string("a1b22c");
        let first = exec(&mut vm, &SyncCx, &re, &[text.clone()]).unwrap();
        assert_eq!(first.as_array().unwrap().get(0).as_str(), Some("1"));
        let second = exec(&mut vm, &SyncCx, &re, &[text.clone()]).unwrap();
        assert_eq!(second.as_array().unwrap().get(0).as_str(), Some("22"));
        let third = exec(&mut vm, &SyncCx, &re, &[text]).unwrap();
        assert!(third.is_null());
    }

    #[test]
    fn non_global_test_ignores_last_index() {
        let mut vm = vm();
        let re = regex("b", "");
        let text = Value::string("abc");
        for _ in 0..2 {
            let hit = test(&mut vm, &SyncCx, &re, &[text.clone()]).unwrap();
            assert_eq!(hit.as_boolean(), Some(true));
        }
    }
}
