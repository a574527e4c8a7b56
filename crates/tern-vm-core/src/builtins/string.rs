//! String prototype methods. Positions are in Unicode scalar values.

use std::rc::Rc;

use crate::array::JsArray;
use crate::error::{VmError, VmResult};
use crate::interp::{EvalContext, Interpreter};
use crate::value::{relative_index, to_integer_or_infinity, HeapRef, Value};

use super::VARIADIC;

fn receiver(recv: &Value) -> VmResult<Rc<str>> {
    match recv {
        Value::String(s) => Ok(s.clone()),
        _ => Err(VmError::type_error("receiver is not a String")),
    }
}

fn chars(s: &str) -> Vec<char> {
    s.chars().collect()
}

/// Next char boundary after `i`, for advancing past empty regex matches.
fn advance_boundary(s: &str, i: usize) -> usize {
    let mut j = i + 1;
    while j < s.len() && !s.is_char_boundary(j) {
        j += 1;
    }
    j
}

fn char_at(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    let s = receiver(recv)?;
    let i = to_integer_or_infinity(args.first().map(|v| v.coerce_number()).unwrap_or(0.0));
    if i < 0.0 {
        return Ok(Value::string(""));
    }
    Ok(s.chars().nth(i as usize).map(|c| Value::string(c.to_string())).unwrap_or_else(|| Value::string("")))
}

fn at(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    let s = receiver(recv)?;
    let cs = chars(&s);
    let mut i = to_integer_or_infinity(args.first().map(|v| v.coerce_number()).unwrap_or(0.0));
    if i < 0.0 {
        i += cs.len() as f64;
    }
    if i < 0.0 || i >= cs.len() as f64 {
        return Ok(Value::Undefined);
    }
    Ok(Value::string(cs[i as usize].to_string()))
}

fn char_code_at(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    let s = receiver(recv)?;
    let i = to_integer_or_infinity(args.first().map(|v| v.coerce_number()).unwrap_or(0.0));
    if i < 0.0 {
        return Ok(Value::Number(f64::NAN));
    }
    Ok(s.chars().nth(i as usize).map(|c| Value::Number(c as u32 as f64)).unwrap_or(Value::Number(f64::NAN)))
}

fn code_point_at(vm: &mut Interpreter, cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    char_code_at(vm, cx, recv, args)
}

fn index_of(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    let s = receiver(recv)?;
    let needle = args.first().map(|v| v.to_display_string()).unwrap_or_default();
    match s.find(&needle) {
        Some(byte_pos) => Ok(Value::Number(s[..byte_pos].chars().count() as f64)),
        None => Ok(Value::Number(-1.0)),
    }
}

fn last_index_of(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    let s = receiver(recv)?;
    let needle = args.first().map(|v| v.to_display_string()).unwrap_or_default();
    match s.rfind(&needle) {
        Some(byte_pos) => Ok(Value::Number(s[..byte_pos].chars().count() as f64)),
        None => Ok(Value::Number(-1.0)),
    }
}

fn includes(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    let s = receiver(recv)?;
    let needle = args.first().map(|v| v.to_display_string()).unwrap_or_default();
    Ok(Value::Boolean(s.contains(&needle)))
}

fn starts_with(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    let s = receiver(recv)?;
    let needle = args.first().map(|v| v.to_display_string()).unwrap_or_default();
    Ok(Value::Boolean(s.starts_with(&needle)))
}

fn ends_with(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    let s = receiver(recv)?;
    let needle = args.first().map(|v| v.to_display_string()).unwrap_or_default();
    Ok(Value::Boolean(s.ends_with(&needle)))
}

fn slice(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    let s = receiver(recv)?;
    let cs = chars(&s);
    let len = cs.len();
    let start = args.first().map(|v| relative_index(v.coerce_number(), len)).unwrap_or(0);
    let end = match args.get(1) {
        Some(v) if !v.is_undefined() => relative_index(v.coerce_number(), len),
        _ => len,
    };
    let out: String = cs.get(start..end.max(start)).unwrap_or_default().iter().collect();
    Ok(Value::string(out))
}

fn substring(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    let s = receiver(recv)?;
    let cs = chars(&s);
    let len = cs.len();
    let clamp = |v: &Value| {
        let n = to_integer_or_infinity(v.coerce_number());
        n.clamp(0.0, len as f64) as usize
    };
    let mut start = args.first().map(&clamp).unwrap_or(0);
    let mut end = match args.get(1) {
        Some(v) if !v.is_undefined() => clamp(v),
        _ => len,
    };
    // substring swaps reversed bounds
    if start > end {
        std::mem::swap(&mut start, &mut end);
    }
    let out: String = cs[start..end].iter().collect();
    Ok(Value::string(out))
}

fn to_upper_case(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, _args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    Ok(Value::string(receiver(recv)?.to_uppercase()))
}

fn to_lower_case(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, _args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    Ok(Value::string(receiver(recv)?.to_lowercase()))
}

fn trim(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, _args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    Ok(Value::string(receiver(recv)?.trim()))
}

fn trim_start(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, _args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    Ok(Value::string(receiver(recv)?.trim_start()))
}

fn trim_end(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, _args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    Ok(Value::string(receiver(recv)?.trim_end()))
}

fn pad(s: &str, target: f64, pad_str: &str, start: bool) -> String {
    let len = s.chars().count();
    let target = target.max(0.0) as usize;
    if target <= len || pad_str.is_empty() {
        return s.to_string();
    }
    let fill: String = pad_str.chars().cycle().take(target - len).collect();
    if start { format!("{fill}{s}") } else { format!("{s}{fill}") }
}

fn pad_start(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    let s = receiver(recv)?;
    let target = args.first().map(|v| v.coerce_number()).unwrap_or(0.0);
    let pad_str = args.get(1).map(|v| v.to_display_string()).unwrap_or_else(|| " ".to_string());
    Ok(Value::string(pad(&s, target, &pad_str, true)))
}

fn pad_end(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    let s = receiver(recv)?;
    let target = args.first().map(|v| v.coerce_number()).unwrap_or(0.0);
    let pad_str = args.get(1).map(|v| v.to_display_string()).unwrap_or_else(|| " ".to_string());
    Ok(Value::string(pad(&s, target, &pad_str, false)))
}

fn repeat(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    let s = receiver(recv)?;
    let n = to_integer_or_infinity(args.first().map(|v| v.coerce_number()).unwrap_or(0.0));
    if n < 0.0 || n.is_infinite() {
        return Err(VmError::range_error("Invalid count value"));
    }
    Ok(Value::string(s.repeat(n as usize)))
}

fn split(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    let s = receiver(recv)?;
    let parts: Vec<Value> = match args.first() {
        None | Some(Value::Undefined) => vec![Value::str_rc(s)],
        Some(Value::Ref(HeapRef::RegExp(re))) => {
            let mut out = Vec::new();
            let mut last = 0usize;
            let mut pos = 0usize;
            while let Some(m) = re.find_at(&s, pos) {
                if m.end == m.start {
                    pos = advance_boundary(&s, m.end);
                    if pos > s.len() {
                        break;
                    }
                    continue;
                }
                out.push(Value::string(&s[last..m.start]));
                last = m.end;
                pos = m.end;
            }
            out.push(Value::string(&s[last..]));
            out
        }
        Some(sep) => {
            let sep = sep.to_display_string();
            if sep.is_empty() {
                s.chars().map(|c| Value::string(c.to_string())).collect()
            } else {
                s.split(&sep as &str).map(Value::string).collect()
            }
        }
    };
    Ok(Value::array(Rc::new(JsArray::from_vec(parts))))
}

/// Replacement-string expansion: `$&` whole match, `$1`..`$9` captures.
fn expand_replacement(template: &str, matched: &str, captures: &[Option<String>]) -> String {
    let mut out = String::new();
    let mut iter = template.chars().peekable();
    while let Some(c) = iter.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        match iter.peek() {
            Some('&') => {
                iter.next();
                out.push_str(matched);
            }
            Some('$') => {
                iter.next();
                out.push('$');
            }
            Some(d) if d.is_ascii_digit() => {
                let idx = d.to_digit(10).unwrap() as usize;
                iter.next();
                if idx >= 1
                    && let Some(Some(cap)) = captures.get(idx - 1)
                {
                    out.push_str(cap);
                }
            }
            _ => out.push('$'),
        }
    }
    out
}

fn replace_with(
    vm: &mut Interpreter,
    cx: &dyn EvalContext,
    s: &str,
    pattern: &Value,
    replacement: &Value,
    all: bool,
) -> VmResult<String> {
    let apply = |vm: &mut Interpreter, matched: &str, captures: &[Option<String>], pos: usize| -> VmResult<String> {
        if replacement.is_callable() {
            let mut call_args = vec![Value::string(matched)];
            for c in captures {
                call_args.push(match c {
                    Some(c) => Value::string(c),
                    None => Value::Undefined,
                });
            }
            call_args.push(Value::Number(pos as f64));
            let out = vm.call_value(cx, replacement, Value::Undefined, call_args)?;
            Ok(out.to_display_string())
        } else {
            Ok(expand_replacement(&replacement.to_display_string(), matched, captures))
        }
    };

    match pattern {
        Value::Ref(HeapRef::RegExp(re)) => {
            let all = all || re.is_global();
            let mut out = String::new();
            let mut pos = 0usize;
            while let Some(m) = re.find_at(s, pos) {
                let captures: Vec<Option<String>> =
                    m.captures.iter().map(|c| c.map(|(a, b)| s[a..b].to_string())).collect();
                out.push_str(&s[pos..m.start]);
                out.push_str(&apply(vm, &s[m.start..m.end], &captures, m.start)?);
                pos = if m.end > m.start { m.end } else { advance_boundary(s, m.end) };
                if !all || pos > s.len() {
                    break;
                }
            }
            if pos <= s.len() {
                out.push_str(&s[pos..]);
            }
            Ok(out)
        }
        other => {
            let needle = other.to_display_string();
            if needle.is_empty() {
                return Ok(s.to_string());
            }
            let mut out = String::new();
            let mut rest = s;
            loop {
                match rest.find(&needle) {
                    Some(i) => {
                        out.push_str(&rest[..i]);
                        let pos = s.len() - rest.len() + i;
                        out.push_str(&apply(vm, &needle, &[], pos)?);
                        rest = &rest[i + needle.len()..];
                        if !all {
                            out.push_str(rest);
                            return Ok(out);
                        }
                    }
                    None => {
                        out.push_str(rest);
                        return Ok(out);
                    }
                }
            }
        }
    }
}

fn replace(vm: &mut Interpreter, cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let s = receiver(recv)?;
    let out = replace_with(vm, cx, &s, &args[0], &args[1], false)?;
    Ok(Value::string(out))
}

fn replace_all(vm: &mut Interpreter, cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let s = receiver(recv)?;
    let out = replace_with(vm, cx, &s, &args[0], &args[1], true)?;
    Ok(Value::string(out))
}

fn match_(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    let s = receiver(recv)?;
    let Value::Ref(HeapRef::RegExp(re)) = &args[0] else {
        return Err(VmError::type_error("match expects a RegExp"));
    };
    if re.is_global() {
        let mut out = Vec::new();
        let mut pos = 0usize;
        while let Some(m) = re.find_at(&s, pos) {
            out.push(Value::string(&s[m.start..m.end]));
            pos = if m.end > m.start { m.end } else { advance_boundary(&s, m.end) };
            if pos > s.len() {
                break;
            }
        }
        if out.is_empty() {
            return Ok(Value::Null);
        }
        return Ok(Value::array(Rc::new(JsArray::from_vec(out))));
    }
    match re.find_at(&s, 0) {
        Some(m) => {
            let mut out = vec![Value::string(&s[m.start..m.end])];
            for c in &m.captures {
                out.push(match c {
                    Some((a, b)) => Value::string(&s[*a..*b]),
                    None => Value::Undefined,
                });
            }
            Ok(Value::array(Rc::new(JsArray::from_vec(out))))
        }
        None => Ok(Value::Null),
    }
}

fn concat(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    let mut out = receiver(recv)?.to_string();
    for arg in args {
        out.push_str(&arg.to_display_string());
    }
    Ok(Value::string(out))
}

fn locale_compare(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    let s = receiver(recv)?;
    let other = args.first().map(|v| v.to_display_string()).unwrap_or_default();
    Ok(Value::Number(match s.as_ref().cmp(other.as_str()) {
        std::cmp::Ordering::Less => -1.0,
        std::cmp::Ordering::Equal => 0.0,
        std::cmp::Ordering::Greater => 1.0,
    }))
}

fn to_string(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, _args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    Ok(recv.clone())
}

method_table! {
    pub fn method {
        "charAt" => sync(0, 1, char_at),
        "at" => sync(1, 1, at),
        "charCodeAt" => sync(0, 1, char_code_at),
        "codePointAt" => sync(0, 1, code_point_at),
        "indexOf" => sync(1, 2, index_of),
        "lastIndexOf" => sync(1, 2, last_index_of),
        "includes" => sync(1, 2, includes),
        "startsWith" => sync(1, 2, starts_with),
        "endsWith" => sync(1, 2, ends_with),
        "slice" => sync(0, 2, slice),
        "substring" => sync(0, 2, substring),
        "toUpperCase" => sync(0, 0, to_upper_case),
        "toLowerCase" => sync(0, 0, to_lower_case),
        "trim" => sync(0, 0, trim),
        "trimStart" => sync(0, 0, trim_start),
        "trimEnd" => sync(0, 0, trim_end),
        "padStart" => sync(1, 2, pad_start),
        "padEnd" => sync(1, 2, pad_end),
        "repeat" => sync(1, 1, repeat),
        "split" => sync(0, 2, split),
        "replace" => sync(2, 2, replace),
        "replaceAll" => sync(2, 2, replace_all),
        "match" => sync(1, 1, match_),
        "concat" => sync(0, VARIADIC, concat),
        "localeCompare" => sync(1, 1, locale_compare),
        "toString" => sync(0, 0, to_string),
        "valueOf" => sync(0, 0, to_string),
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

    #[test]
    fn repeat_rejects_negative_counts() {
        let mut vm = vm();
        let err = repeat(&mut vm, &SyncCx, &Value::string("ab"), &[Value::Number(-1.0)]).unwrap_err();
        assert!(matches!(err, VmError::RangeError(_)));
    }

    #[test]
    fn slice_supports_negative_bounds() {
        let mut vm = vm();
        let out = slice(&mut vm, &SyncCx, &Value::string("hello"), &[Value::Number(-3.0)]).unwrap();
        assert_eq!(out.as_str(), Some("llo"));
    }

    #[test]
    fn substring_swaps_reversed_bounds() {
        let mut vm = vm();
        let out =
            substring(&mut vm, &SyncCx, &Value::string("hello"), &[Value::Number(4.0), Value::Number(1.0)]).unwrap();
        assert_eq!(out.as_str(), Some("ell"));
    }

    #[test]
    fn replace_expands_capture_references() {
        let mut vm = vm();
        let re = crate::regexp::JsRegExp::compile("(\\w+) (\\w+)", "").unwrap();
        let out = replace(
            &mut vm,
            &SyncCx,
            &Value::string("john smith"),
            &[Value::Ref(HeapRef::RegExp(Rc::new(re))), Value::string("$2 $1")],
        )
        .unwrap();
        assert_eq!(out.as_str(), Some("smith john"));
    }

    #[test]
    fn split_on_empty_separator_yields_chars() {
        let mut vm = vm();
        let out = split(&mut vm, &SyncCx, &Value::string("abc"), &[Value::string("")]).unwrap();
        assert_eq!(out.as_array().unwrap().len(), 3);
    }
}
