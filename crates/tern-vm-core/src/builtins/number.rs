//! Number prototype methods and constructor statics.

use crate::error::{VmError, VmResult};
use crate::function::NativeFunction;
use crate::interp::{EvalContext, Interpreter};
use crate::value::{number_to_string, string_to_number, HeapRef, Value};

fn receiver(recv: &Value) -> VmResult<f64> {
    recv.as_number().ok_or_else(|| VmError::type_error("receiver is not a Number"))
}

fn to_fixed(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    let n = receiver(recv)?;
    let digits = args.first().map(|v| v.coerce_number()).unwrap_or(0.0);
    if !(0.0..=100.0).contains(&digits) {
        return Err(VmError::range_error("toFixed() digits argument must be between 0 and 100"));
    }
    Ok(Value::string(format!("{:.*}", digits as usize, n)))
}

fn to_precision(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    let n = receiver(recv)?;
    match args.first() {
        None | Some(Value::Undefined) => Ok(Value::string(number_to_string(n))),
        Some(p) => {
            let p = p.coerce_number();
            if !(1.0..=100.0).contains(&p) {
                return Err(VmError::range_error("toPrecision() argument must be between 1 and 100"));
            }
            Ok(Value::string(format!("{:.*}", (p as usize).saturating_sub(1), n)))
        }
    }
}

fn to_string(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    let n = receiver(recv)?;
    match args.first() {
        None | Some(Value::Undefined) => Ok(Value::string(number_to_string(n))),
        Some(radix) => {
            let radix = radix.coerce_number() as u32;
            if !(2..=36).contains(&radix) {
                return Err(VmError::range_error("toString() radix must be between 2 and 36"));
            }
            if radix == 10 {
                return Ok(Value::string(number_to_string(n)));
            }
            // radix conversion is integer-only
            let mut v = n.trunc() as i64;
            if v == 0 {
                return Ok(Value::string("0"));
            }
            let negative = v < 0;
            v = v.abs();
            let digits = b"0123456789abcdefghijklmnopqrstuvwxyz";
            let mut out = Vec::new();
            while v > 0 {
                out.push(digits[(v % radix as i64) as usize]);
                v /= radix as i64;
            }
            if negative {
                out.push(b'-');
            }
            out.reverse();
            Ok(Value::string(String::from_utf8(out).expect("radix digits are ascii")))
        }
    }
}

fn value_of(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, _args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    Ok(recv.clone())
}

method_table! {
    pub fn method {
        "toFixed" => sync(0, 1, to_fixed),
        "toPrecision" => sync(0, 1, to_precision),
        "toString" => sync(0, 1, to_string),
        "valueOf" => sync(0, 0, value_of),
    }
}

/// Build the global `Number` constructor: callable as a coercion, carrying
/// the statics and constants.
pub fn create_number_constructor() -> Value {
    let ctor = NativeFunction::new("Number", |_vm, _this, args| {
        Ok(Value::Number(args.first().map(|v| v.coerce_number()).unwrap_or(0.0)))
    });
    let native = |name: &str, f: fn(&mut Interpreter, &Value, &[Value]) -> VmResult<Value>| {
        Value::Ref(HeapRef::Native(NativeFunction::new(name, f)))
    };
    ctor.set_property("isInteger", native("isInteger", |_vm, _this, args| {
        Ok(Value::Boolean(matches!(args.first(), Some(Value::Number(n)) if n.fract() == 0.0 && n.is_finite())))
    }));
    ctor.set_property("isSafeInteger", native("isSafeInteger", |_vm, _this, args| {
        Ok(Value::Boolean(
            matches!(args.first(), Some(Value::Number(n)) if n.fract() == 0.0 && n.abs() <= 9_007_199_254_740_991.0),
        ))
    }));
    ctor.set_property("isFinite", native("isFinite", |_vm, _this, args| {
        Ok(Value::Boolean(matches!(args.first(), Some(Value::Number(n)) if n.is_finite())))
    }));
    ctor.set_property("isNaN", native("isNaN", |_vm, _this, args| {
        Ok(Value::Boolean(matches!(args.first(), Some(Value::Number(n)) if n.is_nan())))
    }));
    ctor.set_property("parseFloat", native("parseFloat", |_vm, _this, args| {
        Ok(Value::Number(string_to_number(&args.first().map(|v| v.to_display_string()).unwrap_or_default())))
    }));
    ctor.set_property("parseInt", native("parseInt", |_vm, _this, args| {
        let s = args.first().map(|v| v.to_display_string()).unwrap_or_default();
        let radix = args.get(1).map(|v| v.coerce_number() as u32).filter(|r| (2..=36).contains(r));
        Ok(Value::Number(super::global_fns::parse_int_str(&s, radix)))
    }));
    ctor.set_property("MAX_SAFE_INTEGER", Value::Number(9_007_199_254_740_991.0));
    ctor.set_property("MIN_SAFE_INTEGER", Value::Number(-9_007_199_254_740_991.0));
    ctor.set_property("MAX_VALUE", Value::Number(f64::MAX));
    ctor.set_property("MIN_VALUE", Value::Number(f64::MIN_POSITIVE));
    ctor.set_property("EPSILON", Value::Number(f64::EPSILON));
    ctor.set_property("POSITIVE_INFINITY", Value::Number(f64::INFINITY));
    ctor.set_property("NEGATIVE_INFINITY", Value::Number(f64::NEG_INFINITY));
    ctor.set_property("NaN", Value::Number(f64::NAN));
    Value::Ref(HeapRef::Native(ctor))
}
