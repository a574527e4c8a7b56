//! The `Math` namespace object.

use std::rc::Rc;

use crate::function::NativeFunction;
use crate::interp::Interpreter;
use crate::object::JsObject;
use crate::value::{HeapRef, Value};
use crate::error::VmResult;

fn unary(name: &str, f: fn(f64) -> f64) -> (String, Value) {
    let v = Value::Ref(HeapRef::Native(NativeFunction::new(name, move |_vm, _this, args: &[Value]| {
        Ok(Value::Number(f(args.first().map(|v| v.coerce_number()).unwrap_or(f64::NAN))))
    })));
    (name.to_string(), v)
}

fn install(obj: &JsObject, name: &str, f: impl Fn(&mut Interpreter, &Value, &[Value]) -> VmResult<Value> + 'static) {
    obj.set(name, Value::Ref(HeapRef::Native(NativeFunction::new(name, f))));
}

/// Build the `Math` global.
pub fn create_math_object() -> Value {
    let obj = JsObject::new();

    obj.set("PI", Value::Number(std::f64::consts::PI));
    obj.set("E", Value::Number(std::f64::consts::E));
    obj.set("LN2", Value::Number(std::f64::consts::LN_2));
    obj.set("LN10", Value::Number(std::f64::consts::LN_10));
    obj.set("LOG2E", Value::Number(std::f64::consts::LOG2_E));
    obj.set("LOG10E", Value::Number(std::f64::consts::LOG10_E));
    obj.set("SQRT2", Value::Number(std::f64::consts::SQRT_2));
    obj.set("SQRT1_2", Value::Number(std::f64::consts::FRAC_1_SQRT_2));

    for (name, value) in [
        unary("abs", f64::abs),
        unary("floor", f64::floor),
        unary("ceil", f64::ceil),
        unary("round", |n| (n + 0.5).floor()),
        unary("trunc", f64::trunc),
        unary("sqrt", f64::sqrt),
        unary("cbrt", f64::cbrt),
        unary("exp", f64::exp),
        unary("log", f64::ln),
        unary("log2", f64::log2),
        unary("log10", f64::log10),
        unary("sin", f64::sin),
        unary("cos", f64::cos),
        unary("tan", f64::tan),
        unary("asin", f64::asin),
        unary("acos", f64::acos),
        unary("atan", f64::atan),
        unary("sinh", f64::sinh),
        unary("cosh", f64::cosh),
        unary("tanh", f64::tanh),
        unary("fround", |n| n as f32 as f64),
    ] {
        obj.set(name, value);
    }

    // sign(±0) and sign(NaN) fall outside f64::signum
    install(&obj, "sign", |_vm, _this, args| {
        let n = args.first().map(|v| v.coerce_number()).unwrap_or(f64::NAN);
        Ok(Value::Number(if n.is_nan() || n == 0.0 { n } else { n.signum() }))
    });

    install(&obj, "pow", |_vm, _this, args| {
        let base = args.first().map(|v| v.coerce_number()).unwrap_or(f64::NAN);
        let exp = args.get(1).map(|v| v.coerce_number()).unwrap_or(f64::NAN);
        Ok(Value::Number(base.powf(exp)))
    });
    install(&obj, "atan2", |_vm, _this, args| {
        let y = args.first().map(|v| v.coerce_number()).unwrap_or(f64::NAN);
        let x = args.get(1).map(|v| v.coerce_number()).unwrap_or(f64::NAN);
        Ok(Value::Number(y.atan2(x)))
    });
    install(&obj, "min", |_vm, _this, args| {
        let mut out = f64::INFINITY;
        for a in args {
            let n = a.coerce_number();
            if n.is_nan() {
                return Ok(Value::Number(f64::NAN));
            }
            out = out.min(n);
        }
        Ok(Value::Number(out))
    });
    install(&obj, "max", |_vm, _this, args| {
        let mut out = f64::NEG_INFINITY;
        for a in args {
            let n = a.coerce_number();
            if n.is_nan() {
                return Ok(Value::Number(f64::NAN));
            }
            out = out.max(n);
        }
        Ok(Value::Number(out))
    });
    install(&obj, "hypot", |_vm, _this, args| {
        let mut sum = 0.0;
        for a in args {
            let n = a.coerce_number();
            sum += n * n;
        }
        Ok(Value::Number(sum.sqrt()))
    });
    install(&obj, "clz32", |_vm, _this, args| {
        let n = crate::interp::to_uint32(args.first().map(|v| v.coerce_number()).unwrap_or(0.0));
        Ok(Value::Number(n.leading_zeros() as f64))
    });
    install(&obj, "random", |_vm, _this, _args| {
        // xorshift seeded from the system clock; Math.random carries no
        // quality guarantees
        use std::cell::Cell;
        thread_local! {
            static STATE: Cell<u64> = const { Cell::new(0) };
        }
        let x = STATE.with(|s| {
            let mut x = s.get();
            if x == 0 {
                x = std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .map(|d| d.as_nanos() as u64)
                    .unwrap_or(0x9E37_79B9_7F4A_7C15)
                    | 1;
            }
            x ^= x << 13;
            x ^= x >> 7;
            x ^= x << 17;
            s.set(x);
            x
        });
        Ok(Value::Number((x >> 11) as f64 / (1u64 << 53) as f64))
    });

    Value::object(Rc::new(obj))
}
