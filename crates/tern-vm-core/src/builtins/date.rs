//! Date prototype methods (UTC accessors) and constructor statics.

use std::rc::Rc;

use crate::date::JsDate;
use crate::error::{VmError, VmResult};
use crate::function::NativeFunction;
use crate::interp::{EvalContext, Interpreter};
use crate::value::{HeapRef, Value};

fn receiver(recv: &Value) -> VmResult<Rc<JsDate>> {
    match recv {
        Value::Ref(HeapRef::Date(d)) => Ok(d.clone()),
        _ => Err(VmError::type_error("receiver is not a Date")),
    }
}

macro_rules! accessor {
    ($name:ident, $method:ident) => {
        fn $name(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, _args: &[Value]) -> VmResult<Value> {
            let _ = vm;
            Ok(Value::Number(receiver(recv)?.$method()))
        }
    };
}

accessor!(get_time, epoch_ms);
accessor!(get_full_year, year);
accessor!(get_month, month);
accessor!(get_date, day_of_month);
accessor!(get_day, day_of_week);
accessor!(get_hours, hours);
accessor!(get_minutes, minutes);
accessor!(get_seconds, seconds);
accessor!(get_milliseconds, milliseconds);

fn set_time(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    let d = receiver(recv)?;
    let ms = args[0].coerce_number();
    d.set_epoch_ms(ms);
    Ok(Value::Number(ms))
}

fn to_iso_string(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, _args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    let d = receiver(recv)?;
    if d.is_invalid() {
        return Err(VmError::range_error("Invalid time value"));
    }
    Ok(Value::string(d.to_iso_string()))
}

fn to_string(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, _args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    Ok(Value::string(receiver(recv)?.to_string_value()))
}

method_table! {
    pub fn method {
        "getTime" => sync(0, 0, get_time),
        "valueOf" => sync(0, 0, get_time),
        "getFullYear" => sync(0, 0, get_full_year),
        "getMonth" => sync(0, 0, get_month),
        "getDate" => sync(0, 0, get_date),
        "getDay" => sync(0, 0, get_day),
        "getHours" => sync(0, 0, get_hours),
        "getMinutes" => sync(0, 0, get_minutes),
        "getSeconds" => sync(0, 0, get_seconds),
        "getMilliseconds" => sync(0, 0, get_milliseconds),
        "setTime" => sync(1, 1, set_time),
        "toISOString" => sync(0, 0, to_iso_string),
        "toString" => sync(0, 0, to_string),
    }
}

/// Build the global `Date` constructor: overloaded on (nothing | epoch-ms |
/// ISO string | components), plus `Date.now`/`Date.parse`.
pub fn create_date_constructor() -> Value {
    let ctor = NativeFunction::new("Date", |_vm, _this, args| {
        let date = match args.len() {
            0 => JsDate::now(),
            1 => match &args[0] {
                Value::String(s) => JsDate::from_iso_string(s),
                other => JsDate::from_epoch_ms(other.coerce_number()),
            },
            _ => {
                let pick = |i: usize, default: f64| args.get(i).map(|v| v.coerce_number()).unwrap_or(default);
                JsDate::from_components(
                    pick(0, 1970.0) as i32,
                    pick(1, 0.0) as u32,
                    pick(2, 1.0) as u32,
                    pick(3, 0.0) as u32,
                    pick(4, 0.0) as u32,
                    pick(5, 0.0) as u32,
                    pick(6, 0.0) as u32,
                )
            }
        };
        Ok(Value::Ref(HeapRef::Date(Rc::new(date))))
    });
    ctor.set_property(
        "now",
        Value::Ref(HeapRef::Native(NativeFunction::new("now", |_vm, _this, _args| {
            Ok(Value::Number(JsDate::now().epoch_ms()))
        }))),
    );
    ctor.set_property(
        "parse",
        Value::Ref(HeapRef::Native(NativeFunction::new("parse", |_vm, _this, args| {
            let s = args.first().map(|v| v.to_display_string()).unwrap_or_default();
            Ok(Value::Number(JsDate::from_iso_string(&s).epoch_ms()))
        }))),
    );
    Value::Ref(HeapRef::Native(ctor))
}
