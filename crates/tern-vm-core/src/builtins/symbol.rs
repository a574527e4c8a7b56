//! The `Symbol` constructor and well-known symbols.

use std::rc::Rc;

use crate::function::NativeFunction;
use crate::symbol::{JsSymbol, SYMBOL_ASYNC_ITERATOR, SYMBOL_DISPOSE, SYMBOL_ITERATOR};
use crate::value::{HeapRef, Value};

/// Build the global `Symbol` constructor: callable (`Symbol(desc)` makes a
/// fresh identity), carrying the well-known symbols.
pub fn create_symbol_constructor() -> Value {
    let ctor = NativeFunction::new("Symbol", |_vm, _this, args| {
        let description = match args.first() {
            None | Some(Value::Undefined) => None,
            Some(v) => Some(v.to_display_string()),
        };
        Ok(Value::Symbol(Rc::new(JsSymbol::new(description))))
    });
    ctor.set_property("iterator", Value::Symbol(Rc::new(JsSymbol::well_known(SYMBOL_ITERATOR, "Symbol.iterator"))));
    ctor.set_property(
        "asyncIterator",
        Value::Symbol(Rc::new(JsSymbol::well_known(SYMBOL_ASYNC_ITERATOR, "Symbol.asyncIterator"))),
    );
    ctor.set_property("dispose", Value::Symbol(Rc::new(JsSymbol::well_known(SYMBOL_DISPOSE, "Symbol.dispose"))));
    Value::Ref(HeapRef::Native(ctor))
}
