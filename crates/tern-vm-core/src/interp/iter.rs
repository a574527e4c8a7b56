//! The iteration protocol: one front door for for-of, spread, destructuring
//! and `yield*` delegation.

use std::collections::VecDeque;
use std::rc::Rc;

use crate::array::JsArray;
use crate::error::{VmError, VmResult};
use crate::symbol::SYMBOL_ITERATOR;
use crate::value::{HeapRef, Value};

use super::{EvalContext, Interpreter};

/// A live iteration.
///
/// Built-in iterables snapshot their members up front (mutation during
/// iteration observes the snapshot); protocol-driven sources hold the
/// iterator object and are stepped by calling its `next` member.
pub enum IterSource {
    Values(VecDeque<Value>),
    Protocol { iterator: Value },
}

/// One step of an iteration. `Done` carries the iterator's final value,
/// which `yield*` hands back as the delegation result.
pub enum IterStep {
    Value(Value),
    Done(Value),
}

impl Interpreter {
    /// Open an iteration over `value`.
    ///
    /// Arrays, strings, Maps (entry pairs), Sets and typed arrays iterate
    /// natively; generators and anything exposing `@@iterator` (or a `next`
    /// method directly) go through the protocol.
    pub fn make_iterator(&mut self, cx: &dyn EvalContext, value: &Value) -> VmResult<IterSource> {
        match value {
            Value::Ref(HeapRef::Array(a)) => Ok(IterSource::Values(a.iter_snapshot().into())),
            Value::String(s) => {
                Ok(IterSource::Values(s.chars().map(|c| Value::string(c.to_string())).collect()))
            }
            Value::Ref(HeapRef::Map(m)) => Ok(IterSource::Values(
                m.entries_snapshot()
                    .into_iter()
                    .map(|(k, v)| Value::array(Rc::new(JsArray::from_vec(vec![k, v]))))
                    .collect(),
            )),
            Value::Ref(HeapRef::Set(s)) => Ok(IterSource::Values(s.values_snapshot().into())),
            Value::Ref(HeapRef::TypedArray(t)) => {
                Ok(IterSource::Values(t.to_vec().into_iter().map(Value::Number).collect()))
            }
            Value::Ref(HeapRef::Generator(_)) => Ok(IterSource::Protocol { iterator: value.clone() }),
            Value::Ref(HeapRef::Object(o)) => {
                if let Some(make) = o.get_symbol(SYMBOL_ITERATOR) {
                    let iterator = self.call_value(cx, &make, value.clone(), Vec::new())?;
                    return Ok(IterSource::Protocol { iterator });
                }
                if o.get("next").is_some_and(|n| n.is_callable()) {
                    return Ok(IterSource::Protocol { iterator: value.clone() });
                }
                Err(VmError::type_error("value is not iterable"))
            }
            Value::Ref(HeapRef::Instance(inst)) => {
                if inst.class.find_method("next").is_some() {
                    return Ok(IterSource::Protocol { iterator: value.clone() });
                }
                Err(VmError::type_error(format!("{} is not iterable", inst.class.name)))
            }
            other => Err(VmError::type_error(format!("{} is not iterable", other.to_display_string()))),
        }
    }

    /// Advance an iteration, sending `send` into protocol iterators.
    /// Resolves the step result through `cx`, so async iterators work in
    /// `for await` and async generators.
    pub fn iter_next(&mut self, cx: &dyn EvalContext, source: &mut IterSource, send: Value) -> VmResult<IterStep> {
        match source {
            IterSource::Values(values) => match values.pop_front() {
                Some(v) => Ok(IterStep::Value(v)),
                None => Ok(IterStep::Done(Value::Undefined)),
            },
            IterSource::Protocol { iterator } => {
                let iterator = iterator.clone();
                let next = self.get_member(cx, &iterator, "next", None)?;
                let step = self.call_value(cx, &next, iterator, vec![send])?;
                let step = cx.resolve(self, step)?;
                let done = self.get_member(cx, &step, "done", None)?.is_truthy();
                let value = self.get_member(cx, &step, "value", None)?;
                let value = cx.resolve(self, value)?;
                if done { Ok(IterStep::Done(value)) } else { Ok(IterStep::Value(value)) }
            }
        }
    }

    /// Close a protocol iterator early (`break` out of for-of, `return()` on
    /// a delegating generator). Built-in snapshots need no cleanup.
    pub fn iter_close(&mut self, cx: &dyn EvalContext, source: &mut IterSource, value: Value) -> VmResult<()> {
        if let IterSource::Protocol { iterator } = source {
            let iterator = iterator.clone();
            let ret = self.get_member(cx, &iterator, "return", None);
            if let Ok(ret) = ret
                && ret.is_callable()
            {
                self.call_value(cx, &ret, iterator, vec![value])?;
            }
        }
        Ok(())
    }

    /// Collect the full remaining iteration (spread, `Array.from`).
    pub fn iterate_to_vec(&mut self, cx: &dyn EvalContext, value: &Value) -> VmResult<Vec<Value>> {
        let mut source = self.make_iterator(cx, value)?;
        let mut out = Vec::new();
        loop {
            match self.iter_next(cx, &mut source, Value::Undefined)? {
                IterStep::Value(v) => out.push(v),
                IterStep::Done(_) => return Ok(out),
            }
        }
    }
}
