//! Heap Error objects.

use std::cell::RefCell;

use crate::error::ErrorKind;
use crate::value::Value;

/// A throwable Error. `stack` is captured at construction from the live call
/// stack; `errors` is populated only for AggregateError.
#[derive(Debug)]
pub struct JsError {
    pub kind: ErrorKind,
    pub message: RefCell<String>,
    pub stack: RefCell<String>,
    pub errors: Vec<Value>,
}

impl JsError {
    pub fn new(kind: ErrorKind, message: impl Into<String>, stack: Vec<String>) -> Self {
        let message = message.into();
        let mut rendered = format!("{}: {}", kind.name(), message);
        for frame in &stack {
            rendered.push_str("\n    at ");
            rendered.push_str(frame);
        }
        Self { kind, message: RefCell::new(message), stack: RefCell::new(rendered), errors: Vec::new() }
    }

    pub fn aggregate(errors: Vec<Value>, message: impl Into<String>, stack: Vec<String>) -> Self {
        let mut e = Self::new(ErrorKind::AggregateError, message, stack);
        e.errors = errors;
        e
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    /// `"<Name>: <message>"`, or just the name when the message is empty.
    pub fn to_display_string(&self) -> String {
        let message = self.message.borrow();
        if message.is_empty() {
            self.name().to_string()
        } else {
            format!("{}: {}", self.name(), message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind_and_message() {
        let e = JsError::new(ErrorKind::TypeError, "x is not a function", Vec::new());
        assert_eq!(e.to_display_string(), "TypeError: x is not a function");
    }

    #[test]
    fn stack_lists_frames() {
        let e = JsError::new(ErrorKind::Error, "boom", vec!["inner".to_string(), "outer".to_string()]);
        let stack = e.stack.borrow();
        assert!(stack.contains("at inner"));
        assert!(stack.contains("at outer"));
    }
}
