//! VM error types.

use thiserror::Error;

use crate::value::Value;

/// The eight user-visible error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Error,
    TypeError,
    RangeError,
    ReferenceError,
    SyntaxError,
    URIError,
    EvalError,
    AggregateError,
}

impl ErrorKind {
    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::Error => "Error",
            ErrorKind::TypeError => "TypeError",
            ErrorKind::RangeError => "RangeError",
            ErrorKind::ReferenceError => "ReferenceError",
            ErrorKind::SyntaxError => "SyntaxError",
            ErrorKind::URIError => "URIError",
            ErrorKind::EvalError => "EvalError",
            ErrorKind::AggregateError => "AggregateError",
        }
    }
}

/// VM execution errors.
///
/// Runtime-raised kinds (`TypeError`, `ReferenceError`, ...) carry only a
/// message here; they are materialized into heap `Error` objects when user
/// code observes them through `catch`. A user `throw` travels as [`Thrown`]
/// carrying the JS value unchanged, and a rejected promise surfaces out of an
/// `await` as [`PromiseRejected`].
///
/// Non-local control flow (`return`/`break`/`continue`) is NOT an error; it
/// lives in [`crate::interp::Completion`].
///
/// [`Thrown`]: VmError::Thrown
/// [`PromiseRejected`]: VmError::PromiseRejected
#[derive(Debug, Error)]
pub enum VmError {
    /// Type error (bad operand kinds, arity, brand-check failure, ...)
    #[error("TypeError: {0}")]
    TypeError(String),

    /// Reference error (undefined variable)
    #[error("ReferenceError: {0}")]
    ReferenceError(String),

    /// Range error (invalid numeric argument)
    #[error("RangeError: {0}")]
    RangeError(String),

    /// Syntax error surfacing at runtime (bad regex, bad JSON)
    #[error("SyntaxError: {0}")]
    SyntaxError(String),

    /// URI error
    #[error("URIError: {0}")]
    URIError(String),

    /// Thrown JS value from user code
    #[error("Uncaught: {0}")]
    Thrown(Box<ThrownValue>),

    /// Rejection reason flowing out of an `await`
    #[error("Unhandled rejection: {0}")]
    PromiseRejected(Box<ThrownValue>),

    /// Stack overflow
    #[error("RangeError: Maximum call stack size exceeded")]
    StackOverflow,

    /// Internal error (engine invariant violated)
    #[error("InternalError: {0}")]
    Internal(String),
}

/// A thrown JS value with its stringified form and captured stack.
#[derive(Debug)]
pub struct ThrownValue {
    pub value: Value,
    pub message: String,
    pub stack: Vec<String>,
}

impl std::fmt::Display for ThrownValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl VmError {
    pub fn type_error(msg: impl Into<String>) -> Self {
        Self::TypeError(msg.into())
    }

    pub fn reference_error(msg: impl Into<String>) -> Self {
        Self::ReferenceError(msg.into())
    }

    pub fn range_error(msg: impl Into<String>) -> Self {
        Self::RangeError(msg.into())
    }

    pub fn syntax_error(msg: impl Into<String>) -> Self {
        Self::SyntaxError(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Wrap a thrown JS value.
    pub fn thrown(value: Value, stack: Vec<String>) -> Self {
        let message = value.to_display_string();
        Self::Thrown(Box::new(ThrownValue { value, message, stack }))
    }

    /// Wrap a rejection reason surfacing out of an `await`.
    pub fn rejected(reason: Value) -> Self {
        let message = reason.to_display_string();
        Self::PromiseRejected(Box::new(ThrownValue { value: reason, message, stack: Vec::new() }))
    }

    /// The error kind this maps to when user code catches it.
    pub fn kind(&self) -> ErrorKind {
        match self {
            VmError::TypeError(_) => ErrorKind::TypeError,
            VmError::ReferenceError(_) => ErrorKind::ReferenceError,
            VmError::RangeError(_) | VmError::StackOverflow => ErrorKind::RangeError,
            VmError::SyntaxError(_) => ErrorKind::SyntaxError,
            VmError::URIError(_) => ErrorKind::URIError,
            _ => ErrorKind::Error,
        }
    }

    pub fn message(&self) -> String {
        match self {
            VmError::TypeError(m)
            | VmError::ReferenceError(m)
            | VmError::RangeError(m)
            | VmError::SyntaxError(m)
            | VmError::URIError(m)
            | VmError::Internal(m) => m.clone(),
            VmError::Thrown(t) | VmError::PromiseRejected(t) => t.message.clone(),
            VmError::StackOverflow => "Maximum call stack size exceeded".to_string(),
        }
    }
}

/// Result type for VM operations.
pub type VmResult<T> = Result<T, VmError>;
