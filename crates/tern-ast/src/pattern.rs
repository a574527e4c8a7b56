//! Destructuring patterns, shared by `let`/`const` declarations, catch
//! clauses, for-of bindings and parameters.

use crate::expr::Expr;

#[derive(Debug, Clone)]
pub enum Pattern {
    Identifier(String),
    /// `[a, , b = 1, ...rest]` — `None` elements are elisions.
    Array {
        elements: Vec<Option<ArrayPatternElem>>,
        rest: Option<String>,
    },
    /// `{a, b: c = 1, ...rest}`.
    Object {
        props: Vec<ObjectPatternProp>,
        rest: Option<String>,
    },
}

#[derive(Debug, Clone)]
pub struct ArrayPatternElem {
    pub binding: Pattern,
    pub default: Option<Expr>,
}

#[derive(Debug, Clone)]
pub struct ObjectPatternProp {
    /// Source key on the object being destructured.
    pub key: String,
    /// Target binding; `{a}` binds `a`, `{a: b}` binds `b`, nesting allowed.
    pub binding: Pattern,
    pub default: Option<Expr>,
}

impl Pattern {
    pub fn ident(name: impl Into<String>) -> Self {
        Pattern::Identifier(name.into())
    }

    /// Every name this pattern introduces, in binding order.
    pub fn bound_names(&self, out: &mut Vec<String>) {
        match self {
            Pattern::Identifier(name) => out.push(name.clone()),
            Pattern::Array { elements, rest } => {
                for elem in elements.iter().flatten() {
                    elem.binding.bound_names(out);
                }
                if let Some(rest) = rest {
                    out.push(rest.clone());
                }
            }
            Pattern::Object { props, rest } => {
                for prop in props {
                    prop.binding.bound_names(out);
                }
                if let Some(rest) = rest {
                    out.push(rest.clone());
                }
            }
        }
    }
}
