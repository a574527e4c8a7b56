//! Symbols: unique identity plus an optional description.

use std::cell::Cell;

/// Well-known symbol ids, below the range the allocator hands out.
pub const SYMBOL_ITERATOR: u64 = 1;
pub const SYMBOL_ASYNC_ITERATOR: u64 = 2;
pub const SYMBOL_DISPOSE: u64 = 3;

const FIRST_DYNAMIC_ID: u64 = 16;

thread_local! {
    static NEXT_SYMBOL_ID: Cell<u64> = const { Cell::new(FIRST_DYNAMIC_ID) };
}

/// A symbol. Two symbols are `===` only when they are the same allocation;
/// equal descriptions do not make equal symbols.
#[derive(Debug)]
pub struct JsSymbol {
    pub id: u64,
    pub description: Option<String>,
}

impl JsSymbol {
    pub fn new(description: Option<String>) -> Self {
        let id = NEXT_SYMBOL_ID.with(|next| {
            let id = next.get();
            next.set(id + 1);
            id
        });
        Self { id, description }
    }

    pub fn well_known(id: u64, description: &str) -> Self {
        Self { id, description: Some(description.to_string()) }
    }

    pub fn to_display_string(&self) -> String {
        match &self.description {
            Some(d) => format!("Symbol({d})"),
            None => "Symbol()".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_descriptions_do_not_share_identity() {
        let a = JsSymbol::new(Some("s".to_string()));
        let b = JsSymbol::new(Some("s".to_string()));
        assert_ne!(a.id, b.id);
    }
}
