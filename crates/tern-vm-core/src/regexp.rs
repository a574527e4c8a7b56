//! RegExp objects backed by the `regress` ECMAScript regex engine.

use std::cell::Cell;

use crate::error::{VmError, VmResult};

/// A compiled regular expression plus the one mutable property the language
/// exposes: `lastIndex`.
pub struct JsRegExp {
    pub source: String,
    pub flags: String,
    regex: regress::Regex,
    last_index: Cell<usize>,
}

impl std::fmt::Debug for JsRegExp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "JsRegExp({})", self.to_pattern_string())
    }
}

/// One successful match: overall range plus capture-group ranges.
#[derive(Debug)]
pub struct RegExpMatch {
    pub start: usize,
    pub end: usize,
    pub captures: Vec<Option<(usize, usize)>>,
}

impl JsRegExp {
    pub fn compile(source: &str, flags: &str) -> VmResult<Self> {
        let regex = regress::Regex::with_flags(source, flags)
            .map_err(|e| VmError::syntax_error(format!("Invalid regular expression: /{source}/{flags}: {e}")))?;
        Ok(Self { source: source.to_string(), flags: flags.to_string(), regex, last_index: Cell::new(0) })
    }

    pub fn is_global(&self) -> bool {
        self.flags.contains('g')
    }

    pub fn is_sticky(&self) -> bool {
        self.flags.contains('y')
    }

    pub fn last_index(&self) -> usize {
        self.last_index.get()
    }

    pub fn set_last_index(&self, index: usize) {
        self.last_index.set(index);
    }

    /// Find the first match at or after `start`.
    pub fn find_at(&self, text: &str, start: usize) -> Option<RegExpMatch> {
        if start > text.len() {
            return None;
        }
        let m = self.regex.find_from(text, start).next()?;
        let captures = m.captures.iter().map(|c| c.as_ref().map(|r| (r.start, r.end))).collect();
        Some(RegExpMatch { start: m.range.start, end: m.range.end, captures })
    }

    /// `/source/flags`.
    pub fn to_pattern_string(&self) -> String {
        format!("/{}/{}", self.source, self.flags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_at_honors_start_offset() {
        let re = JsRegExp::compile("a+", "g").unwrap();
        let m = re.find_at("baaab", 0).unwrap();
        assert_eq!((m.start, m.end), (1, 4));
        assert!(re.find_at("baaab", 4).is_none());
    }

    #[test]
    fn invalid_pattern_is_a_syntax_error() {
        let err = JsRegExp::compile("(", "").unwrap_err();
        assert!(matches!(err, VmError::SyntaxError(_)));
    }

    #[test]
    fn capture_groups_are_reported() {
        let re = JsRegExp::compile("(\\d+)-(\\d+)", "").unwrap();
        let m = re.find_at("x 12-34", 0).unwrap();
        assert_eq!(m.captures.len(), 2);
        assert_eq!(m.captures[0], Some((2, 4)));
        assert_eq!(m.captures[1], Some((5, 7)));
    }
}
