//! Typed arrays: fixed-size, element-kind-tagged, zero-initialized.

use std::cell::RefCell;

use crate::value::{number_to_string, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Int8,
    Uint8,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Float32,
    Float64,
}

impl ElementKind {
    pub fn constructor_name(self) -> &'static str {
        match self {
            ElementKind::Int8 => "Int8Array",
            ElementKind::Uint8 => "Uint8Array",
            ElementKind::Int16 => "Int16Array",
            ElementKind::Uint16 => "Uint16Array",
            ElementKind::Int32 => "Int32Array",
            ElementKind::Uint32 => "Uint32Array",
            ElementKind::Float32 => "Float32Array",
            ElementKind::Float64 => "Float64Array",
        }
    }

    pub fn bytes_per_element(self) -> usize {
        match self {
            ElementKind::Int8 | ElementKind::Uint8 => 1,
            ElementKind::Int16 | ElementKind::Uint16 => 2,
            ElementKind::Int32 | ElementKind::Uint32 | ElementKind::Float32 => 4,
            ElementKind::Float64 => 8,
        }
    }

    /// Coerce a double through the element kind's wrapping conversion.
    pub fn clamp(self, n: f64) -> f64 {
        if matches!(self, ElementKind::Float32) {
            return n as f32 as f64;
        }
        if matches!(self, ElementKind::Float64) {
            return n;
        }
        if n.is_nan() || n.is_infinite() {
            return 0.0;
        }
        let i = n.trunc() as i64;
        match self {
            ElementKind::Int8 => i as i8 as f64,
            ElementKind::Uint8 => i as u8 as f64,
            ElementKind::Int16 => i as i16 as f64,
            ElementKind::Uint16 => i as u16 as f64,
            ElementKind::Int32 => i as i32 as f64,
            ElementKind::Uint32 => i as u32 as f64,
            ElementKind::Float32 | ElementKind::Float64 => unreachable!(),
        }
    }
}

/// A typed array. The element kind is fixed at construction; storage is a
/// zero-initialized vector of doubles coerced through the kind on write.
#[derive(Debug)]
pub struct JsTypedArray {
    pub kind: ElementKind,
    data: RefCell<Vec<f64>>,
}

impl JsTypedArray {
    pub fn zeroed(kind: ElementKind, length: usize) -> Self {
        Self { kind, data: RefCell::new(vec![0.0; length]) }
    }

    pub fn from_values(kind: ElementKind, values: impl IntoIterator<Item = f64>) -> Self {
        Self { kind, data: RefCell::new(values.into_iter().map(|n| kind.clamp(n)).collect()) }
    }

    pub fn len(&self) -> usize {
        self.data.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.borrow().is_empty()
    }

    pub fn byte_length(&self) -> usize {
        self.len() * self.kind.bytes_per_element()
    }

    pub fn get(&self, index: usize) -> Value {
        match self.data.borrow().get(index) {
            Some(n) => Value::Number(*n),
            None => Value::Undefined,
        }
    }

    /// Out-of-range writes are ignored (typed arrays never grow).
    pub fn set(&self, index: usize, n: f64) {
        let mut data = self.data.borrow_mut();
        if let Some(slot) = data.get_mut(index) {
            *slot = self.kind.clamp(n);
        }
    }

    pub fn fill(&self, n: f64) {
        let clamped = self.kind.clamp(n);
        self.data.borrow_mut().fill(clamped);
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.data.borrow().clone()
    }

    pub fn join(&self, sep: &str) -> String {
        self.data.borrow().iter().map(|n| number_to_string(*n)).collect::<Vec<_>>().join(sep)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction_zero_initializes() {
        let ta = JsTypedArray::zeroed(ElementKind::Int32, 4);
        assert_eq!(ta.len(), 4);
        assert_eq!(ta.get(2).as_number(), Some(0.0));
        assert_eq!(ta.byte_length(), 16);
    }

    #[test]
    fn element_kind_wraps_on_write() {
        let ta = JsTypedArray::zeroed(ElementKind::Uint8, 1);
        ta.set(0, 300.0);
        assert_eq!(ta.get(0).as_number(), Some(44.0));
        ta.set(0, -1.0);
        assert_eq!(ta.get(0).as_number(), Some(255.0));
    }

    #[test]
    fn out_of_range_write_is_ignored() {
        let ta = JsTypedArray::zeroed(ElementKind::Float64, 2);
        ta.set(5, 1.0);
        assert_eq!(ta.len(), 2);
    }
}
