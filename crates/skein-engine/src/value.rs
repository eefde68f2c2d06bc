//! Dynamic port values
//!
//! Values flowing between node ports are type-erased at runtime. Most values
//! are plain JSON; variable nodes additionally need a shared mutable cell so
//! that a "set" in one branch of the graph is visible to every holder of the
//! same variable. The engine is single-threaded per run, so cells are `Rc`
//! based and never cross threads.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Port name to value mapping, as produced and consumed by nodes
pub type ValueMap = HashMap<String, PortValue>;

/// A type-erased value carried on a data edge
#[derive(Clone)]
pub enum PortValue {
    /// Plain JSON data
    Json(serde_json::Value),
    /// Shared mutable cell (a variable reference)
    Cell(ValueCell),
}

/// Shared mutable value cell, created by variable-defining nodes
#[derive(Clone)]
pub struct ValueCell(Rc<RefCell<PortValue>>);

impl ValueCell {
    /// Create a cell holding an initial value
    pub fn new(initial: PortValue) -> Self {
        Self(Rc::new(RefCell::new(initial)))
    }

    /// Clone the current value out of the cell
    pub fn get(&self) -> PortValue {
        self.0.borrow().clone()
    }

    /// Replace the cell's value
    pub fn set(&self, value: PortValue) {
        *self.0.borrow_mut() = value;
    }
}

impl fmt::Debug for ValueCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValueCell({:?})", self.0.borrow())
    }
}

impl PortValue {
    /// The JSON null value
    pub fn null() -> Self {
        Self::Json(serde_json::Value::Null)
    }

    /// Borrow the inner JSON value; `None` for cells
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(v) => Some(v),
            Self::Cell(_) => None,
        }
    }

    /// Convert to plain JSON, reading through cells
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Json(v) => v.clone(),
            Self::Cell(c) => c.get().to_json(),
        }
    }

    /// Borrow the cell, if this value is a variable reference
    pub fn as_cell(&self) -> Option<&ValueCell> {
        match self {
            Self::Cell(c) => Some(c),
            Self::Json(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Json(v) => v.as_i64(),
            Self::Cell(c) => c.get().as_i64(),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Json(v) => v.as_f64(),
            Self::Cell(c) => c.get().as_f64(),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Json(v) => v.as_bool(),
            Self::Cell(c) => c.get().as_bool(),
        }
    }

    /// Clone the string content, reading through cells
    pub fn as_string(&self) -> Option<String> {
        match self {
            Self::Json(v) => v.as_str().map(str::to_string),
            Self::Cell(c) => c.get().as_string(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Json(serde_json::Value::Null))
    }

    /// Truthiness used by control-flow nodes: null, false, zero, and empty
    /// strings/arrays/objects are false, everything else is true.
    pub fn truthy(&self) -> bool {
        match self {
            Self::Cell(c) => c.get().truthy(),
            Self::Json(v) => match v {
                serde_json::Value::Null => false,
                serde_json::Value::Bool(b) => *b,
                serde_json::Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
                serde_json::Value::String(s) => !s.is_empty(),
                serde_json::Value::Array(a) => !a.is_empty(),
                serde_json::Value::Object(o) => !o.is_empty(),
            },
        }
    }
}

impl fmt::Debug for PortValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(v) => write!(f, "{v:?}"),
            Self::Cell(c) => c.fmt(f),
        }
    }
}

impl From<serde_json::Value> for PortValue {
    fn from(v: serde_json::Value) -> Self {
        Self::Json(v)
    }
}

impl From<ValueCell> for PortValue {
    fn from(c: ValueCell) -> Self {
        Self::Cell(c)
    }
}

impl From<i64> for PortValue {
    fn from(v: i64) -> Self {
        Self::Json(serde_json::json!(v))
    }
}

impl From<f64> for PortValue {
    fn from(v: f64) -> Self {
        Self::Json(serde_json::json!(v))
    }
}

impl From<bool> for PortValue {
    fn from(v: bool) -> Self {
        Self::Json(serde_json::json!(v))
    }
}

impl From<&str> for PortValue {
    fn from(v: &str) -> Self {
        Self::Json(serde_json::json!(v))
    }
}

impl From<String> for PortValue {
    fn from(v: String) -> Self {
        Self::Json(serde_json::json!(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_truthiness() {
        assert!(!PortValue::null().truthy());
        assert!(!PortValue::from(false).truthy());
        assert!(!PortValue::from(0i64).truthy());
        assert!(!PortValue::from("").truthy());
        assert!(!PortValue::from(json!([])).truthy());
        assert!(!PortValue::from(json!({})).truthy());

        assert!(PortValue::from(true).truthy());
        assert!(PortValue::from(-3i64).truthy());
        assert!(PortValue::from("x").truthy());
        assert!(PortValue::from(json!([1])).truthy());
    }

    #[test]
    fn test_cell_is_shared() {
        let cell = ValueCell::new(PortValue::from(1i64));
        let a = PortValue::from(cell.clone());
        let b = PortValue::from(cell);

        a.as_cell().unwrap().set(PortValue::from(42i64));
        assert_eq!(b.as_cell().unwrap().get().as_i64(), Some(42));
    }

    #[test]
    fn test_accessors_read_through_cells() {
        let cell = ValueCell::new(PortValue::from("hello"));
        let value = PortValue::from(cell);
        assert_eq!(value.as_string().as_deref(), Some("hello"));
        assert_eq!(value.to_json(), json!("hello"));
        assert!(value.as_json().is_none());
    }

    #[test]
    fn test_to_json_is_cell_transparent() {
        let inner = ValueCell::new(PortValue::from(json!({"n": 7})));
        let outer = ValueCell::new(PortValue::from(inner));
        assert_eq!(PortValue::from(outer).to_json(), json!({"n": 7}));
    }
}
