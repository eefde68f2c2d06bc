//! Input extraction helpers shared by node implementations

use skein_engine::{NodeError, NodeResult, PortValue, ValueMap};

/// Remove a required input pin
pub(crate) fn take(inputs: &mut ValueMap, pin: &str) -> NodeResult<PortValue> {
    inputs
        .remove(pin)
        .ok_or_else(|| NodeError::missing_input(pin))
}

/// Remove an optional input pin
pub(crate) fn opt(inputs: &mut ValueMap, pin: &str) -> Option<PortValue> {
    inputs.remove(pin)
}

pub(crate) fn take_i64(inputs: &mut ValueMap, pin: &str) -> NodeResult<i64> {
    take(inputs, pin)?
        .as_i64()
        .ok_or_else(|| NodeError::invalid_input(pin, "an integer"))
}

pub(crate) fn take_string(inputs: &mut ValueMap, pin: &str) -> NodeResult<String> {
    take(inputs, pin)?
        .as_string()
        .ok_or_else(|| NodeError::invalid_input(pin, "a string"))
}

/// Remove a required input and read it as a JSON array
pub(crate) fn take_array(
    inputs: &mut ValueMap,
    pin: &str,
) -> NodeResult<Vec<serde_json::Value>> {
    match take(inputs, pin)?.to_json() {
        serde_json::Value::Array(items) => Ok(items),
        _ => Err(NodeError::invalid_input(pin, "a list")),
    }
}

/// Remove a required input and read it as a JSON object
pub(crate) fn take_object(
    inputs: &mut ValueMap,
    pin: &str,
) -> NodeResult<serde_json::Map<String, serde_json::Value>> {
    match take(inputs, pin)?.to_json() {
        serde_json::Value::Object(map) => Ok(map),
        _ => Err(NodeError::invalid_input(pin, "a dict")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs() -> ValueMap {
        let mut map = ValueMap::new();
        map.insert("n".to_string(), PortValue::from(3i64));
        map.insert("s".to_string(), PortValue::from("hi"));
        map
    }

    #[test]
    fn test_take_removes_the_value() {
        let mut map = inputs();
        assert_eq!(take_i64(&mut map, "n").unwrap(), 3);
        assert!(take(&mut map, "n").is_err());
    }

    #[test]
    fn test_type_mismatch_names_the_pin() {
        let mut map = inputs();
        let err = take_i64(&mut map, "s").unwrap_err();
        assert!(err.to_string().contains("'s'"), "got: {err}");
    }
}
