//! Math and comparison nodes

use std::cmp::Ordering;

use skein_engine::{
    new_node, Controller, DataNode, ExecutionMode, NodeDescriptor, NodeError, NodeMetadata,
    NodeRegistration, NodeResult, PortMetadata, PortValue, ValueMap,
};

use crate::helpers;

const MATH_CATEGORY: &str = "Basic/Math";
const LOGIC_CATEGORY: &str = "Basic/Logic";

#[derive(Clone, Default)]
pub struct AddIntNode;

impl NodeDescriptor for AddIntNode {
    fn meta() -> NodeMetadata {
        NodeMetadata::new("Add Int", MATH_CATEGORY)
            .execution_hint(ExecutionMode::Data)
            .input(PortMetadata::new("a", "int"))
            .input(PortMetadata::new("b", "int"))
            .output(PortMetadata::new("result", "int"))
    }
}

impl DataNode for AddIntNode {
    fn evaluate(&mut self, _ctx: &mut Controller<'_>, mut inputs: ValueMap) -> NodeResult<ValueMap> {
        let a = helpers::take_i64(&mut inputs, "a")?;
        let b = helpers::take_i64(&mut inputs, "b")?;
        let result = a
            .checked_add(b)
            .ok_or_else(|| NodeError::new("integer overflow"))?;
        let mut out = ValueMap::new();
        out.insert("result".to_string(), PortValue::from(result));
        Ok(out)
    }
}

inventory::submit!(NodeRegistration {
    node_type: "AddIntNode",
    construct: new_node::<AddIntNode>,
    meta: Some(AddIntNode::meta),
});

/// Binary arithmetic over numbers; `+` also concatenates strings
#[derive(Clone, Default)]
pub struct MathOperationNode;

impl NodeDescriptor for MathOperationNode {
    fn meta() -> NodeMetadata {
        NodeMetadata::new("Math Operation", MATH_CATEGORY)
            .execution_hint(ExecutionMode::Data)
            .input(PortMetadata::new("a", "*"))
            .input(PortMetadata::new("b", "*"))
            .input(
                PortMetadata::new("operator", "str")
                    .widget("str_select")
                    .options(serde_json::json!({
                        "default": "+",
                        "choices": ["+", "-", "*", "/", "%", "**"],
                    })),
            )
            .output(PortMetadata::new("result", "*"))
    }
}

impl DataNode for MathOperationNode {
    fn evaluate(&mut self, _ctx: &mut Controller<'_>, mut inputs: ValueMap) -> NodeResult<ValueMap> {
        let operator = helpers::take_string(&mut inputs, "operator")?;
        let a = helpers::take(&mut inputs, "a")?;
        let b = helpers::take(&mut inputs, "b")?;
        let mut out = ValueMap::new();
        out.insert("result".to_string(), apply_math(&operator, &a, &b)?);
        Ok(out)
    }
}

inventory::submit!(NodeRegistration {
    node_type: "MathOperationNode",
    construct: new_node::<MathOperationNode>,
    meta: Some(MathOperationNode::meta),
});

fn apply_math(operator: &str, a: &PortValue, b: &PortValue) -> NodeResult<PortValue> {
    // integer arithmetic when both operands are integers; division and
    // negative exponents go through floats
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        match operator {
            "+" => return checked(x.checked_add(y)),
            "-" => return checked(x.checked_sub(y)),
            "*" => return checked(x.checked_mul(y)),
            "%" => {
                if y == 0 {
                    return Err(NodeError::new("modulo by zero"));
                }
                return Ok(PortValue::from(x % y));
            }
            "**" if (0..=u32::MAX as i64).contains(&y) => {
                return checked(x.checked_pow(y as u32));
            }
            _ => {}
        }
    }
    if let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) {
        let result = match operator {
            "+" => x + y,
            "-" => x - y,
            "*" => x * y,
            "/" => {
                if y == 0.0 {
                    return Err(NodeError::new("division by zero"));
                }
                x / y
            }
            "%" => {
                if y == 0.0 {
                    return Err(NodeError::new("modulo by zero"));
                }
                x % y
            }
            "**" => x.powf(y),
            other => return Err(NodeError::new(format!("unknown operator '{other}'"))),
        };
        return Ok(PortValue::from(result));
    }
    if operator == "+" {
        if let (Some(x), Some(y)) = (a.as_string(), b.as_string()) {
            return Ok(PortValue::from(x + &y));
        }
    }
    Err(NodeError::new(format!(
        "cannot apply '{operator}' to the given operands"
    )))
}

fn checked(result: Option<i64>) -> NodeResult<PortValue> {
    result
        .map(PortValue::from)
        .ok_or_else(|| NodeError::new("integer overflow"))
}

/// Binary comparison over numbers or strings
#[derive(Clone, Default)]
pub struct CompareNode;

impl NodeDescriptor for CompareNode {
    fn meta() -> NodeMetadata {
        NodeMetadata::new("Compare", LOGIC_CATEGORY)
            .execution_hint(ExecutionMode::Data)
            .input(
                PortMetadata::new("operator", "str")
                    .widget("str_select")
                    .options(serde_json::json!({
                        "default": "==",
                        "choices": ["==", "!=", ">", ">=", "<", "<="],
                    })),
            )
            .input(PortMetadata::new("a", "T"))
            .input(PortMetadata::new("b", "T"))
            .output(PortMetadata::new("result", "bool"))
            .generic("T")
    }
}

impl DataNode for CompareNode {
    fn evaluate(&mut self, _ctx: &mut Controller<'_>, mut inputs: ValueMap) -> NodeResult<ValueMap> {
        let operator = helpers::take_string(&mut inputs, "operator")?;
        let a = helpers::take(&mut inputs, "a")?;
        let b = helpers::take(&mut inputs, "b")?;
        let mut out = ValueMap::new();
        out.insert(
            "result".to_string(),
            PortValue::from(apply_compare(&operator, &a, &b)?),
        );
        Ok(out)
    }
}

inventory::submit!(NodeRegistration {
    node_type: "CompareNode",
    construct: new_node::<CompareNode>,
    meta: Some(CompareNode::meta),
});

fn apply_compare(operator: &str, a: &PortValue, b: &PortValue) -> NodeResult<bool> {
    let ordering: Option<Ordering> = if let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) {
        x.partial_cmp(&y)
    } else if let (Some(x), Some(y)) = (a.as_string(), b.as_string()) {
        Some(x.cmp(&y))
    } else {
        None
    };
    match operator {
        "==" => Ok(match ordering {
            Some(ord) => ord == Ordering::Equal,
            None => a.to_json() == b.to_json(),
        }),
        "!=" => Ok(match ordering {
            Some(ord) => ord != Ordering::Equal,
            None => a.to_json() != b.to_json(),
        }),
        ">" | ">=" | "<" | "<=" => {
            let ord =
                ordering.ok_or_else(|| NodeError::new("operands are not orderable"))?;
            Ok(match operator {
                ">" => ord == Ordering::Greater,
                ">=" => ord != Ordering::Less,
                "<" => ord == Ordering::Less,
                _ => ord != Ordering::Greater,
            })
        }
        other => Err(NodeError::new(format!("unknown operator '{other}'"))),
    }
}
