//! List and dict nodes
//!
//! Collections are plain JSON arrays and objects. Items are read through
//! variable cells when necessary, so a collection always holds data, never
//! references.

use skein_engine::{
    new_node, Controller, DataNode, ExecutionMode, NodeDescriptor, NodeError, NodeMetadata,
    NodeRegistration, NodeResult, PortMetadata, PortValue, ValueMap,
};

use crate::helpers;

const CATEGORY: &str = "Basic/Collection";

fn list_output(items: Vec<serde_json::Value>) -> ValueMap {
    let mut out = ValueMap::new();
    out.insert(
        "list".to_string(),
        PortValue::from(serde_json::Value::Array(items)),
    );
    out
}

fn dict_output(map: serde_json::Map<String, serde_json::Value>) -> ValueMap {
    let mut out = ValueMap::new();
    out.insert(
        "dict".to_string(),
        PortValue::from(serde_json::Value::Object(map)),
    );
    out
}

#[derive(Clone, Default)]
pub struct EmptyListNode;

impl NodeDescriptor for EmptyListNode {
    fn meta() -> NodeMetadata {
        NodeMetadata::new("Empty List", CATEGORY)
            .execution_hint(ExecutionMode::DataOnce)
            .output(PortMetadata::new("list", "list<*>"))
    }
}

impl DataNode for EmptyListNode {
    fn evaluate(&mut self, _ctx: &mut Controller<'_>, _inputs: ValueMap) -> NodeResult<ValueMap> {
        Ok(list_output(Vec::new()))
    }
}

inventory::submit!(NodeRegistration {
    node_type: "EmptyListNode",
    construct: new_node::<EmptyListNode>,
    meta: Some(EmptyListNode::meta),
});

/// Builds a list from up to five item slots, optionally extending an
/// existing list. Unconnected slots are simply skipped.
#[derive(Clone, Default)]
pub struct ListNode;

impl NodeDescriptor for ListNode {
    fn meta() -> NodeMetadata {
        let mut meta = NodeMetadata::new("List", CATEGORY)
            .execution_hint(ExecutionMode::Data)
            .input(PortMetadata::new("last_list", "list<T>"));
        for i in 0..5 {
            meta = meta.input(PortMetadata::new(format!("item_{i}"), "T"));
        }
        meta.output(PortMetadata::new("list", "list<T>")).generic("T")
    }
}

impl DataNode for ListNode {
    fn evaluate(&mut self, _ctx: &mut Controller<'_>, mut inputs: ValueMap) -> NodeResult<ValueMap> {
        let mut items = match helpers::opt(&mut inputs, "last_list") {
            Some(list) => match list.to_json() {
                serde_json::Value::Array(items) => items,
                _ => return Err(NodeError::invalid_input("last_list", "a list")),
            },
            None => Vec::new(),
        };
        for i in 0..5 {
            if let Some(item) = helpers::opt(&mut inputs, &format!("item_{i}")) {
                items.push(item.to_json());
            }
        }
        Ok(list_output(items))
    }
}

inventory::submit!(NodeRegistration {
    node_type: "ListNode",
    construct: new_node::<ListNode>,
    meta: Some(ListNode::meta),
});

#[derive(Clone, Default)]
pub struct AppendToListNode;

impl NodeDescriptor for AppendToListNode {
    fn meta() -> NodeMetadata {
        NodeMetadata::new("Append To List", CATEGORY)
            .execution_hint(ExecutionMode::Data)
            .input(PortMetadata::new("list", "list<T>"))
            .input(PortMetadata::new("item", "T"))
            .output(PortMetadata::new("list", "list<T>"))
            .generic("T")
    }
}

impl DataNode for AppendToListNode {
    fn evaluate(&mut self, _ctx: &mut Controller<'_>, mut inputs: ValueMap) -> NodeResult<ValueMap> {
        let item = helpers::take(&mut inputs, "item")?;
        let mut items = match helpers::opt(&mut inputs, "list") {
            Some(list) => match list.to_json() {
                serde_json::Value::Array(items) => items,
                _ => return Err(NodeError::invalid_input("list", "a list")),
            },
            None => Vec::new(),
        };
        items.push(item.to_json());
        Ok(list_output(items))
    }
}

inventory::submit!(NodeRegistration {
    node_type: "AppendToListNode",
    construct: new_node::<AppendToListNode>,
    meta: Some(AppendToListNode::meta),
});

#[derive(Clone, Default)]
pub struct GetListItemNode;

impl NodeDescriptor for GetListItemNode {
    fn meta() -> NodeMetadata {
        NodeMetadata::new("Get List Item", CATEGORY)
            .execution_hint(ExecutionMode::Data)
            .input(PortMetadata::new("list", "list<T>"))
            .input(PortMetadata::new("index", "int"))
            .output(PortMetadata::new("item", "T"))
            .generic("T")
    }
}

impl DataNode for GetListItemNode {
    fn evaluate(&mut self, _ctx: &mut Controller<'_>, mut inputs: ValueMap) -> NodeResult<ValueMap> {
        let items = helpers::take_array(&mut inputs, "list")?;
        let index = helpers::take_i64(&mut inputs, "index")?;
        let item = usize::try_from(index)
            .ok()
            .and_then(|i| items.get(i))
            .ok_or_else(|| {
                NodeError::new(format!(
                    "index {index} out of range for list of {} items",
                    items.len()
                ))
            })?;
        let mut out = ValueMap::new();
        out.insert("item".to_string(), PortValue::from(item.clone()));
        Ok(out)
    }
}

inventory::submit!(NodeRegistration {
    node_type: "GetListItemNode",
    construct: new_node::<GetListItemNode>,
    meta: Some(GetListItemNode::meta),
});

#[derive(Clone, Default)]
pub struct SetListItemNode;

impl NodeDescriptor for SetListItemNode {
    fn meta() -> NodeMetadata {
        NodeMetadata::new("Set List Item", CATEGORY)
            .execution_hint(ExecutionMode::Data)
            .input(PortMetadata::new("list", "list<T>"))
            .input(PortMetadata::new("index", "int"))
            .input(PortMetadata::new("item", "T"))
            .output(PortMetadata::new("list", "list<T>"))
            .generic("T")
    }
}

impl DataNode for SetListItemNode {
    fn evaluate(&mut self, _ctx: &mut Controller<'_>, mut inputs: ValueMap) -> NodeResult<ValueMap> {
        let mut items = helpers::take_array(&mut inputs, "list")?;
        let index = helpers::take_i64(&mut inputs, "index")?;
        let item = helpers::take(&mut inputs, "item")?;
        let len = items.len();
        let slot = usize::try_from(index)
            .ok()
            .and_then(|i| items.get_mut(i))
            .ok_or_else(|| {
                NodeError::new(format!(
                    "index {index} out of range for list of {len} items"
                ))
            })?;
        *slot = item.to_json();
        Ok(list_output(items))
    }
}

inventory::submit!(NodeRegistration {
    node_type: "SetListItemNode",
    construct: new_node::<SetListItemNode>,
    meta: Some(SetListItemNode::meta),
});

#[derive(Clone, Default)]
pub struct EmptyDictNode;

impl NodeDescriptor for EmptyDictNode {
    fn meta() -> NodeMetadata {
        NodeMetadata::new("Empty Dict", CATEGORY)
            .execution_hint(ExecutionMode::DataOnce)
            .output(PortMetadata::new("dict", "dict<*,*>"))
    }
}

impl DataNode for EmptyDictNode {
    fn evaluate(&mut self, _ctx: &mut Controller<'_>, _inputs: ValueMap) -> NodeResult<ValueMap> {
        Ok(dict_output(serde_json::Map::new()))
    }
}

inventory::submit!(NodeRegistration {
    node_type: "EmptyDictNode",
    construct: new_node::<EmptyDictNode>,
    meta: Some(EmptyDictNode::meta),
});

#[derive(Clone, Default)]
pub struct PutToDictNode;

impl NodeDescriptor for PutToDictNode {
    fn meta() -> NodeMetadata {
        NodeMetadata::new("Put To Dict", CATEGORY)
            .execution_hint(ExecutionMode::Data)
            .input(PortMetadata::new("dict", "dict<str,T>"))
            .input(PortMetadata::new("key", "str"))
            .input(PortMetadata::new("value", "T"))
            .output(PortMetadata::new("dict", "dict<str,T>"))
            .generic("T")
    }
}

impl DataNode for PutToDictNode {
    fn evaluate(&mut self, _ctx: &mut Controller<'_>, mut inputs: ValueMap) -> NodeResult<ValueMap> {
        let key = helpers::take_string(&mut inputs, "key")?;
        let value = helpers::take(&mut inputs, "value")?;
        let mut map = match helpers::opt(&mut inputs, "dict") {
            Some(dict) => match dict.to_json() {
                serde_json::Value::Object(map) => map,
                _ => return Err(NodeError::invalid_input("dict", "a dict")),
            },
            None => serde_json::Map::new(),
        };
        map.insert(key, value.to_json());
        Ok(dict_output(map))
    }
}

inventory::submit!(NodeRegistration {
    node_type: "PutToDictNode",
    construct: new_node::<PutToDictNode>,
    meta: Some(PutToDictNode::meta),
});

#[derive(Clone, Default)]
pub struct GetFromDictNode;

impl NodeDescriptor for GetFromDictNode {
    fn meta() -> NodeMetadata {
        NodeMetadata::new("Get From Dict", CATEGORY)
            .execution_hint(ExecutionMode::Data)
            .input(PortMetadata::new("dict", "dict<str,T>"))
            .input(PortMetadata::new("key", "str"))
            .output(PortMetadata::new("value", "T"))
            .generic("T")
    }
}

impl DataNode for GetFromDictNode {
    fn evaluate(&mut self, _ctx: &mut Controller<'_>, mut inputs: ValueMap) -> NodeResult<ValueMap> {
        let map = helpers::take_object(&mut inputs, "dict")?;
        let key = helpers::take_string(&mut inputs, "key")?;
        let value = map
            .get(&key)
            .ok_or_else(|| NodeError::new(format!("key '{key}' not found in dict")))?;
        let mut out = ValueMap::new();
        out.insert("value".to_string(), PortValue::from(value.clone()));
        Ok(out)
    }
}

inventory::submit!(NodeRegistration {
    node_type: "GetFromDictNode",
    construct: new_node::<GetFromDictNode>,
    meta: Some(GetFromDictNode::meta),
});
