//! Prompt template node

use skein_engine::{
    new_node, Controller, DataNode, ExecutionMode, NodeDescriptor, NodeMetadata, NodeRegistration,
    NodeResult, PortMetadata, PortValue, ValueMap,
};

use crate::helpers;

/// Fills `$name` and `${name}` placeholders from a dict of variables
///
/// Unknown placeholders are left untouched and `$$` escapes a literal `$`,
/// so a template never fails to render.
#[derive(Clone, Default)]
pub struct PromptTemplateNode;

impl NodeDescriptor for PromptTemplateNode {
    fn meta() -> NodeMetadata {
        NodeMetadata::new("Prompt Template", "LLM")
            .execution_hint(ExecutionMode::Data)
            .input(PortMetadata::new("template", "str").widget("str_multiline"))
            .input(PortMetadata::new("variables", "dict<str, str>"))
            .output(PortMetadata::new("prompt", "str"))
    }
}

impl DataNode for PromptTemplateNode {
    fn evaluate(&mut self, _ctx: &mut Controller<'_>, mut inputs: ValueMap) -> NodeResult<ValueMap> {
        let template = helpers::take_string(&mut inputs, "template")?;
        let variables = helpers::take_object(&mut inputs, "variables")?;
        let mut out = ValueMap::new();
        out.insert(
            "prompt".to_string(),
            PortValue::from(substitute(&template, &variables)),
        );
        Ok(out)
    }
}

inventory::submit!(NodeRegistration {
    node_type: "LLM.PromptTemplateNode",
    construct: new_node::<PromptTemplateNode>,
    meta: Some(PromptTemplateNode::meta),
});

fn render(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Length of a leading `[A-Za-z_][A-Za-z0-9_]*` identifier, 0 if none
fn ident_len(s: &str) -> usize {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return 0,
    }
    1 + chars
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
        .count()
}

fn substitute(template: &str, variables: &serde_json::Map<String, serde_json::Value>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];

        let after = &rest[1..];
        if let Some(stripped) = after.strip_prefix('$') {
            out.push('$');
            rest = stripped;
        } else if let Some(braced) = after.strip_prefix('{') {
            match braced.find('}') {
                Some(end) if ident_len(&braced[..end]) == end && end > 0 => {
                    let name = &braced[..end];
                    match variables.get(name) {
                        Some(value) => out.push_str(&render(value)),
                        None => out.push_str(&rest[..end + 3]),
                    }
                    rest = &braced[end + 1..];
                }
                _ => {
                    out.push('$');
                    rest = after;
                }
            }
        } else {
            let len = ident_len(after);
            if len == 0 {
                out.push('$');
                rest = after;
            } else {
                let name = &after[..len];
                match variables.get(name) {
                    Some(value) => out.push_str(&render(value)),
                    None => out.push_str(&rest[..len + 1]),
                }
                rest = &after[len..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vars(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
        match value {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_bare_and_braced_placeholders() {
        let variables = vars(json!({"name": "World", "n": 3}));
        assert_eq!(substitute("Hello $name!", &variables), "Hello World!");
        assert_eq!(substitute("${n} tries", &variables), "3 tries");
        assert_eq!(substitute("$name${n}", &variables), "World3");
    }

    #[test]
    fn test_unknown_placeholders_are_kept() {
        let variables = vars(json!({}));
        assert_eq!(substitute("keep $missing here", &variables), "keep $missing here");
        assert_eq!(substitute("and ${gone} too", &variables), "and ${gone} too");
    }

    #[test]
    fn test_dollar_escapes() {
        let variables = vars(json!({"x": 1}));
        assert_eq!(substitute("$$x is $x", &variables), "$x is 1");
        assert_eq!(substitute("cost: 5$", &variables), "cost: 5$");
        assert_eq!(substitute("${not closed", &variables), "${not closed");
    }
}
