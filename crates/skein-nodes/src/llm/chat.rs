//! Chat completion nodes for OpenAI-compatible APIs
//!
//! The completion node streams its response: every content part is routed
//! through `on_content_part` so downstream nodes can react per chunk, and
//! the assembled message is produced as the final output. The HTTP request
//! blocks the engine for its duration, which is the deal every node makes
//! with the cooperative scheduler.

use std::io::{BufRead, BufReader, Lines};

use skein_engine::{
    new_node, Controller, DataNode, DisplayMetadata, ExecutionMode, Node, NodeDescriptor,
    NodeError, NodeMetadata, NodeOutput, NodeProducer, NodeRegistration, NodeResult, PortMetadata,
    PortValue, ProducerStep, ValueMap,
};

use crate::helpers;

const CATEGORY: &str = "LLM";
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Appends one `{role, content}` message to a chat message list
#[derive(Clone, Default)]
pub struct AppendToChatMessageListNode;

impl NodeDescriptor for AppendToChatMessageListNode {
    fn meta() -> NodeMetadata {
        NodeMetadata::new("Append To Chat Message List", CATEGORY)
            .execution_hint(ExecutionMode::Data)
            .input(PortMetadata::new("message_list", "list<chat_message>"))
            .input(
                PortMetadata::new("role", "str")
                    .widget("str_select")
                    .options(serde_json::json!({
                        "default": "user",
                        "choices": ["user", "assistant", "system"],
                    })),
            )
            .input(PortMetadata::new("content", "str").widget("str_multiline"))
            .output(PortMetadata::new("message_list", "list<chat_message>"))
    }
}

impl DataNode for AppendToChatMessageListNode {
    fn evaluate(&mut self, _ctx: &mut Controller<'_>, mut inputs: ValueMap) -> NodeResult<ValueMap> {
        let role = helpers::take_string(&mut inputs, "role")?;
        let content = helpers::take_string(&mut inputs, "content")?;
        let mut messages = match helpers::opt(&mut inputs, "message_list") {
            Some(list) => match list.to_json() {
                serde_json::Value::Array(items) => items,
                _ => return Err(NodeError::invalid_input("message_list", "a message list")),
            },
            None => Vec::new(),
        };
        messages.push(serde_json::json!({"role": role, "content": content}));
        let mut out = ValueMap::new();
        out.insert(
            "message_list".to_string(),
            PortValue::from(serde_json::Value::Array(messages)),
        );
        Ok(out)
    }
}

inventory::submit!(NodeRegistration {
    node_type: "LLM.AppendToChatMessageListNode",
    construct: new_node::<AppendToChatMessageListNode>,
    meta: Some(AppendToChatMessageListNode::meta),
});

/// Streaming chat completion against an OpenAI-compatible endpoint
#[derive(Clone, Default)]
pub struct ChatCompletionNode;

impl NodeDescriptor for ChatCompletionNode {
    fn meta() -> NodeMetadata {
        NodeMetadata::new("Chat Completion", CATEGORY)
            .input(PortMetadata::new("api_key", "str").options(serde_json::json!({"default": ""})))
            .input(
                PortMetadata::new("base_url", "str")
                    .options(serde_json::json!({"default": DEFAULT_BASE_URL})),
            )
            .input(PortMetadata::new("model", "str"))
            .input(PortMetadata::new("messages", "list<chat_message>"))
            .input(
                PortMetadata::new("temperature", "float")
                    .options(serde_json::json!({"default": 0.7})),
            )
            .input(
                PortMetadata::new("max_tokens", "int")
                    .options(serde_json::json!({"default": 1000})),
            )
            .output(PortMetadata::new("role", "str"))
            .output(PortMetadata::new("content", "str"))
            .output(PortMetadata::route("on_content_part"))
            .output(PortMetadata::new("content_part", "str"))
            .display(DisplayMetadata::text("streaming"))
    }
}

impl Node for ChatCompletionNode {
    fn execute(
        &mut self,
        _ctx: &mut Controller<'_>,
        mut inputs: ValueMap,
    ) -> NodeResult<Box<dyn NodeProducer>> {
        let model = helpers::take_string(&mut inputs, "model")?;
        let messages = helpers::take_array(&mut inputs, "messages")?;
        let api_key = helpers::opt(&mut inputs, "api_key")
            .and_then(|v| v.as_string())
            .unwrap_or_default();
        let base_url = helpers::opt(&mut inputs, "base_url")
            .and_then(|v| v.as_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let temperature = helpers::opt(&mut inputs, "temperature")
            .and_then(|v| v.as_f64())
            .unwrap_or(0.7);
        let max_tokens = helpers::opt(&mut inputs, "max_tokens")
            .and_then(|v| v.as_i64())
            .unwrap_or(1000);

        let request = ChatRequest {
            url: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key,
            body: serde_json::json!({
                "model": model,
                "messages": messages,
                "temperature": temperature,
                "max_tokens": max_tokens,
                "stream": true,
            }),
        };
        Ok(Box::new(ChatCompletionProducer {
            request: Some(request),
            lines: None,
            content: String::new(),
            finished: false,
        }))
    }
}

inventory::submit!(NodeRegistration {
    node_type: "LLM.ChatCompletionNode",
    construct: new_node::<ChatCompletionNode>,
    meta: Some(ChatCompletionNode::meta),
});

struct ChatRequest {
    url: String,
    api_key: String,
    body: serde_json::Value,
}

struct ChatCompletionProducer {
    request: Option<ChatRequest>,
    lines: Option<Lines<BufReader<reqwest::blocking::Response>>>,
    content: String,
    finished: bool,
}

impl std::fmt::Debug for ChatCompletionProducer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatCompletionProducer")
            .field("content", &self.content)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

/// One line of a server-sent-event completion stream
#[derive(Debug, PartialEq)]
enum StreamLine {
    Content(String),
    Done,
    Skip,
}

fn parse_stream_line(line: &str) -> StreamLine {
    let Some(payload) = line.trim().strip_prefix("data:") else {
        return StreamLine::Skip;
    };
    let payload = payload.trim_start();
    if payload == "[DONE]" {
        return StreamLine::Done;
    }
    let Ok(value) = serde_json::from_str::<serde_json::Value>(payload) else {
        return StreamLine::Skip;
    };
    match value["choices"][0]["delta"]["content"].as_str() {
        Some(part) if !part.is_empty() => StreamLine::Content(part.to_string()),
        _ => StreamLine::Skip,
    }
}

impl ChatCompletionProducer {
    fn ensure_stream(&mut self, ctx: &mut Controller<'_>) -> NodeResult<()> {
        if self.lines.is_some() {
            return Ok(());
        }
        let request = self
            .request
            .take()
            .ok_or_else(|| NodeError::new("completion stream already consumed"))?;
        log::debug!("requesting chat completion from {}", request.url);

        let client = reqwest::blocking::Client::new();
        let mut builder = client.post(&request.url).json(&request.body);
        if !request.api_key.is_empty() {
            builder = builder.bearer_auth(&request.api_key);
        }
        let response = builder
            .send()
            .map_err(|e| NodeError::new(format!("chat completion request failed: {e}")))?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(NodeError::new(format!(
                "chat completion API error ({status}): {body}"
            )));
        }
        ctx.send_event("display", serde_json::json!({"streaming": ""}));
        self.lines = Some(BufReader::new(response).lines());
        Ok(())
    }

    /// Next line of the stream, `None` once it is exhausted
    fn next_line(&mut self) -> NodeResult<Option<String>> {
        let Some(lines) = self.lines.as_mut() else {
            return Ok(None);
        };
        match lines.next() {
            Some(Ok(line)) => Ok(Some(line)),
            Some(Err(e)) => Err(NodeError::new(format!(
                "error reading completion stream: {e}"
            ))),
            None => Ok(None),
        }
    }
}

impl NodeProducer for ChatCompletionProducer {
    fn step(
        &mut self,
        ctx: &mut Controller<'_>,
        _resume: Option<Vec<PortValue>>,
    ) -> NodeResult<ProducerStep> {
        if self.finished {
            return Ok(ProducerStep::Done);
        }
        self.ensure_stream(ctx)?;
        loop {
            let Some(line) = self.next_line()? else { break };
            match parse_stream_line(&line) {
                StreamLine::Content(part) => {
                    self.content.push_str(&part);
                    ctx.send_event("append", serde_json::json!({"streaming": part}));
                    let mut data = ValueMap::new();
                    data.insert("content_part".to_string(), PortValue::from(part));
                    return Ok(ProducerStep::Yield(NodeOutput::routed(
                        "on_content_part",
                        data,
                    )));
                }
                StreamLine::Done => break,
                StreamLine::Skip => continue,
            }
        }
        self.finished = true;
        let mut data = ValueMap::new();
        data.insert("role".to_string(), PortValue::from("assistant"));
        data.insert(
            "content".to_string(),
            PortValue::from(std::mem::take(&mut self.content)),
        );
        Ok(ProducerStep::Yield(NodeOutput::data(data)))
    }
}
