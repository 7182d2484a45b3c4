use anyhow::Result;
use futures::StreamExt;
use openrouter_api::{OpenRouterClient, Ready, models::tool::ToolCall, types::chat::*};
use tracing::debug;

/// Appends a streamed tool-call chunk. Chunks without an id continue the
/// previous call's arguments.
fn merge_tool_call_chunk(tool_calls: &mut Vec<ToolCall>, chunk: &ToolCall) {
    match tool_calls.last_mut() {
        Some(last) if chunk.id.is_empty() => {
            last.function_call
                .arguments
                .push_str(&chunk.function_call.arguments);
            if last.function_call.name.is_empty() {
                last.function_call.name = chunk.function_call.name.clone();
            }
        }
        _ => tool_calls.push(chunk.clone()),
    }
}

/// Streams a chat completion and collects it into one assistant message.
/// Returns `None` when the model sent neither text nor tool calls.
pub async fn stream_and_collect_response(
    client: &OpenRouterClient<Ready>,
    mut request: ChatCompletionRequest,
) -> Result<Option<Message>> {
    request.stream = Some(true);
    let mut stream = client.chat()?.chat_completion_stream(request);

    let mut content = String::new();
    let mut tool_calls: Vec<ToolCall> = Vec::new();
    let mut chunks = 0usize;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        chunks += 1;
        let choice = chunk.choices.first();

        if let Some(c) = choice.and_then(|c| c.delta.content.as_deref()) {
            content.push_str(c);
        }

        if let Some(tool_call_chunks) = choice.and_then(|c| c.delta.tool_calls.as_ref()) {
            for tool_call in tool_call_chunks {
                merge_tool_call_chunk(&mut tool_calls, tool_call);
            }
        }
    }
    debug!(
        chunks,
        chars = content.len(),
        tool_calls = tool_calls.len(),
        "stream finished"
    );

    if content.is_empty() && tool_calls.is_empty() {
        return Ok(None);
    }

    Ok(Some(Message {
        role: "assistant".to_string(),
        content,
        tool_calls: if tool_calls.is_empty() {
            None
        } else {
            Some(tool_calls)
        },
        name: None,
        tool_call_id: None,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use openrouter_api::models::tool::FunctionCall;

    fn chunk(id: &str, name: &str, arguments: &str) -> ToolCall {
        ToolCall {
            id: id.to_string(),
            kind: "function".to_string(),
            function_call: FunctionCall {
                name: name.to_string(),
                arguments: arguments.to_string(),
            },
        }
    }

    #[test]
    fn test_argument_fragments_are_joined() {
        let mut calls = Vec::new();
        merge_tool_call_chunk(&mut calls, &chunk("call_1", "searchWeb", "{\"que"));
        merge_tool_call_chunk(&mut calls, &chunk("", "", "ry\": \"x\"}"));
        merge_tool_call_chunk(&mut calls, &chunk("call_2", "deepReason", "{}"));

        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].function_call.arguments, "{\"query\": \"x\"}");
        assert_eq!(calls[1].function_call.name, "deepReason");
    }
}
