use async_openai::{
    error::OpenAIError,
    types::{
        ChatCompletionRequestSystemMessage, ChatCompletionRequestUserMessage,
        CreateChatCompletionRequest, CreateChatCompletionRequestArgs, CreateChatCompletionResponse,
    },
};
use common::error::AppError;
use serde_json::Value;

use crate::RetrievedChunk;

pub fn create_user_message(context_json: &Value, query: &str) -> String {
    format!(
        r"
        Context Information:
        ==================
        {context_json}

        User Question:
        ==================
        {query}
        "
    )
}

/// Convert retrieved chunks to JSON format for LLM context
pub fn chunks_to_chat_context(chunks: &[RetrievedChunk]) -> Value {
    fn round_score(value: f32) -> f64 {
        (f64::from(value) * 1000.0).round() / 1000.0
    }

    serde_json::json!(chunks
        .iter()
        .map(|chunk| {
            serde_json::json!({
                "position": chunk.chunk.position,
                "content": chunk.chunk.text,
                "score": round_score(chunk.score),
            })
        })
        .collect::<Vec<_>>())
}

pub fn create_chat_request(
    user_message: String,
    model: &str,
    system_prompt: &str,
) -> Result<CreateChatCompletionRequest, OpenAIError> {
    CreateChatCompletionRequestArgs::default()
        .model(model)
        .messages([
            ChatCompletionRequestSystemMessage::from(system_prompt).into(),
            ChatCompletionRequestUserMessage::from(user_message).into(),
        ])
        .build()
}

/// Text of the first choice, exactly as the model returned it.
pub fn process_llm_response(response: CreateChatCompletionResponse) -> Result<String, AppError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or(AppError::LLMParsing(
            "No content found in LLM response".into(),
        ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::IndexedChunk;
    use async_openai::types::ChatCompletionRequestMessage;

    fn retrieved(position: usize, text: &str, score: f32) -> RetrievedChunk {
        RetrievedChunk {
            chunk: IndexedChunk {
                position,
                text: text.into(),
                embedding: vec![],
            },
            score,
        }
    }

    #[test]
    fn test_chunks_to_chat_context_rounds_scores() {
        let context = chunks_to_chat_context(&[retrieved(4, "Revenue rose 12%.", 0.123_456)]);
        let first = &context[0];
        assert_eq!(first["position"], 4);
        assert_eq!(first["content"], "Revenue rose 12%.");
        assert_eq!(first["score"], 0.123);
    }

    #[test]
    fn test_user_message_contains_context_and_question() {
        let context = chunks_to_chat_context(&[retrieved(0, "alpha", 0.5)]);
        let message = create_user_message(&context, "What is alpha?");
        assert!(message.contains("\"content\":\"alpha\""));
        assert!(message.contains("What is alpha?"));
    }

    fn completion(content: serde_json::Value) -> CreateChatCompletionResponse {
        serde_json::from_value(serde_json::json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 0,
            "model": "gpt-test",
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": content },
                "finish_reason": "stop",
                "logprobs": null
            }]
        }))
        .expect("completion response")
    }

    #[test]
    fn test_llm_response_text_is_returned_unchanged() {
        let answer = process_llm_response(completion("  Revenue rose 12%.\n".into()))
            .expect("content");
        assert_eq!(answer, "  Revenue rose 12%.\n");

        let empty = process_llm_response(completion("".into())).expect("empty content");
        assert_eq!(empty, "");

        let missing = process_llm_response(completion(serde_json::Value::Null));
        assert!(matches!(missing, Err(AppError::LLMParsing(_))));
    }

    #[test]
    fn test_chat_request_carries_model_and_prompts() {
        let request = create_chat_request("question".into(), "gpt-test", "be brief")
            .expect("request");
        assert_eq!(request.model, "gpt-test");
        assert_eq!(request.messages.len(), 2);
        assert!(matches!(
            request.messages[0],
            ChatCompletionRequestMessage::System(_)
        ));
        assert!(matches!(
            request.messages[1],
            ChatCompletionRequestMessage::User(_)
        ));
    }
}
