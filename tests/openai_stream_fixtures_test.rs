//! Wire-level fixtures for the OpenAI-compatible dialect, driven through the
//! validator and accumulator the way the orchestrator does.

use cheungfun::accumulator;
use cheungfun::prelude::*;

fn fold(fixtures: &[&str]) -> MessageSnapshot {
    let validator = OpenAiCompatValidator::new();
    let mut snapshot = MessageSnapshot::new("openai:gpt-4o-mini");
    for fixture in fixtures {
        let json: serde_json::Value = serde_json::from_str(fixture).expect("fixture is JSON");
        let chunk = validator.validate(&json).expect("fixture validates");
        accumulator::apply(&mut snapshot, &chunk);
    }
    snapshot
}

#[test]
fn streamed_tool_call_accumulates_across_continuation_chunks() {
    // Opening chunk carries id + name; continuations only index + arguments,
    // which is how OpenAI actually streams function calls.
    let snapshot = fold(&[
        r#"{"object":"chat.completion.chunk","id":"c1","model":"gpt-4o-mini","created":1,"choices":[{"index":0,"delta":{"role":"assistant","tool_calls":[{"index":0,"type":"function","id":"call_w1","function":{"name":"get_weather","arguments":""}}]},"finish_reason":null}]}"#,
        r#"{"object":"chat.completion.chunk","id":"c1","model":"gpt-4o-mini","created":1,"choices":[{"index":0,"delta":{"tool_calls":[{"index":0,"function":{"arguments":"{\"city\":"}}]},"finish_reason":null}]}"#,
        r#"{"object":"chat.completion.chunk","id":"c1","model":"gpt-4o-mini","created":1,"choices":[{"index":0,"delta":{"tool_calls":[{"index":0,"function":{"arguments":"\"Tokyo\"}"}}]},"finish_reason":null}]}"#,
        r#"{"object":"chat.completion.chunk","id":"c1","model":"gpt-4o-mini","created":1,"choices":[{"index":0,"delta":{},"finish_reason":"tool_calls"}]}"#,
    ]);

    assert!(!snapshot.pending);
    assert_eq!(snapshot.fragments.len(), 1);
    let ContentFragment::ToolCall { id, name, arguments, .. } = &snapshot.fragments[0] else {
        panic!("expected a tool-call fragment");
    };
    assert_eq!(id, "call_w1");
    assert_eq!(name, "get_weather");
    assert_eq!(arguments, r#"{"city":"Tokyo"}"#);
}

#[test]
fn usage_chunk_with_empty_choices_lands_in_metadata() {
    // Final chunk under stream_options.include_usage: no choices at all.
    let snapshot = fold(&[
        r#"{"object":"chat.completion.chunk","id":"c1","model":"gpt-4o-mini","created":1,"choices":[{"index":0,"delta":{"content":"Hi"},"finish_reason":null}]}"#,
        r#"{"object":"chat.completion.chunk","id":"c1","model":"gpt-4o-mini","created":1,"choices":[{"index":0,"delta":{},"finish_reason":"stop"}]}"#,
        r#"{"object":"chat.completion.chunk","id":"c1","model":"gpt-4o-mini","created":1,"choices":[],"usage":{"prompt_tokens":17,"completion_tokens":9,"total_tokens":26}}"#,
    ]);

    assert_eq!(snapshot.text(), "Hi");
    let usage = snapshot.usage().expect("usage recorded");
    assert_eq!(usage.prompt_tokens, 17);
    assert_eq!(usage.completion_tokens, 9);
    assert_eq!(usage.total_tokens, 26);
}

#[test]
fn router_substituted_model_overrides_the_requested_one() {
    let snapshot = fold(&[
        r#"{"object":"chat.completion.chunk","id":"c1","model":"mistralai/mistral-large","created":1,"choices":[{"delta":{"content":"Bonjour"},"finish_reason":null}]}"#,
    ]);
    assert_eq!(
        snapshot.origin_model.as_deref(),
        Some("mistralai/mistral-large")
    );
}

#[test]
fn perplexity_chat_completion_misnomer_streams_fine() {
    let snapshot = fold(&[
        r#"{"object":"chat.completion","id":"c1","model":"sonar","created":1,"choices":[{"index":0,"delta":{"content":"Answer"},"finish_reason":null}]}"#,
        r#"{"object":"chat.completion","id":"c1","model":"sonar","created":1,"choices":[{"index":0,"delta":{},"finish_reason":"stop"}]}"#,
    ]);
    assert_eq!(snapshot.text(), "Answer");
    assert!(!snapshot.pending);
}

#[test]
fn azure_prompt_filter_packet_is_harmless() {
    // Azure's first packet: empty object tag, empty choices, empty model.
    let snapshot = fold(&[
        r#"{"object":"","id":"","model":"","created":0,"choices":[]}"#,
        r#"{"object":"chat.completion.chunk","id":"c1","model":"gpt-4o","created":1,"choices":[{"index":0,"delta":{"content":"ok"},"finish_reason":null}]}"#,
    ]);
    assert_eq!(snapshot.text(), "ok");
    // The empty model string did not clobber anything.
    assert_eq!(snapshot.origin_model.as_deref(), Some("gpt-4o"));
}

#[test]
fn openrouter_extension_finish_reasons_complete_the_message() {
    for reason in ["stop_sequence", "eos", "COMPLETE"] {
        let fixture = format!(
            r#"{{"object":"chat.completion.chunk","id":"c1","model":"m","created":1,"choices":[{{"delta":{{"content":"x"}},"finish_reason":"{reason}"}}]}}"#
        );
        let snapshot = fold(&[fixture.as_str()]);
        assert!(!snapshot.pending, "finish_reason `{reason}` left pending set");
    }
}

#[test]
fn validation_is_pure_same_input_same_result() {
    let validator = OpenAiCompatValidator::new();
    let raw: serde_json::Value = serde_json::from_str(
        r#"{"object":"chat.completion.chunk","id":"c1","model":"m","created":1,"choices":[{"delta":{"content":"x"},"finish_reason":null}]}"#,
    )
    .unwrap();

    let first = validator.validate(&raw).unwrap();
    let second = validator.validate(&raw).unwrap();
    assert_eq!(first.text, second.text);
    assert_eq!(first.finish, second.finish);

    let bad = serde_json::json!({"id": "only"});
    let e1 = validator.validate(&bad).unwrap_err().to_string();
    let e2 = validator.validate(&bad).unwrap_err().to_string();
    assert_eq!(e1, e2);
}
