//! Folds canonical chunks into the in-flight message snapshot.
//!
//! Accumulation is monotonic: no chunk ever removes or reorders previously
//! accumulated fragments. Text deltas extend the open text fragment or open a
//! new one; tool-call deltas extend their own fragment, located by call id
//! (or by wire index for continuation chunks that omit the id), and may
//! interleave freely with text.

use crate::types::{CanonicalChunk, ContentFragment, MessageSnapshot};

/// Apply one validated chunk to the snapshot.
pub fn apply(snapshot: &mut MessageSnapshot, chunk: &CanonicalChunk) {
    if let Some(delta) = &chunk.text {
        append_text(snapshot, delta);
    }

    for call in &chunk.tool_calls {
        append_tool_call(snapshot, call);
    }

    if chunk.finish.is_some() {
        snapshot.pending = false;
    }

    if let Some(model) = &chunk.model {
        snapshot.origin_model = Some(model.clone());
    }

    if let Some(usage) = chunk.usage {
        snapshot.set_usage(usage);
    }
}

fn append_text(snapshot: &mut MessageSnapshot, delta: &str) {
    if let Some(ContentFragment::Text { text }) = snapshot.fragments.last_mut() {
        text.push_str(delta);
    } else {
        snapshot.fragments.push(ContentFragment::text(delta));
    }
}

fn append_tool_call(snapshot: &mut MessageSnapshot, call: &crate::types::ToolCallDelta) {
    // Route to an existing fragment: by id when the chunk carries one,
    // otherwise by the wire index of the call within the chunk. Searched in
    // reverse so a keyless continuation lands on the most recently opened call.
    let position = snapshot.fragments.iter().rposition(|fragment| {
        let ContentFragment::ToolCall { id, call_index, .. } = fragment else {
            return false;
        };
        match (&call.id, call.index) {
            (Some(call_id), _) => call_id == id,
            (None, Some(index)) => *call_index == Some(index),
            // No key at all: continuation of the most recently opened call.
            (None, None) => true,
        }
    });

    match position {
        Some(pos) => {
            if let ContentFragment::ToolCall {
                call_index,
                name,
                arguments,
                ..
            } = &mut snapshot.fragments[pos]
            {
                if call_index.is_none() {
                    *call_index = call.index;
                }
                if let Some(fragment) = &call.name {
                    name.push_str(fragment);
                }
                if let Some(fragment) = &call.arguments {
                    arguments.push_str(fragment);
                }
            }
        }
        None => {
            snapshot.fragments.push(ContentFragment::ToolCall {
                id: call.id.clone().unwrap_or_default(),
                call_index: call.index,
                name: call.name.clone().unwrap_or_default(),
                arguments: call.arguments.clone().unwrap_or_default(),
            });
        }
    }
}
