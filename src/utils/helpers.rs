use crate::llm::ChatMessage;

use tracing::debug;

/// Removes a surrounding markdown code fence (```json ... ``` or ``` ... ```)
/// from an LLM answer. Text without a fence is returned trimmed.
pub fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };
    // Drop the language tag on the opening line
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
        .to_string()
}

/// Extracts the first JSON object embedded in an LLM answer, tolerating
/// fences and leading prose.
pub fn extract_json_object(text: &str) -> Option<serde_json::Value> {
    let cleaned = strip_code_fences(text);
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(&cleaned) {
        return value.is_object().then_some(value);
    }
    let start = cleaned.find('{')?;
    let end = cleaned.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<serde_json::Value>(&cleaned[start..=end])
        .ok()
        .filter(|v| v.is_object())
}

/// Manages the size of a conversation by removing old messages or truncating
/// the last one when the total character count exceeds the limit. The first
/// system message is always kept.
///
/// # Arguments
/// * `messages` - Vector of ChatMessages to manage
/// * `char_limit` - Maximum number of characters allowed
///
/// # Returns
/// * `bool` - True if messages were modified, False otherwise
pub fn manage_token_count(messages: &mut Vec<ChatMessage>, char_limit: usize) -> bool {
    let mut total: usize = messages
        .iter()
        .map(|msg| msg.content.chars().count())
        .sum();

    if total < char_limit {
        return false;
    }

    let keep_head = usize::from(messages.first().is_some_and(|m| m.role == "system"));
    while total >= char_limit && messages.len() > keep_head + 1 {
        let removed = messages.remove(keep_head);
        total -= removed.content.chars().count();
        debug!(
            "Removed old message to reduce context size. Remaining messages: {}",
            messages.len()
        );
    }

    if total >= char_limit {
        let budget = char_limit.saturating_sub(total - last_len(messages));
        if let Some(last_msg) = messages.last_mut() {
            last_msg.content = last_msg.content.chars().take(budget).collect::<String>();
            debug!("Truncated last message to fit context limit");
        }
    }
    true
}

fn last_len(messages: &[ChatMessage]) -> usize {
    messages
        .last()
        .map(|m| m.content.chars().count())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("```\nplain\n```"), "plain");
        assert_eq!(strip_code_fences("  no fence "), "no fence");
    }

    #[test]
    fn extracts_embedded_object() {
        let value = extract_json_object("Here you go:\n{\"status\": \"VALID\"} thanks").unwrap();
        assert_eq!(value["status"], "VALID");
        assert!(extract_json_object("[1, 2]").is_none());
        assert!(extract_json_object("nothing").is_none());
    }

    #[test]
    fn trims_old_messages_but_keeps_system() {
        let mut messages = vec![
            ChatMessage::system("sys"),
            ChatMessage::user(&"a".repeat(20)),
            ChatMessage::user(&"b".repeat(20)),
        ];
        assert!(manage_token_count(&mut messages, 30));
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert!(messages[1].content.starts_with('b'));

        let mut short = vec![ChatMessage::user("hi")];
        assert!(!manage_token_count(&mut short, 30));
    }

    #[test]
    fn truncates_last_message() {
        let mut messages = vec![ChatMessage::system("sys"), ChatMessage::user(&"x".repeat(50))];
        manage_token_count(&mut messages, 20);
        assert_eq!(messages[1].content.chars().count(), 17);
    }
}
