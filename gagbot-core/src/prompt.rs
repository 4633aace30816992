//! Assistant prompt construction: persona + bounded history + current turn.

/// Builds the full prompt sent to the assistant backend.
///
/// Layout: optional persona line, the stored conversation history under a
/// "Previous conversation:" header, an optional bracketed reply-context line,
/// then the current turn and an "Assistant:" cue for the model.
pub fn build_prompt(
    persona: &str,
    history: &[String],
    user_name: &str,
    message: &str,
    reply_context: Option<&str>,
) -> String {
    let mut prompt = String::new();
    if !persona.is_empty() {
        prompt.push_str(persona);
        prompt.push('\n');
    }
    if !history.is_empty() {
        prompt.push_str("Previous conversation:\n");
        for line in history {
            prompt.push_str(line);
            prompt.push('\n');
        }
    }
    if let Some(context) = reply_context {
        prompt.push_str(&format!("[{}]\n", context));
    }
    prompt.push_str(&format!("User ({}): {}\nAssistant:", user_name, message));
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_minimal() {
        let prompt = build_prompt("", &[], "Ada", "hello", None);
        assert_eq!(prompt, "User (Ada): hello\nAssistant:");
    }

    #[test]
    fn test_prompt_with_persona_and_history() {
        let history = vec!["hi".to_string(), "hello there".to_string()];
        let prompt = build_prompt("You are terse.", &history, "Ada", "how are you", None);
        assert_eq!(
            prompt,
            "You are terse.\nPrevious conversation:\nhi\nhello there\nUser (Ada): how are you\nAssistant:"
        );
    }

    #[test]
    fn test_prompt_with_reply_context() {
        let prompt = build_prompt("", &[], "Ada", "what about this", Some("Replying to: rust"));
        assert_eq!(
            prompt,
            "[Replying to: rust]\nUser (Ada): what about this\nAssistant:"
        );
    }
}
