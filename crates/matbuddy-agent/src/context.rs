// SPDX-FileCopyrightText: 2026 Matbuddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! System instruction assembly.

use matbuddy_config::model::AgentConfig;
use tracing::{info, warn};

/// Built-in persona for the training buddy.
pub const DEFAULT_SYSTEM_INSTRUCTION: &str = "\
You are a casual BJJ training buddy inside a Telegram bot.
Use the provided tools and the user data below to answer questions about the user's notes, goals, schedule, and stats.
ONLY discuss BJJ, martial arts, fitness, and this user's training.
If the user asks about unrelated topics, politely say you can only help with training.
Reply in the SAME language the user writes in.
Keep every reply to one or two short sentences. Never write long paragraphs.
Use casual, friendly tone like a training partner.
When greeting, use a short BJJ phrase like 'oss!', 'let's roll!', 'ready to train?'.
Never use dashes as punctuation. Use commas or periods instead.
Never use markdown headers. Keep it simple chat text.
Never use emojis in your text. Zero emojis.
IMPORTANT: when a technique is mentioned (by you or the user), ALWAYS call search_technique first.
When the user asks what techniques are available, what to practice, or asks to see a list, ALWAYS call list_techniques with the relevant category. Present ALL results from the tool, not just some.
For category questions like 'what escapes are there', call list_techniques with category='escapes'.
If the user says a general topic like 'escapes' or 'sweeps', call list_techniques for that category.
Do NOT write any URLs in your reply. The system will automatically attach the correct video links.
When the user describes what they practiced or learned today, ask if they want to save it as a note.
If they confirm, call save_training_note with a short summary (max 20 words) of what they said.
Never save a note without the user confirming first.

CRITICAL RULE: ALWAYS end your reply with the most relevant command the user can type next.
Every tool result includes a COMMAND hint. Always include that command in your reply.
Available commands:
  /note  log a training note
  /notes  view saved notes
  /goal  set a new goal
  /goals  view current goals
  /focus  set or view focus technique
  /technique  browse all techniques
  /toolbox  view known techniques
  /stats  view training stats
  /schedule  set training schedule
  /reminders  customize reminder times
  /export  export your data
  /map  see the full bot feature map
  /help  open the main menu";

/// Loads the base instruction: file > inline > default.
pub async fn load_system_prompt(config: &AgentConfig) -> String {
    if let Some(path) = &config.system_prompt_file {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => {
                let trimmed = content.trim();
                if !trimmed.is_empty() {
                    info!(path = path.as_str(), "loaded system prompt from file");
                    return trimmed.to_string();
                }
            }
            Err(e) => {
                warn!(
                    path = path.as_str(),
                    error = %e,
                    "failed to read system prompt file, falling back"
                );
            }
        }
    }

    if let Some(prompt) = &config.system_prompt
        && !prompt.trim().is_empty()
    {
        return prompt.clone();
    }

    DEFAULT_SYSTEM_INSTRUCTION.to_string()
}

/// Appends the pre-fetched read-tool output to the base instruction.
pub fn system_instruction(base: &str, user_context: &str) -> String {
    if user_context.trim().is_empty() {
        return base.to_string();
    }
    format!(
        "{base}\n\nCURRENT USER DATA (already loaded, use it directly instead of asking):\n{user_context}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent(inline: Option<&str>, file: Option<&str>) -> AgentConfig {
        AgentConfig {
            system_prompt: inline.map(String::from),
            system_prompt_file: file.map(String::from),
            ..AgentConfig::default()
        }
    }

    #[tokio::test]
    async fn default_prompt_is_the_persona() {
        let prompt = load_system_prompt(&agent(None, None)).await;
        assert!(prompt.starts_with("You are a casual BJJ training buddy"));
        assert!(prompt.contains("Do NOT write any URLs"));
    }

    #[tokio::test]
    async fn inline_overrides_default() {
        let prompt = load_system_prompt(&agent(Some("Be brief."), None)).await;
        assert_eq!(prompt, "Be brief.");
    }

    #[tokio::test]
    async fn file_overrides_inline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompt.md");
        std::fs::write(&path, "  From file.\n").unwrap();

        let prompt =
            load_system_prompt(&agent(Some("Inline."), Some(path.to_str().unwrap()))).await;
        assert_eq!(prompt, "From file.");
    }

    #[tokio::test]
    async fn missing_file_falls_back_to_inline() {
        let prompt =
            load_system_prompt(&agent(Some("Inline."), Some("/nonexistent/prompt.md"))).await;
        assert_eq!(prompt, "Inline.");
    }

    #[test]
    fn user_context_is_appended() {
        let full = system_instruction("base", "[get_goals]\nNo active goals.");
        assert!(full.starts_with("base\n\nCURRENT USER DATA"));
        assert!(full.ends_with("[get_goals]\nNo active goals."));
        assert_eq!(system_instruction("base", "  "), "base");
    }
}
