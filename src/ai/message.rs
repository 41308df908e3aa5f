//! Commit message generation

use anyhow::Result;
use std::path::Path;
use tracing::{info, warn};

/// Maximum number of characters of diff or file content fed to the model
pub const CONTEXT_LIMIT: usize = 1024;

/// Something that turns a prompt into a short commit message
#[allow(async_fn_in_trait)]
pub trait MessageGenerator {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// `chore <action> <basename>`
pub fn template_message(action: &str, path: &str) -> String {
    let name = Path::new(path.trim_end_matches('/'))
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string());

    format!("chore {} {}", action, name)
}

/// Build the prompt for one file commit
pub fn build_prompt(action: &str, path: &str, context: Option<&str>) -> String {
    let mut prompt = format!(
        r#"Please write a brief commit message in one line for action {action} on {path}.

Example:
🎉 [{action} {path}] xxx
(you can use any emoji)

You MUST directly respond with the commit message without any explanation, starting with the emoji.
"#
    );

    if let Some(context) = context {
        prompt.push_str("Diff:\n");
        prompt.push_str(&truncate_chars(context, CONTEXT_LIMIT));
    }

    prompt
}

/// Keep at most `limit` characters, respecting char boundaries
pub fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}

/// First non-empty line of a model reply, trimmed
fn first_line(reply: &str) -> Option<String> {
    reply
        .lines()
        .map(|line| line.trim().trim_matches('`').trim())
        .find(|line| !line.is_empty())
        .map(|line| line.to_string())
}

/// Ask the generator for a message, falling back to the template on error or empty reply
pub async fn commit_message<G: MessageGenerator>(
    generator: Option<&G>,
    action: &str,
    path: &str,
    context: Option<&str>,
) -> String {
    let Some(generator) = generator else {
        return template_message(action, path);
    };

    let prompt = build_prompt(action, path, context);

    match generator.generate(&prompt).await {
        Ok(reply) => match first_line(&reply) {
            Some(message) => message,
            None => {
                warn!("empty commit message generated for {}, using template", path);
                template_message(action, path)
            }
        },
        Err(e) => {
            warn!("failed to generate commit message for {}: {:#}", path, e);
            info!("falling back to template message");
            template_message(action, path)
        }
    }
}
