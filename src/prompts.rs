//! System instructions for chunk translation.
//!
//! Callers can override the instruction via
//! [`crate::config::TranslationConfig::system_prompt`]; the template here is
//! used only when no override is provided.

use crate::config::TranslationConfig;

/// Default instruction template. `{source}` and `{target}` are replaced with
/// the configured language names.
pub const DEFAULT_TRANSLATION_PROMPT: &str = r#"You are a professional translator of academic papers. Translate the {source} text you are given into {target}.

Follow these rules precisely:

1. MARKDOWN
   - Keep the Markdown structure exactly: headings, lists, tables, emphasis, links and code blocks
   - Do not add or remove headings, list items or table rows
   - Leave code blocks, inline code, URLs and LaTeX ($…$, $$…$$) untranslated

2. IMAGE PLACEHOLDERS
   - Tokens of the form {IMAGE_0}, {IMAGE_1}, … stand for figures
   - Copy every such token unchanged, in the same position

3. OUTPUT FORMAT
   - Output ONLY the translated Markdown
   - Do NOT wrap the answer in ```markdown fences
   - Do NOT add commentary, notes or explanations"#;

/// Build the instruction sent as the system message for every chunk.
pub fn translation_instruction(config: &TranslationConfig) -> String {
    match config.system_prompt {
        Some(ref custom) => custom.clone(),
        None => DEFAULT_TRANSLATION_PROMPT
            .replace("{source}", &config.source_language)
            .replace("{target}", &config.target_language),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_instruction_names_languages_and_placeholders() {
        let config = TranslationConfig::builder()
            .source_language("French")
            .target_language("Korean")
            .build()
            .unwrap();
        let prompt = translation_instruction(&config);
        assert!(prompt.contains("French text"));
        assert!(prompt.contains("into Korean"));
        assert!(prompt.contains("{IMAGE_0}"));
        assert!(!prompt.contains("{source}"));
    }

    #[test]
    fn custom_instruction_wins() {
        let config = TranslationConfig::builder()
            .system_prompt("Translate to pirate.")
            .build()
            .unwrap();
        assert_eq!(translation_instruction(&config), "Translate to pirate.");
    }
}
