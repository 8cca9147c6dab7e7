//! Post-processing: deterministic cleanup of LLM translations and of the
//! final document.
//!
//! Even with explicit instructions, chat models sometimes wrap their answer
//! in ` ```markdown ` fences, emit `\r\n` line endings, or sprinkle zero-width
//! characters. These rules undo that without touching content. Each rule is a
//! pure `&str → String` function.
//!
//! ## Rule Order
//!
//! Fences are stripped before line endings are normalised so the fence regex
//! sees the raw answer; invisible characters are removed last.

use once_cell::sync::Lazy;
use regex::Regex;

/// Clean one translated chunk.
///
/// 1. Strip outer markdown fences
/// 2. Normalise line endings (CRLF → LF)
/// 3. Trim trailing whitespace per line
/// 4. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens, …)
/// 5. Trim leading and trailing blank space
pub fn clean_translation(input: &str) -> String {
    let s = strip_markdown_fences(input);
    let s = normalise_line_endings(&s);
    let s = trim_trailing_whitespace(&s);
    let s = remove_invisible_chars(&s);
    s.trim().to_string()
}

/// Final pass over a whole document before it is written to disk.
///
/// Collapses runs of blank lines and ends the file with exactly one newline.
pub fn finish_document(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = collapse_blank_lines(&s);
    ensure_final_newline(&s)
}

// ── Rule 1: Strip outer markdown fences ──────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:markdown|md)?\r?\n(.*)\r?\n```\s*$").unwrap());

fn strip_markdown_fences(input: &str) -> String {
    if let Some(caps) = RE_OUTER_FENCES.captures(input.trim()) {
        caps[1].to_string()
    } else {
        input.to_string()
    }
}

// ── Rule 2: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 3: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 4: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Document rules ───────────────────────────────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{4,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n\n").to_string()
}

fn ensure_final_newline(input: &str) -> String {
    let trimmed = input.trim_end();
    if trimmed.is_empty() {
        String::from("\n")
    } else {
        format!("{}\n", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_fences() {
        let input = "```markdown\n# こんにちは\n世界\n```";
        assert_eq!(strip_markdown_fences(input), "# こんにちは\n世界");
    }

    #[test]
    fn test_strip_fences_no_lang() {
        let input = "```\n# Hello\nWorld\n```";
        assert_eq!(strip_markdown_fences(input), "# Hello\nWorld");
    }

    #[test]
    fn test_inner_code_block_kept() {
        let input = "Text\n```rust\nfn main() {}\n```\nMore";
        assert_eq!(strip_markdown_fences(input), input);
    }

    #[test]
    fn test_normalise_line_endings() {
        assert_eq!(normalise_line_endings("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn test_trim_trailing_whitespace() {
        assert_eq!(trim_trailing_whitespace("  hello   \nworld  "), "  hello\nworld");
    }

    #[test]
    fn test_remove_invisible() {
        let input = "hello\u{200B}world\u{FEFF}foo\u{00AD}bar";
        assert_eq!(remove_invisible_chars(input), "helloworldfoobar");
    }

    #[test]
    fn test_clean_translation_keeps_placeholders() {
        let input = "```markdown\r\n## 手法   \r\n{IMAGE_0}\r\n本文。\r\n```\n";
        assert_eq!(clean_translation(input), "## 手法\n{IMAGE_0}\n本文。");
    }

    #[test]
    fn test_clean_translation_plain_text_unchanged() {
        assert_eq!(clean_translation("TRANSLATED ONE"), "TRANSLATED ONE");
    }

    #[test]
    fn test_finish_document() {
        assert_eq!(finish_document("a\n\n\n\n\n\nb"), "a\n\n\nb\n");
        assert_eq!(finish_document("a\n\n\n"), "a\n");
        assert_eq!(finish_document(""), "\n");
    }
}
