/// Pull the first fenced code block out of free-form model text.
///
/// A bash-tagged fence (```` ```bash ````) is preferred over a bare triple
/// backtick. The content starts exactly past the fence marker and its
/// language tag; the next triple backtick closes the block. An unterminated
/// fence yields an empty string, as does text with no fence at all. Fixed
/// offsets rather than a regex keep the behavior predictable on malformed
/// fences.
pub fn extract_script_block(text: &str) -> String {
    const BASH_FENCE: &str = "```bash";
    const BARE_FENCE: &str = "```";

    let (start, opener_len) = match text.find(BASH_FENCE) {
        Some(idx) => (idx, BASH_FENCE.len()),
        None => match text.find(BARE_FENCE) {
            Some(idx) => (idx, BARE_FENCE.len()),
            None => return String::new(),
        },
    };

    let body = &text[start + opener_len..];
    match body.find(BARE_FENCE) {
        Some(end) => body[..end].trim().to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_fence_yields_empty() {
        assert_eq!(extract_script_block("no fences here"), "");
    }

    #[test]
    fn bash_fence_is_extracted_and_trimmed() {
        assert_eq!(extract_script_block("```bash\necho hi\n```"), "echo hi");
    }

    #[test]
    fn bare_fence_is_extracted() {
        assert_eq!(extract_script_block("```\necho hi\n``` trailing"), "echo hi");
    }

    #[test]
    fn bash_fence_preferred_over_earlier_bare_fence() {
        let text = "intro ```bash\npip install -U requests\n``` outro";
        assert_eq!(extract_script_block(text), "pip install -U requests");
    }

    #[test]
    fn unterminated_fence_yields_empty() {
        assert_eq!(extract_script_block("```bash\necho hi"), "");
        assert_eq!(extract_script_block("```"), "");
    }

    #[test]
    fn surrounding_prose_is_ignored() {
        let text = "Here is the fix:\n```bash\nnpm update\n```\nRun it carefully.";
        assert_eq!(extract_script_block(text), "npm update");
    }
}
