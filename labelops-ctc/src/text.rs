//! Canonical text form shared by label encoding and transcript scoring.

/// Normalize text for encoding and scoring.
///
/// Lowercases the input, drops every character outside `a-z` and the ASCII
/// space, then trims spaces left at either end. Inner space runs are kept.
///
/// # Examples
///
/// ```
/// use labelops_ctc::text::normalize_text;
///
/// assert_eq!(normalize_text("Hello, World! 123"), "hello world");
/// ```
pub fn normalize_text(text: &str) -> String {
    let kept: String = text
        .chars()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_ascii_lowercase() || *c == ' ')
        .collect();

    kept.trim_matches(' ').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_punctuation_and_digits() {
        assert_eq!(normalize_text("Hello, World! 123"), "hello world");
    }

    #[test]
    fn keeps_inner_spacing() {
        assert_eq!(normalize_text("A  B"), "a  b");
    }

    #[test]
    fn trims_outer_spaces_left_by_filtering() {
        assert_eq!(normalize_text(" 42 answers 42 "), "answers");
    }

    #[test]
    fn drops_non_ascii_letters() {
        assert_eq!(normalize_text("Café Ünïcode"), "caf ncode");
    }

    #[test]
    fn is_idempotent() {
        let inputs = [
            "",
            "Hello, World! 123",
            "ÀÉÎ õü\tnew\nline",
            "İstanbul's 2nd-best",
            "already normalized",
        ];

        for input in inputs {
            let once = normalize_text(input);
            assert_eq!(normalize_text(&once), once, "input: {input:?}");
        }
    }

    #[test]
    fn handles_empty_input() {
        assert_eq!(normalize_text(""), "");
    }
}
