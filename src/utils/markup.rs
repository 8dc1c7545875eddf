//! Helpers for the Telegram HTML emphasis used in broadcast commands
//!
//! Substituted player names are wrapped in `<b>`/`</b>`. Suggested commands
//! arrive as free text and may already carry these markers, so they are
//! stripped before a new round is rendered.

/// Opening emphasis marker
pub const EMPHASIS_OPEN: &str = "<b>";
/// Closing emphasis marker
pub const EMPHASIS_CLOSE: &str = "</b>";

/// Removes every emphasis marker from `text`
///
/// Stripping repeats until the text stops changing, so markers hidden inside
/// other markers (`<<b>b>`) are removed as well.
///
/// # Example
/// ```
/// use king_says_bot::utils::markup::strip_emphasis;
///
/// assert_eq!(strip_emphasis("kiss <b>Anna</b>"), "kiss Anna");
/// assert_eq!(strip_emphasis("<<b>b>x<</b>/b>"), "x");
/// ```
pub fn strip_emphasis(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let stripped = current
            .replace(EMPHASIS_OPEN, "")
            .replace(EMPHASIS_CLOSE, "");
        if stripped == current {
            return current;
        }
        current = stripped;
    }
}

/// Wraps `text` in emphasis markers
pub fn emphasize(text: &str) -> String {
    format!("{EMPHASIS_OPEN}{text}{EMPHASIS_CLOSE}")
}

/// Escapes the characters Telegram's HTML parse mode treats specially
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_plain_text_is_unchanged() {
        assert_eq!(strip_emphasis(""), "");
        assert_eq!(strip_emphasis("hug {p}"), "hug {p}");
    }

    #[test]
    fn test_strip_removes_markers() {
        assert_eq!(strip_emphasis("<b>Anna</b> hugs <b>Bob</b>"), "Anna hugs Bob");
        assert_eq!(strip_emphasis("<b><b>x</b></b>"), "x");
    }

    #[test]
    fn test_strip_nested_markers() {
        assert_eq!(strip_emphasis("<<b>b>x<</b>/b>"), "x");
        assert_eq!(strip_emphasis("<<<b>b>b>y"), "y");
    }

    #[test]
    fn test_strip_is_idempotent() {
        let inputs = ["<b>a</b>", "<<b>b>b", "plain", "<b", "b>"];
        for input in inputs {
            let once = strip_emphasis(input);
            assert_eq!(strip_emphasis(&once), once, "input: {input}");
        }
    }

    #[test]
    fn test_emphasize_and_escape() {
        assert_eq!(emphasize("Anna"), "<b>Anna</b>");
        assert_eq!(escape_html("a<b>&c"), "a&lt;b&gt;&amp;c");
    }
}
