/// Escape text for Telegram's HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Shorten long text for display, keeping head and tail (`head…tail`).
pub fn ellipsize_middle(text: &str, max_chars: usize) -> String {
    let len = text.chars().count();
    if len <= max_chars || max_chars < 3 {
        return text.to_string();
    }
    let keep = max_chars - 1;
    let head = keep / 2 + keep % 2;
    let tail = keep / 2;

    let mut out: String = text.chars().take(head).collect();
    out.push('…');
    out.extend(text.chars().skip(len - tail));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_html_specials() {
        assert_eq!(
            escape_html(r#"<a href="x">&</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&amp;&lt;/a&gt;"
        );
    }

    #[test]
    fn ellipsizes_long_text() {
        assert_eq!(ellipsize_middle("short", 10), "short");
        assert_eq!(ellipsize_middle("abcdefghij", 5), "ab…ij");
        assert_eq!(ellipsize_middle("abcdefghij", 6), "abc…ij");
        assert_eq!(ellipsize_middle("abcdefghij", 6).chars().count(), 6);
    }
}
