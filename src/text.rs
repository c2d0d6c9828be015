//! Text normalization and body extraction for fetched messages.

use std::sync::LazyLock;

use regex::Regex;

static SCRIPT_STYLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(?:script|style)\b[^>]*>.*?</(?:script|style)\s*>")
        .expect("script/style pattern is valid")
});

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<[^>]+>").expect("tag pattern is valid"));

/// Collapse any run of whitespace (including newlines) to a single space
/// and trim the ends. Idempotent.
pub fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Best-effort HTML-to-text: drop script/style blocks with their content,
/// drop remaining tags, normalize whitespace. Malformed markup degrades the
/// output but never fails.
pub fn strip_html(html: &str) -> String {
    let no_blocks = SCRIPT_STYLE_RE.replace_all(html, " ");
    let no_tags = TAG_RE.replace_all(&no_blocks, " ");
    normalize(&no_tags)
}

/// Extract readable text from a parsed email.
///
/// Concatenates the inline text bodies (mail-parser decodes each part with
/// its declared charset, replacing undecodable bytes); when only HTML parts
/// exist, strips them first. Attachments are never included. The result is
/// normalized and may be empty.
pub fn extract_text(message: &mail_parser::Message) -> String {
    let mut chunks: Vec<String> = Vec::new();

    let mut pos = 0;
    while let Some(text) = message.body_text(pos) {
        chunks.push(text.to_string());
        pos += 1;
    }

    if chunks.is_empty() {
        let mut pos = 0;
        while let Some(html) = message.body_html(pos) {
            chunks.push(strip_html(&html));
            pos += 1;
        }
    }

    normalize(&chunks.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mail_parser::MessageParser;

    #[test]
    fn normalize_collapses_runs() {
        assert_eq!(normalize("  a \t b\r\n  c  "), "a b c");
    }

    #[test]
    fn normalize_is_idempotent() {
        for input in ["", "  ", "a  b", "line\none\n\ntwo", "already normal"] {
            let once = normalize(input);
            assert_eq!(normalize(&once), once);
        }
    }

    #[test]
    fn strip_html_removes_tags() {
        assert_eq!(strip_html("<p>Hello <b>there</b></p>"), "Hello there");
    }

    #[test]
    fn strip_html_drops_script_and_style_content() {
        let html = "<style>.x{color:red}</style><p>Body</p><SCRIPT>alert(1)</SCRIPT>";
        assert_eq!(strip_html(html), "Body");
    }

    #[test]
    fn strip_html_tolerates_malformed_markup() {
        assert_eq!(strip_html("<div <p>broken</p>"), "broken");
        assert_eq!(strip_html("no tags at all"), "no tags at all");
    }

    #[test]
    fn strip_html_is_idempotent_on_plain_output() {
        let out = strip_html("<p>once</p>");
        assert_eq!(strip_html(&out), out);
    }

    #[test]
    fn extract_text_plain_single_part() {
        let raw = b"Subject: hi\r\nContent-Type: text/plain\r\n\r\nHello   world\r\n";
        let parsed = MessageParser::default().parse(&raw[..]).unwrap();
        assert_eq!(extract_text(&parsed), "Hello world");
    }

    #[test]
    fn extract_text_html_single_part_is_stripped() {
        let raw = b"Subject: hi\r\nContent-Type: text/html\r\n\r\n<p>Hello <i>world</i></p>\r\n";
        let parsed = MessageParser::default().parse(&raw[..]).unwrap();
        let text = extract_text(&parsed);
        assert!(text.contains("Hello"), "got {text:?}");
        assert!(!text.contains('<'), "got {text:?}");
    }

    #[test]
    fn extract_text_skips_attachments() {
        let raw = concat!(
            "Subject: hi\r\n",
            "Content-Type: multipart/mixed; boundary=\"b\"\r\n\r\n",
            "--b\r\nContent-Type: text/plain\r\n\r\nInline body\r\n",
            "--b\r\nContent-Type: application/octet-stream\r\n",
            "Content-Disposition: attachment; filename=\"x.bin\"\r\n\r\nBLOBDATA\r\n",
            "--b--\r\n"
        );
        let parsed = MessageParser::default().parse(raw.as_bytes()).unwrap();
        let text = extract_text(&parsed);
        assert!(text.contains("Inline body"), "got {text:?}");
        assert!(!text.contains("BLOBDATA"), "got {text:?}");
    }

    #[test]
    fn extract_text_empty_message_is_empty() {
        let raw = b"Subject: hi\r\n\r\n";
        let parsed = MessageParser::default().parse(&raw[..]).unwrap();
        assert_eq!(extract_text(&parsed), "");
    }
}
