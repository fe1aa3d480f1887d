//! Text-to-markup helpers.
//!
//! Everything user-supplied goes through [`escape_html`] first; the other
//! transforms here operate on already-escaped text and only add markup this
//! module generates itself.

use std::sync::OnceLock;

use regex::Regex;

/// Escape the five HTML-significant characters.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(c),
        }
    }
    out
}

fn url_re() -> &'static Regex {
    static URL_RE: OnceLock<Regex> = OnceLock::new();
    URL_RE.get_or_init(|| Regex::new(r"https?://\S+").expect("valid url regex"))
}

fn mention_re() -> &'static Regex {
    static MENTION_RE: OnceLock<Regex> = OnceLock::new();
    // a mention must start a word; `@` inside a URL is preceded by a non-space
    MENTION_RE.get_or_init(|| Regex::new(r"(^|[\s>])@(\w+)").expect("valid mention regex"))
}

/// Wrap bare URLs in anchors that open in a new context without an opener
/// reference. Input must already be escaped.
pub fn linkify(escaped: &str) -> String {
    url_re()
        .replace_all(
            escaped,
            r#"<a href="${0}" target="_blank" rel="noopener noreferrer">${0}</a>"#,
        )
        .into_owned()
}

pub fn line_breaks(text: &str) -> String {
    text.replace('\n', "<br>")
}

pub fn highlight_mentions(text: &str) -> String {
    mention_re()
        .replace_all(text, r#"${1}<span class="mention">@${2}</span>"#)
        .into_owned()
}

/// Full free-text pipeline: escape, links, line breaks, then mentions.
pub fn process_text(text: &str, mentions: bool) -> String {
    let html = line_breaks(&linkify(&escape_html(text)));
    if mentions {
        highlight_mentions(&html)
    } else {
        html
    }
}

/// First letter of each space-separated segment, uppercased, at most two.
pub fn initials(name: &str) -> String {
    name.split(' ')
        .filter_map(|word| word.chars().next())
        .collect::<String>()
        .to_uppercase()
        .chars()
        .take(2)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Strip the tags this module generates so only user text remains.
    fn strip_generated(html: &str) -> String {
        let tags = Regex::new(r#"<a href="[^"]*" target="_blank" rel="noopener noreferrer">|</a>|<br>|<span class="mention">|</span>"#).unwrap();
        tags.replace_all(html, "").into_owned()
    }

    #[test]
    fn test_escape_all_specials() {
        assert_eq!(
            escape_html(r#"<b>"Tom" & 'Jerry'</b>"#),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#039;Jerry&#039;&lt;/b&gt;"
        );
    }

    #[test]
    fn test_no_raw_specials_survive_pipeline() {
        let inputs = [
            r#"<script>alert("x")</script>"#,
            "a < b && c > d",
            r#"it's "quoted""#,
            "<img src=x onerror='boom'>\nsecond line",
            "https://evil.test/\"><script>",
        ];
        for input in inputs {
            let out = strip_generated(&process_text(input, true));
            for c in ['<', '>', '"', '\''] {
                assert!(!out.contains(c), "raw {c:?} in {out:?}");
            }
            assert!(
                out.replace("&amp;", "")
                    .replace("&lt;", "")
                    .replace("&gt;", "")
                    .replace("&quot;", "")
                    .replace("&#039;", "")
                    .find('&')
                    .is_none(),
                "raw & in {out:?}"
            );
        }
    }

    #[test]
    fn test_single_anchor_with_opener_isolation() {
        let out = process_text("see https://example.test/x now", false);
        assert_eq!(out.matches("<a ").count(), 1);
        assert!(out.contains(
            r#"<a href="https://example.test/x" target="_blank" rel="noopener noreferrer">https://example.test/x</a>"#
        ));
        assert!(out.starts_with("see "));
        assert!(out.ends_with(" now"));
    }

    #[test]
    fn test_url_stops_at_newline() {
        let out = process_text("http://a.test/p\nnext", false);
        assert_eq!(
            out,
            r#"<a href="http://a.test/p" target="_blank" rel="noopener noreferrer">http://a.test/p</a><br>next"#
        );
    }

    #[test]
    fn test_newlines_become_breaks() {
        assert_eq!(process_text("a\nb\n", false), "a<br>b<br>");
    }

    #[test]
    fn test_mentions() {
        assert_eq!(
            process_text("hey @bob, ping", true),
            r#"hey <span class="mention">@bob</span>, ping"#
        );
        assert_eq!(
            process_text("line\n@amy", true),
            r#"line<br><span class="mention">@amy</span>"#
        );
        assert_eq!(process_text("hey @bob", false), "hey @bob");
        assert_eq!(process_text("mail a@b.test", true), "mail a@b.test");
    }

    #[test]
    fn test_mentions_not_applied_inside_urls() {
        let out = process_text("https://social.test/@bob", true);
        assert!(!out.contains("mention"));
    }

    #[test]
    fn test_initials() {
        assert_eq!(initials("Bob"), "B");
        assert_eq!(initials("alice cooper"), "AC");
        assert_eq!(initials("mary jane watson"), "MJ");
        assert_eq!(initials("double  space"), "DS");
        assert_eq!(initials(""), "");
    }
}
