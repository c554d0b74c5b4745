//! Bare URL and email detection.
//!
//! Matches are rewritten into `[url]` and `[email]` tags, so they render through the tag
//! table like anything the user typed. Which top-level domains count is decided by a
//! pattern supplied from outside, refreshed as often as the caller likes.
use std::borrow::Cow;

use regex::Regex;

use crate::error::{ConfigError, ConfigResult};

/// Entities that end a URL. A prepared message has its quotes and angle brackets escaped,
/// so these are where the link text stops.
const URL_STOPPERS: &[&str] = &["&lt;", "&gt;", "&quot;", "&#039;", "&#39;", "&nbsp;"];

const TRAILING_PUNCTUATION: &[char] = &['.', ',', ':', '!', '?', '\'', '*'];

#[derive(Debug, Clone)]
pub struct Autolinker {
    url: Regex,
    email: Regex,
}

impl Autolinker {
    /// Build the matchers from a top-level domain alternation such as `com|org|net`.
    pub fn new(tld_pattern: &str) -> ConfigResult<Self> {
        let label = r"[\p{L}\p{N}](?:[\p{L}\p{N}\-]*[\p{L}\p{N}])?";
        let url = format!(
            r"(?i)(?:(?P<scheme>(?:https?|ftps?)://)[\p{{L}}\p{{N}}\-.]+|(?:{label}\.)+(?:{tld_pattern})\b)(?::\d+)?(?:[/?#][^\s\[\]<>]*)?"
        );
        let email = format!(r"(?i)[\p{{L}}\p{{N}}._%+\-]+@(?:{label}\.)+(?:{tld_pattern})\b");

        Ok(Self {
            url: Regex::new(&url).map_err(ConfigError::TldPattern)?,
            email: Regex::new(&email).map_err(ConfigError::TldPattern)?,
        })
    }

    /// Build the matchers from a list of top-level domains.
    pub fn with_tlds<I, S>(tlds: I) -> ConfigResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tlds: Vec<String> = tlds
            .into_iter()
            .map(|t| regex::escape(t.as_ref().trim_start_matches('.')))
            .filter(|t| !t.is_empty())
            .collect();
        // Longer domains first, so `co` never cuts `com` short.
        tlds.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        tlds.dedup();
        Self::new(&tlds.join("|"))
    }

    /// Wrap every bare URL in `text` in a `[url]` tag.
    pub fn link_urls<'a>(&self, text: &'a str) -> Cow<'a, str> {
        let mut out = String::new();
        let mut copied = 0;
        let mut from = 0;

        while let Some(caps) = self.url.captures_at(text, from) {
            let Some(found) = caps.get(0) else { break };
            from = found.end();

            if text[..found.start()]
                .chars()
                .next_back()
                .map_or(false, |c| c.is_alphanumeric() || matches!(c, '@' | '.' | '-' | '_' | '/'))
            {
                continue;
            }

            let shown = trim_url(found.as_str());
            let has_scheme = caps.name("scheme").is_some();
            if shown.is_empty() || (has_scheme && shown.ends_with("://")) {
                continue;
            }

            // `example.co.uk` with an unknown `uk` is not `example.co`.
            let after = &text[found.end()..];
            if !has_scheme
                && after.starts_with('.')
                && after[1..].chars().next().map_or(false, char::is_alphanumeric)
            {
                continue;
            }

            let target = if has_scheme {
                Cow::Borrowed(shown)
            } else {
                Cow::Owned(format!("http://{shown}"))
            };

            out.push_str(&text[copied..found.start()]);
            out.push_str(&format!("[url=&quot;{target}&quot;]{shown}[/url]"));
            copied = found.start() + shown.len();
            from = copied;
        }

        if copied == 0 {
            return Cow::Borrowed(text);
        }
        out.push_str(&text[copied..]);
        Cow::Owned(out)
    }

    /// Wrap every bare email address in `text` in an `[email]` tag.
    pub fn link_emails<'a>(&self, text: &'a str) -> Cow<'a, str> {
        let mut out = String::new();
        let mut copied = 0;
        let mut linked = false;

        for found in self.email.find_iter(text) {
            let boundary = text[..found.start()]
                .chars()
                .next_back()
                .map_or(true, |c| c.is_whitespace() || matches!(c, '>' | '[' | ']' | '(' | ')' | ';'));
            if !boundary {
                continue;
            }

            out.push_str(&text[copied..found.start()]);
            out.push_str(&format!("[email]{}[/email]", found.as_str()));
            copied = found.end();
            linked = true;
        }

        if !linked {
            return Cow::Borrowed(text);
        }
        out.push_str(&text[copied..]);
        Cow::Owned(out)
    }
}

/// Cut a URL match down to what was meant as the link.
fn trim_url(found: &str) -> &str {
    let mut end = URL_STOPPERS
        .iter()
        .filter_map(|stop| found.find(stop))
        .min()
        .unwrap_or(found.len());

    let mut depth = 0usize;
    for (idx, c) in found[..end].char_indices() {
        match c {
            '(' => depth += 1,
            ')' if depth == 0 => {
                end = idx;
                break;
            }
            ')' => depth -= 1,
            _ => {}
        }
    }

    found[..end].trim_end_matches(TRAILING_PUNCTUATION)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{trim_url, Autolinker};

    fn linker() -> Autolinker {
        Autolinker::with_tlds(["com", "org", "co", ".net"]).unwrap()
    }

    #[rstest]
    #[case("see example.com.", "see [url=&quot;http://example.com&quot;]example.com[/url].")]
    #[case(
        "(see https://example.com/x)",
        "(see [url=&quot;https://example.com/x&quot;]https://example.com/x[/url])"
    )]
    #[case(
        "https://en.example.org/wiki/Rust_(language), ok",
        "[url=&quot;https://en.example.org/wiki/Rust_(language)&quot;]https://en.example.org/wiki/Rust_(language)[/url], ok"
    )]
    #[case("www.example.co.uk", "www.example.co.uk")]
    #[case("example.community", "example.community")]
    #[case("jo@example.com", "jo@example.com")]
    #[case("x.example.net:8080/a?b=c#d", "[url=&quot;http://x.example.net:8080/a?b=c#d&quot;]x.example.net:8080/a?b=c#d[/url]")]
    fn urls(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(linker().link_urls(input), expected);
    }

    #[rstest]
    #[case("mail jo@example.org.", "mail [email]jo@example.org[/email].")]
    #[case("(jo.smith+tag@example.com)", "([email]jo.smith+tag@example.com[/email])")]
    #[case("x:jo@example.com", "x:jo@example.com")]
    fn emails(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(linker().link_emails(input), expected);
    }

    #[test]
    fn trimming() {
        assert_eq!(trim_url("http://a.com/x&quot;y"), "http://a.com/x");
        assert_eq!(trim_url("http://a.com/?!"), "http://a.com/");
    }

    #[test]
    fn bad_tld_pattern() {
        assert!(Autolinker::new("com|(").is_err());
    }
}
