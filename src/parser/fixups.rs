//! Fixups applied once to every stretch of plain text between tag candidates.
use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::stack::TagStack;
use super::{BBParser, ParserFeature};

static HTML_ANCHOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)&lt;a\s+href=(?:&quot;((?:https?://|ftps?://|mailto:)\S+?)&quot;|((?:https?://|ftps?://|mailto:)\S+?))&gt;(.*?)&lt;/a&gt;",
    )
    .unwrap()
});

static HTML_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)&lt;(br|hr)\s*/?&gt;").unwrap());

static HTML_IMAGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)&lt;img\s+src=(?:&quot;((?:https?://|ftps?://)\S+?)&quot;|((?:https?://|ftps?://)\S+?))(?:\s+alt=(&quot;.*?&quot;|\S*?))?\s*/?&gt;",
    )
    .unwrap()
});

static IMAGE_ACTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)action(?:=|%3d)").unwrap());

/// Pasted tags that are let through as real HTML, closed if the paste left them open.
const CLOSABLE_TAGS: &[&str] = &[
    "b", "u", "i", "s", "em", "ins", "del", "pre", "blockquote", "strong",
];

/// Keep whatever `step` returns, noting whether anything changed.
fn apply<'a>(text: Cow<'a, str>, step: impl FnOnce(&str) -> Cow<'_, str>) -> Cow<'a, str> {
    let changed = match step(&*text) {
        Cow::Borrowed(_) => None,
        Cow::Owned(changed) => Some(changed),
    };
    changed.map_or(text, Cow::Owned)
}

/// Turn pasted `<a>`, `<br>`, `<hr>`, `<img>` and a few formatting tags back into something
/// the parser renders.
fn recover_html(text: &str) -> Cow<'_, str> {
    if !text.contains("&lt;") {
        return Cow::Borrowed(text);
    }

    let mut text = Cow::Borrowed(text);
    text = apply(text, |t| {
        HTML_ANCHOR.replace_all(t, |caps: &Captures| {
            let href = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
            format!("[url=&quot;{href}&quot;]{}[/url]", &caps[3])
        })
    });
    text = apply(text, |t| {
        HTML_BREAK.replace_all(t, |caps: &Captures| {
            if caps[1].eq_ignore_ascii_case("br") {
                "<br>"
            } else {
                "[hr]"
            }
        })
    });

    for tag in CLOSABLE_TAGS {
        let open = format!("&lt;{tag}&gt;");
        let close = format!("&lt;/{tag}&gt;");
        let opened = text.matches(open.as_str()).count();
        if opened == 0 && !text.contains(close.as_str()) {
            continue;
        }

        let unclosed = opened.saturating_sub(text.matches(close.as_str()).count());
        let mut restored = text
            .replace(open.as_str(), &format!("<{tag}>"))
            .replace(close.as_str(), &format!("</{tag}>"));
        for _ in 0..unclosed {
            restored.push_str(&format!("</{tag}>"));
        }
        text = Cow::Owned(restored);
    }

    apply(text, |t| {
        HTML_IMAGE.replace_all(t, |caps: &Captures| {
            let src = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
            let src = IMAGE_ACTION.replace_all(src, |action: &Captures| {
                // Attachment downloads are the one action an image may point at.
                let rest = &src[action.get(0).map_or(0, |m| m.end())..];
                if rest.starts_with("dlattach") {
                    action[0].to_owned()
                } else {
                    "action-".to_owned()
                }
            });
            let alt = caps
                .get(3)
                .map(|m| m.as_str().trim_start_matches("&quot;").trim_end_matches("&quot;"))
                .filter(|alt| !alt.is_empty())
                .map(|alt| format!(" alt={alt}"))
                .unwrap_or_default();
            format!("[img{alt}]{src}[/img]")
        })
    })
}

impl<'t> BBParser<'t> {
    fn autolinks_allowed(&self, tags: &TagStack<'t>, tag: &str) -> bool {
        self.features().contains(ParserFeature::AUTOLINK)
            && !self.disabled.contains(tag)
            && self.allows(tag)
            && !tags.in_no_autolink()
    }

    /// Run the raw-text fixups over `slice`, returning the new text if anything changed.
    pub(super) fn fix_slice(&self, tags: &TagStack<'t>, slice: &str) -> Option<String> {
        let mut text = Cow::Borrowed(slice);

        if self.features().contains(ParserFeature::POST_HTML) {
            text = apply(text, recover_html);
        }

        if let Some(linker) = &self.config.autolinker {
            if self.autolinks_allowed(tags, "url") && !text.contains("[url") {
                text = apply(text, |t| linker.link_urls(t));
            }
            if self.autolinks_allowed(tags, "email")
                && text.contains('@')
                && !text.contains("[email")
                && !text.to_ascii_lowercase().contains("mailto:")
            {
                text = apply(text, |t| linker.link_emails(t));
            }
        }

        if text.contains('\t') {
            text = Cow::Owned(text.replace('\t', "&nbsp;&nbsp;&nbsp;"));
        }

        match text {
            Cow::Borrowed(_) => None,
            Cow::Owned(fixed) => Some(fixed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::recover_html;

    #[test]
    fn pasted_links_and_breaks() {
        assert_eq!(
            recover_html("&lt;a href=&quot;https://x.org&quot;&gt;x&lt;/a&gt;&lt;br /&gt;&lt;HR&gt;"),
            "[url=&quot;https://x.org&quot;]x[/url]<br>[hr]"
        );
    }

    #[test]
    fn formatting_is_closed() {
        assert_eq!(recover_html("&lt;b&gt;bold"), "<b>bold</b>");
        assert_eq!(recover_html("&lt;i&gt;a&lt;/i&gt;"), "<i>a</i>");
    }

    #[test]
    fn pasted_images() {
        assert_eq!(
            recover_html("&lt;img src=&quot;http://x.org/a.png?action=go&quot; alt=&quot;cat&quot; /&gt;"),
            "[img alt=cat]http://x.org/a.png?action-go[/img]"
        );
        assert_eq!(
            recover_html("&lt;img src=http://x.org/?action=dlattach&gt;"),
            "[img]http://x.org/?action=dlattach[/img]"
        );
    }

    #[test]
    fn untouched_without_entities() {
        assert!(matches!(recover_html("plain [b]"), std::borrow::Cow::Borrowed(_)));
    }
}
