//! Built-in definitions of the common forum tags.
use super::{ContentKind, ParamSpec, Quoting, TagDefinition, TagTable, Trim, Validator};
use crate::error::ConfigResult;

/// A parsed tag with fixed markup on each side.
macro_rules! simple_tag {
    ($tag:expr, $open:expr, $close:expr) => {
        TagDefinition::new($tag, ContentKind::Parsed)
            .before($open)
            .after($close)
    };
}

/// A block-level alignment tag wrapping its body in a styled div.
macro_rules! align_tag {
    ($tag:expr, $align:expr) => {
        simple_tag!(
            $tag,
            concat!("<div style=\"text-align: ", $align, ";\">"),
            "</div>"
        )
        .block_level()
    };
}

/// A self-closing tag rendered to fixed markup.
macro_rules! closed_tag {
    ($tag:expr, $markup:expr) => {
        TagDefinition::new($tag, ContentKind::Closed).content($markup)
    };
}

const LINK_TAGS: &[&str] = &["email", "url", "iurl"];

fn inline_tags() -> Vec<TagDefinition> {
    vec![
        simple_tag!("b", "<b>", "</b>"),
        simple_tag!("i", "<i>", "</i>"),
        simple_tag!("u", "<u>", "</u>"),
        simple_tag!("s", "<s>", "</s>"),
        simple_tag!("sub", "<sub>", "</sub>"),
        simple_tag!("sup", "<sup>", "</sup>"),
        simple_tag!("tt", "<span class=\"monospace\">", "</span>"),
        closed_tag!("br", "<br>"),
        TagDefinition::new("abbr", ContentKind::UnparsedEquals { quoted: Quoting::Optional })
            .before("<abbr title=\"$1\">")
            .after("</abbr>")
            .disabled_after(" ($1)"),
        TagDefinition::new("color", ContentKind::UnparsedEquals { quoted: Quoting::Never })
            .test(r"(#[\da-fA-F]{3}|#[\da-fA-F]{6}|[A-Za-z]{1,20}|rgb\(\d{1,3}, ?\d{1,3}, ?\d{1,3}\))\]")
            .before("<span style=\"color: $1;\" class=\"bbc_color\">")
            .after("</span>"),
        TagDefinition::new("size", ContentKind::UnparsedEquals { quoted: Quoting::Never })
            .test(r"[1-7]\]")
            .validate(Validator::FontSize)
            .before("<span style=\"font-size: $1;\" class=\"bbc_size\">")
            .after("</span>"),
        TagDefinition::new("size", ContentKind::UnparsedEquals { quoted: Quoting::Never })
            .test(r"([1-9]\d?p[xt]|small(?:er)?|large[r]?|x[x]?-(?:small|large)|medium|(0\.[1-9]|[1-9](\.\d\d?)?)?em)\]")
            .before("<span style=\"font-size: $1;\" class=\"bbc_size\">")
            .after("</span>"),
        TagDefinition::new("font", ContentKind::UnparsedEquals { quoted: Quoting::Never })
            .test(r"[A-Za-z0-9_,\-\s]+?\]")
            .before("<span style=\"font-family: $1;\" class=\"bbc_font\">")
            .after("</span>"),
        TagDefinition::new("shadow", ContentKind::UnparsedCommas)
            .test(r"[#0-9a-zA-Z\-]{3,12},(left|right|top|bottom|[0123]\d{0,2})\]")
            .before("<span class=\"bbc_shadow\" data-color=\"$1\" data-direction=\"$2\">")
            .after("</span>"),
    ]
}

fn link_tags() -> Vec<TagDefinition> {
    vec![
        TagDefinition::new("url", ContentKind::UnparsedContent)
            .content("<a href=\"$1\" class=\"bbc_link\" target=\"_blank\" rel=\"noopener\">$1</a>")
            .validate(Validator::Url)
            .no_autolink(),
        TagDefinition::new("url", ContentKind::UnparsedEquals { quoted: Quoting::Optional })
            .before("<a href=\"$1\" class=\"bbc_link\" target=\"_blank\" rel=\"noopener\">")
            .after("</a>")
            .validate(Validator::Url)
            .disallow_children(LINK_TAGS)
            .disabled_after(" ($1)")
            .no_autolink(),
        TagDefinition::new("iurl", ContentKind::UnparsedContent)
            .content("<a href=\"$1\" class=\"bbc_link\">$1</a>")
            .validate(Validator::Url)
            .no_autolink(),
        TagDefinition::new("iurl", ContentKind::UnparsedEquals { quoted: Quoting::Optional })
            .before("<a href=\"$1\" class=\"bbc_link\">")
            .after("</a>")
            .validate(Validator::Url)
            .disallow_children(LINK_TAGS)
            .disabled_after(" ($1)")
            .no_autolink(),
        TagDefinition::new("email", ContentKind::UnparsedContent)
            .content("<a href=\"mailto:$1\" class=\"bbc_email\">$1</a>")
            .validate(Validator::Email)
            .no_autolink(),
        TagDefinition::new("email", ContentKind::UnparsedEquals { quoted: Quoting::Never })
            .before("<a href=\"mailto:$1\" class=\"bbc_email\">")
            .after("</a>")
            .disallow_children(LINK_TAGS)
            .disabled_after(" ($1)")
            .no_autolink(),
        TagDefinition::new("img", ContentKind::UnparsedContent)
            .param("alt", ParamSpec::optional())
            .param("height", ParamSpec::optional().matching(r"\d+").value("height=\"$1\""))
            .param("width", ParamSpec::optional().matching(r"\d+").value("width=\"$1\""))
            .content("<img src=\"$1\" alt=\"{alt}\" {width} {height} class=\"bbc_img resized\">")
            .validate(Validator::Image)
            .disabled_content("($1)"),
        TagDefinition::new("img", ContentKind::UnparsedContent)
            .content("<img src=\"$1\" alt=\"\" class=\"bbc_img\">")
            .validate(Validator::Image)
            .disabled_content("($1)"),
        TagDefinition::new("video", ContentKind::UnparsedCommasContent)
            .test(r"\d+,\d+\]")
            .content("<video src=\"$1\" width=\"$2\" height=\"$3\" controls></video>")
            .validate(Validator::Url)
            .disabled_content("<a href=\"$1\" target=\"_blank\" rel=\"noopener\">$1</a>"),
    ]
}

/// A Unix timestamp, left for the page to format.
fn quote_date() -> ParamSpec {
    ParamSpec::optional()
        .matching(r"\d+")
        .value(" on <time class=\"bbc_date\" data-timestamp=\"$1\">$1</time>")
}

fn block_tags() -> Vec<TagDefinition> {
    vec![
        align_tag!("left", "left"),
        align_tag!("center", "center"),
        align_tag!("right", "right"),
        simple_tag!("pre", "<pre>", "</pre>").block_level(),
        closed_tag!("hr", "<hr>").block_level(),
        TagDefinition::new("code", ContentKind::UnparsedContent)
            .content("<div class=\"codeheader\">Code:</div><code class=\"bbc_code\">$1</code>")
            .validate(Validator::Code)
            .block_level(),
        TagDefinition::new("code", ContentKind::UnparsedEqualsContent { quoted: Quoting::Never })
            .content("<div class=\"codeheader\">Code: ($2)</div><code class=\"bbc_code\">$1</code>")
            .validate(Validator::Code)
            .block_level(),
        TagDefinition::new("nobbc", ContentKind::UnparsedContent)
            .content("$1")
            .validate(Validator::Literal),
        TagDefinition::new("quote", ContentKind::Parsed)
            .before("<div class=\"quoteheader\">Quote</div><blockquote>")
            .after("</blockquote>")
            .trim(Trim::Both)
            .block_level(),
        TagDefinition::new("quote", ContentKind::Parsed)
            .param("author", ParamSpec::required().matching(r"[^<>]{1,192}?"))
            .param("date", quote_date())
            .param("link", ParamSpec::required().matching(r"[^\s<>]+").validate(Validator::Url))
            .before("<div class=\"quoteheader\"><a href=\"{link}\">Quote from: {author}{date}</a></div><blockquote>")
            .after("</blockquote>")
            .trim(Trim::Both)
            .block_level(),
        TagDefinition::new("quote", ContentKind::Parsed)
            .param("author", ParamSpec::required().matching(r"[^<>]{1,192}?"))
            .param("date", quote_date())
            .before("<div class=\"quoteheader\">Quote from: {author}{date}</div><blockquote>")
            .after("</blockquote>")
            .trim(Trim::Both)
            .block_level(),
        TagDefinition::new(
            "quote",
            ContentKind::ParsedEquals {
                quoted: Quoting::Optional,
                allowed_tags: Some(LINK_TAGS.iter().map(|t| (*t).to_owned()).collect()),
            },
        )
        .before("<div class=\"quoteheader\">Quote from: $1</div><blockquote>")
        .after("</blockquote>")
        .trim(Trim::Both)
        .block_level(),
        TagDefinition::new("me", ContentKind::UnparsedEquals { quoted: Quoting::Optional })
            .before("<div class=\"meaction\">* $1 ")
            .after("</div>")
            .disabled_before("/me ")
            .disabled_after("<br>")
            .block_level(),
    ]
}

fn structure_tags() -> Vec<TagDefinition> {
    vec![
        simple_tag!("list", "<ul class=\"bbc_list\">", "</ul>")
            .require_children(&["li", "list"])
            .trim(Trim::Inside)
            .block_level(),
        TagDefinition::new("list", ContentKind::Parsed)
            .param(
                "type",
                ParamSpec::required()
                    .matching("none|disc|circle|square|decimal|decimal-leading-zero|lower-roman|upper-roman|lower-alpha|upper-alpha"),
            )
            .before("<ul class=\"bbc_list\" style=\"list-style-type: {type};\">")
            .after("</ul>")
            .require_children(&["li", "list"])
            .trim(Trim::Inside)
            .block_level(),
        simple_tag!("li", "<li>", "</li>")
            .require_parents(&["list"])
            .trim(Trim::Outside)
            .disabled_before("")
            .disabled_after("<br>")
            .block_level(),
        simple_tag!("table", "<table class=\"bbc_table\">", "</table>")
            .require_children(&["tr"])
            .trim(Trim::Inside)
            .block_level(),
        simple_tag!("tr", "<tr>", "</tr>")
            .require_parents(&["table"])
            .require_children(&["td"])
            .trim(Trim::Both)
            .block_level(),
        simple_tag!("td", "<td>", "</td>")
            .require_parents(&["tr"])
            .trim(Trim::Outside)
            .disabled_after("<br>")
            .block_level(),
    ]
}

/// Returns every built-in definition, in registration order.
/// # Included tags
/// - inline: `b`, `i`, `u`, `s`, `sub`, `sup`, `tt`, `br`, `abbr`, `color`, `size`, `font`, `shadow`
/// - links and media: `url`, `iurl`, `email`, `img`, `video`
/// - blocks: `left`, `center`, `right`, `pre`, `hr`, `code`, `nobbc`, `quote` (plain, with author, link
///   and date, or with a parsed name), `me`
/// - structure: `list`, `li`, `table`, `tr`, `td`
pub fn default_tags() -> Vec<TagDefinition> {
    let mut tags = inline_tags();
    tags.extend(link_tags());
    tags.extend(block_tags());
    tags.extend(structure_tags());
    tags
}

/// Compile [default_tags] into a table.
pub fn default_table() -> ConfigResult<TagTable> {
    TagTable::new(default_tags())
}
