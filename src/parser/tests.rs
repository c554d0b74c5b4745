use once_cell::sync::Lazy;
use proptest::prelude::*;
use rstest::rstest;

use crate::autolink::Autolinker;
use crate::html::prepare_message;
use crate::parser::{BBParser, ParserConfig, ParserFeature};
use crate::smileys::{SmileyEntry, SmileyTable};
use crate::tags::{builtins, ContentKind, DisabledSet, TagDefinition, TagTable};

static TABLE: Lazy<TagTable> = Lazy::new(|| builtins::default_table().unwrap());

const QUOTE_OPEN: &str = "<div class=\"quoteheader\">Quote</div><blockquote class=\"bbc_standard_quote\">";
const LINK_ATTRS: &str = "class=\"bbc_link\" target=\"_blank\" rel=\"noopener\"";

fn config(features: ParserFeature) -> ParserConfig {
    ParserConfig {
        feature_flags: features,
        ..ParserConfig::default()
    }
}

fn parse_with(message: &str, config: &ParserConfig, disabled: &[&str]) -> String {
    let disabled: DisabledSet = disabled.iter().collect();
    BBParser::new(&TABLE, config, &disabled).parse(&prepare_message(message))
}

fn parse(message: &str) -> String {
    parse_with(message, &ParserConfig::default(), &[])
}

#[rstest]
#[case("[b]bold[/b]", "<b>bold</b>")]
#[case("[B]bold[/b]", "<b>bold</b>")]
#[case("[b][i]x[/b]", "<b><i>x</i></b>")]
#[case("[b]never closed", "<b>never closed</b>")]
#[case("[/b]x", "[/b]x")]
#[case("[bold]x[/bold]", "[bold]x[/bold]")]
#[case("a[br]b[br /]c", "a<br>b<br>c")]
#[case("a[hr]b", "a<hr>b")]
#[case("[color=red]x[/color]", "<span style=\"color: red;\" class=\"bbc_color\">x</span>")]
#[case("[color=notacolor!]x[/color]", "[color=notacolor!]x[/color]")]
#[case("[size=3]x[/size]", "<span style=\"font-size: 12pt;\" class=\"bbc_size\">x</span>")]
#[case("[size=14px]x[/size]", "<span style=\"font-size: 14px;\" class=\"bbc_size\">x</span>")]
#[case(
    "[shadow=red,left]x[/shadow]",
    "<span class=\"bbc_shadow\" data-color=\"red\" data-direction=\"left\">x</span>"
)]
#[case("[abbr=\"as soon as possible\"]asap[/abbr]", "<abbr title=\"as soon as possible\">asap</abbr>")]
pub fn simple_tags(#[case] message: &str, #[case] expected: &str) {
    assert_eq!(parse(message), expected);
}

#[test]
pub fn block_tags_close_inline_ones() {
    assert_eq!(
        parse("[b]a[quote]q[/quote]"),
        format!("<b>a</b>{QUOTE_OPEN}q</blockquote>")
    );
}

#[test]
pub fn inline_closers_stop_at_blocks() {
    // The bold was auto-closed when the quote opened, so its closer is just text.
    assert_eq!(
        parse("[b]a[quote]q[/b][/quote]"),
        format!("<b>a</b>{QUOTE_OPEN}q[/b]</blockquote>")
    );
    assert_eq!(
        parse("[quote][center][b]x[/b]y[/b][/center][/quote]"),
        format!("{QUOTE_OPEN}<div style=\"text-align: center;\"><b>x</b>y[/b]</div></blockquote>")
    );
}

#[test]
pub fn block_closers_reach_through_everything() {
    assert_eq!(
        parse("[quote][b]x[/quote]"),
        format!("{QUOTE_OPEN}<b>x</b></blockquote>")
    );
    assert_eq!(
        parse("[quote][center]x[/quote]"),
        format!("{QUOTE_OPEN}<div style=\"text-align: center;\">x</div></blockquote>")
    );
}

#[test]
pub fn block_tags_eat_surrounding_breaks() {
    assert_eq!(
        parse("[quote]\n  x[/quote]\nafter"),
        format!("{QUOTE_OPEN}x</blockquote>after")
    );
}

#[test]
pub fn quotes_alternate() {
    assert_eq!(
        parse("[quote]a[quote]b[/quote][/quote]"),
        format!(
            "{QUOTE_OPEN}a<div class=\"quoteheader\">Quote</div>\
             <blockquote class=\"bbc_alternate_quote\">b</blockquote></blockquote>"
        )
    );
}

#[rstest]
#[case("[quote author=Jo date=123]hi[/quote]")]
#[case("[quote date=123 author=Jo]hi[/quote]")]
pub fn quote_parameters_in_any_order(#[case] message: &str) {
    assert_eq!(
        parse(message),
        "<div class=\"quoteheader\">Quote from: Jo on \
         <time class=\"bbc_date\" data-timestamp=\"123\">123</time></div>\
         <blockquote class=\"bbc_standard_quote\">hi</blockquote>"
    );
}

#[test]
pub fn quote_links_only_with_a_link() {
    assert_eq!(
        parse("[quote author=Jo link=https://x.org/t]hi[/quote]"),
        "<div class=\"quoteheader\"><a href=\"https://x.org/t\">Quote from: Jo</a></div>\
         <blockquote class=\"bbc_standard_quote\">hi</blockquote>"
    );
    assert_eq!(
        parse("[quote author=Jo]hi[/quote]"),
        "<div class=\"quoteheader\">Quote from: Jo</div>\
         <blockquote class=\"bbc_standard_quote\">hi</blockquote>"
    );
}

#[test]
pub fn quote_without_required_parameter_is_text() {
    assert_eq!(parse("[quote date=123]hi"), "[quote date=123]hi");
}

#[test]
pub fn parsed_values_are_restricted() {
    let out = parse("[quote=\"[b]Jo[/b]\"]hi[/quote]");
    assert!(out.contains("Quote from: [b]Jo[/b]</div>"), "{out}");

    let out = parse("[quote=\"[url]x.org[/url]\"]hi[/quote]");
    assert!(
        out.contains(&format!("Quote from: <a href=\"http://x.org\" {LINK_ATTRS}>http://x.org</a></div>")),
        "{out}"
    );
}

#[test]
pub fn parsed_values_stop_nesting() {
    let config = ParserConfig {
        max_depth: 0,
        ..ParserConfig::default()
    };
    let out = parse_with("[quote=\"[url]x.org[/url]\"]hi[/quote]", &config, &[]);
    assert!(out.contains("Quote from: &#91;url&#93;x.org&#91;/url&#93;</div>"), "{out}");
}

#[test]
pub fn unparsed_bodies() {
    assert_eq!(
        parse("[code][b]x[/b][/code]"),
        "<div class=\"codeheader\">Code:</div><code class=\"bbc_code\">&#91;b&#93;x&#91;/b&#93;</code>"
    );
    assert_eq!(
        parse("[code=rust]fn[/code]"),
        "<div class=\"codeheader\">Code: (rust)</div><code class=\"bbc_code\">fn</code>"
    );
    assert_eq!(parse("[nobbc][b]x[/b][/nobbc]"), "&#91;b&#93;x&#91;/b&#93;");
    // Without a closing tag there is no body.
    assert_eq!(parse("[code]x"), "[code]x");
}

#[test]
pub fn links_and_media() {
    assert_eq!(
        parse("[url]example.com[/url]"),
        format!("<a href=\"http://example.com\" {LINK_ATTRS}>http://example.com</a>")
    );
    assert_eq!(
        parse("[url=\"https://x.org\"][b]site[/b][/url]"),
        format!("<a href=\"https://x.org\" {LINK_ATTRS}><b>site</b></a>")
    );
    assert_eq!(
        parse("[url]http://x.com/[b]y[/url]"),
        format!("<a href=\"http://x.com/&#91;b&#93;y\" {LINK_ATTRS}>http://x.com/&#91;b&#93;y</a>")
    );
    assert_eq!(
        parse("[img]a.png[/img]"),
        "<img src=\"http://a.png\" alt=\"\" class=\"bbc_img\">"
    );
    assert_eq!(
        parse("[img width=100 alt=cat]a.png[/img]"),
        "<img src=\"http://a.png\" alt=\"cat\" width=\"100\"  class=\"bbc_img resized\">"
    );
    assert_eq!(
        parse("[video=640,480]http://v.org/a.mp4[/video]"),
        "<video src=\"http://v.org/a.mp4\" width=\"640\" height=\"480\" controls></video>"
    );
}

#[test]
pub fn links_do_not_nest() {
    assert_eq!(
        parse("[url=http://a.org][email]x@y.org[/email][/url]"),
        format!("<a href=\"http://a.org\" {LINK_ATTRS}>[email]x@y.org[/email]</a>")
    );
}

#[rstest]
#[case(&["b"], "[b]x[/b]", "x")]
#[case(&["quote"], "[quote]x[/quote]", "<div>x</div>")]
#[case(&["url"], "[url=http://x.org]site[/url]", "site (http://x.org)")]
#[case(&["img"], "[img]a.png[/img]", "(http://a.png)")]
#[case(&["code"], "[code]x[/code]", "<div>x</div>")]
#[case(&["me"], "[me=Jo]waves[/me]", "/me waves<br>")]
pub fn disabled_tags_degrade(#[case] disabled: &[&str], #[case] message: &str, #[case] expected: &str) {
    assert_eq!(parse_with(message, &ParserConfig::default(), disabled), expected);
}

#[test]
pub fn itemcodes_build_lists() {
    assert_eq!(
        parse("[*]a\n[*]b"),
        "<ul class=\"bbc_list\"><li>a</li><li>b</li></ul>"
    );
    assert_eq!(
        parse("[*]a\ntext"),
        "<ul class=\"bbc_list\"><li>a</li></ul>text"
    );
    assert_eq!(
        parse("[o]x"),
        "<ul class=\"bbc_list\"><li type=\"circle\">x</li></ul>"
    );
}

#[test]
pub fn itemcodes_can_be_turned_off() {
    let config = config(ParserFeature::BBC);
    assert_eq!(parse_with("[*]a", &config, &[]), "[*]a");
    assert_eq!(parse_with("[*]a", &ParserConfig::default(), &["li"]), "[*]a");
}

#[test]
pub fn itemcodes_need_list_tags() {
    let table = TagTable::new(vec![
        TagDefinition::new("b", ContentKind::Parsed).before("<b>").after("</b>"),
    ])
    .unwrap();
    let disabled = DisabledSet::default();
    let config = ParserConfig::default();
    let out = BBParser::new(&table, &config, &disabled).parse(&prepare_message("[*]a\n[b]b[/b]"));
    assert_eq!(out, "[*]a<br><b>b</b>");
}

#[test]
pub fn zero_is_only_a_bullet_after_a_boundary() {
    assert_eq!(parse("x[0]"), "x[0]");
    assert_eq!(
        parse("[0]y"),
        "<ul class=\"bbc_list\"><li type=\"circle\">y</li></ul>"
    );
}

#[test]
pub fn lists_close_around_strangers() {
    assert_eq!(
        parse("[list][li]a[/li][b]x[/b][/list]"),
        "<ul class=\"bbc_list\"><li>a</li></ul><b>x</b>[/list]"
    );
}

#[test]
pub fn list_items_need_a_list() {
    assert_eq!(parse("[li]a[/li]"), "[li]a[/li]");
}

#[test]
pub fn without_bbc_only_text_handling_remains() {
    let config = config(ParserFeature::DEFAULT - ParserFeature::BBC);
    assert_eq!(parse_with("[b]x[/b]  y", &config, &[]), "[b]x[/b] &nbsp;y");
}

#[test]
pub fn pasted_html_is_recovered() {
    let config = config(ParserFeature::DEFAULT | ParserFeature::POST_HTML);
    assert_eq!(parse_with("a<br/>b", &config, &[]), "a<br>b");
    assert_eq!(parse_with("<b>bold", &config, &[]), "<b>bold</b>");
    assert_eq!(parse_with("a<hr>b", &config, &[]), "a<hr>b");
    assert_eq!(parse("<b>bold"), "&lt;b&gt;bold");
}

#[test]
pub fn autolinking() {
    let config = ParserConfig {
        autolinker: Some(Autolinker::with_tlds(["com", "org"]).unwrap()),
        ..ParserConfig::default()
    };
    assert_eq!(
        parse_with("mail jo@example.org", &config, &[]),
        "mail <a href=\"mailto:jo@example.org\" class=\"bbc_email\">jo@example.org</a>"
    );
    assert_eq!(
        parse_with("[url=http://a.org]b.org[/url]", &config, &[]),
        format!("<a href=\"http://a.org\" {LINK_ATTRS}>b.org</a>")
    );
    assert_eq!(
        parse_with("[code]x.org[/code]", &config, &[]),
        "<div class=\"codeheader\">Code:</div><code class=\"bbc_code\">x.org</code>"
    );
    // Disabled link tags are never synthesized.
    assert_eq!(parse_with("see x.org", &config, &["url"]), "see x.org");
}

#[test]
pub fn restricted_parsers_ignore_other_tags() {
    let only = vec!["b".to_owned()];
    let config = ParserConfig::default();
    let disabled = DisabledSet::new();
    let parser = BBParser::new(&TABLE, &config, &disabled).restricted_to(&only);
    assert_eq!(
        parser.parse(&prepare_message("[b]x[/b][i]y[/i]")),
        "<b>x</b>[i]y[/i]"
    );
}

#[test]
pub fn smileys_skip_markup() {
    let smileys = SmileyTable::new([SmileyEntry {
        code: ":)".to_owned(),
        markup: "<S>".to_owned(),
        description: String::new(),
    }])
    .unwrap();
    let config = ParserConfig::default();
    let disabled = DisabledSet::new();
    let parser = BBParser::new(&TABLE, &config, &disabled).with_smileys(&smileys);
    assert_eq!(
        parser.parse(&prepare_message("[code]:)[/code] :)")),
        "<div class=\"codeheader\">Code:</div><code class=\"bbc_code\">:)</code> <S>"
    );
}

proptest! {
    #[test]
    fn never_panics(message in "[\\[\\]/=*0o bqiulr\"<>\né.]{0,40}") {
        let config = ParserConfig {
            autolinker: Some(Autolinker::with_tlds(["com", "org"]).unwrap()),
            feature_flags: ParserFeature::ALL,
            ..ParserConfig::default()
        };
        parse_with(&message, &config, &[]);
    }
}
