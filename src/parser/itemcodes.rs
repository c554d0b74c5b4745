//! Legacy list shorthand: `[*]`, `[@]`, `[o]` and friends each open a list item, and a
//! list around it when there is none yet.
use log::trace;
use once_cell::sync::Lazy;
use regex::Regex;

use super::{BBParser, OpenTag, ParseState, ParserFeature, TARGET};
use crate::tags::Trim;

/// Marker and the list style it asks for; an empty style means the list's own.
const ITEM_STYLES: &[(u8, &str)] = &[
    (b'*', ""),
    (b'@', "disc"),
    (b'+', "square"),
    (b'x', "square"),
    (b'#', "square"),
    (b'o', "circle"),
    (b'O', "circle"),
    (b'0', "circle"),
];

/// What may follow a line break for the list to carry on.
static LIST_CONTINUES: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:<br>|&nbsp;|\s|\[)+").unwrap());

fn frame(
    tag: &'static str,
    after: &str,
    trim: Trim,
    require_children: Option<Vec<String>>,
    disallow_children: Option<Vec<String>>,
) -> OpenTag<'static> {
    OpenTag {
        tag,
        after: after.to_owned(),
        block_level: true,
        trim,
        has_parents: false,
        require_children,
        disallow_children,
        no_autolink: false,
    }
}

impl<'t> BBParser<'t> {
    fn itemcodes_enabled(&self) -> bool {
        self.features().contains(ParserFeature::ITEMCODES)
            && self.restrict.is_none()
            && !self.disabled.contains("list")
            && !self.disabled.contains("li")
            && self.table.lookup("list").is_some()
            && self.table.lookup("li").is_some()
    }

    /// Expand an itemcode at the cursor, returning false if there is none.
    pub(super) fn itemcode(&self, st: &mut ParseState<'t>) -> bool {
        if !self.itemcodes_enabled() {
            return false;
        }

        let rest = st.buf.remaining().as_bytes();
        if rest.len() < 3 || rest[2] != b']' {
            return false;
        }
        let marker = rest[1];
        let Some(&(_, style)) = ITEM_STYLES.iter().find(|(m, _)| *m == marker) else {
            return false;
        };

        // A zero is only a bullet where it can't be part of some text.
        if marker == b'0' && !matches!(st.out.last_text_char(), None | Some(';' | ' ' | '\t' | '>')) {
            return false;
        }

        let inherited = st.tags.last().and_then(|t| t.disallow_children.clone());
        let mut code = String::new();
        match st.tags.last().map(|t| t.tag) {
            Some("list") => {}
            Some("li") => {
                st.tags.pop();
                code.push_str("</li>");
            }
            _ => {
                st.tags.push(frame(
                    "list",
                    "</ul>",
                    Trim::None,
                    Some(vec!["li".to_owned()]),
                    inherited.clone(),
                ));
                code.push_str("<ul class=\"bbc_list\">");
            }
        }

        st.tags.push(frame("li", "</li>", Trim::Outside, None, inherited));
        if style.is_empty() {
            code.push_str("<li>");
        } else {
            code.push_str(&format!("<li type=\"{style}\">"));
        }
        trace!(target: TARGET, "itemcode [{}] opened a list item", marker as char);
        st.out.push_markup(&code);
        st.buf.advance(3);

        // Close the item at the next line break, unless a closing tag comes first. The list
        // closes with it unless more of it follows.
        let pos = st.buf.cursor();
        let line_break = st.buf.find_from(pos, "<br>");
        let closer = st.buf.find_from(pos, "[/");
        if let Some(line_break) = line_break.filter(|b| closer.map_or(true, |c| *b <= c)) {
            let continues = LIST_CONTINUES
                .find(&st.buf.text()[line_break + "<br>".len()..])
                .map_or(false, |m| m.as_str().ends_with('['));
            st.buf.insert(
                line_break,
                if continues { "[/li]" } else { "[/li][/list]" },
            );
        }

        true
    }
}
