//! The tag tokenizer and stack parser.
//!
//! A parse walks a prepared message once. It jumps between tag candidates found by the
//! table's scanner, copies the text in between through, and keeps a stack of the tags that
//! are currently open. Malformed input never fails: a bracket that cannot be made sense of
//! is left as literal text.
use bitflags::bitflags;
use log::{trace, warn};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::autolink::Autolinker;
use crate::html;
use crate::smileys::SmileyTable;
use crate::tags::{CompiledTag, ContentKind, DisabledSet, Quoting, TagDefinition, TagTable, Trim};

use self::buffer::{Output, ParseBuffer};
use self::stack::TagStack;

pub(crate) mod buffer;
mod fixups;
mod itemcodes;
pub(crate) mod params;
mod stack;

const TARGET: &str = "bbc.parser";

#[derive(Debug, Clone)]
pub struct ParserConfig {
    pub feature_flags: ParserFeature,
    /// Bare URL and email matching. Autolinking is skipped when this is unset.
    pub autolinker: Option<Autolinker>,
    /// How deep parsed tag values may nest.
    pub max_depth: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            feature_flags: ParserFeature::DEFAULT,
            autolinker: None,
            max_depth: 8,
        }
    }
}

bitflags! {
    /// Optional parts of the parse.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct ParserFeature: u32 {
        /// Parse tags at all. Without it only escaping, smileys and whitespace tidying happen.
        const BBC = 1 << 0;
        /// Turn bare URLs and email addresses into link tags.
        const AUTOLINK = 1 << 1;
        /// Recover a few pasted HTML tags.
        const POST_HTML = 1 << 2;
        /// Expand `[*]`-style list shorthand.
        const ITEMCODES = 1 << 3;

        const DEFAULT = Self::BBC.bits() | Self::AUTOLINK.bits() | Self::ITEMCODES.bits();

        /// All current and future feature flags.
        const ALL = u32::MAX;
    }
}

impl Default for ParserFeature {
    fn default() -> Self {
        Self::DEFAULT
    }
}

static BLOCK_TRAILER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:&nbsp;|\s)*(?:<br>)?").unwrap());
static SPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:&nbsp;|\s)*").unwrap());
static BREAK_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:<br>|&nbsp;|\s)*").unwrap());

/// A tag that has been opened and not closed yet.
#[derive(Debug, Clone)]
pub(crate) struct OpenTag<'t> {
    pub tag: &'t str,
    /// Markup emitted when the tag closes, parameters already substituted.
    pub after: String,
    pub block_level: bool,
    pub trim: Trim,
    pub has_parents: bool,
    pub require_children: Option<Vec<String>>,
    /// Own disallowed children plus everything disallowed further out.
    pub disallow_children: Option<Vec<String>>,
    pub no_autolink: bool,
}

/// Per-call mutable state. Nothing here outlives a single [BBParser::parse].
#[derive(Debug)]
pub(crate) struct ParseState<'t> {
    pub buf: ParseBuffer,
    pub out: Output,
    pub tags: TagStack<'t>,
}

impl<'t> ParseState<'t> {
    fn smileys_allowed(&self) -> bool {
        !self.tags.in_no_autolink()
    }

    /// Emit the bracket at the cursor as text.
    fn inert(&mut self) {
        let smileys = self.smileys_allowed();
        self.out.push_text("[", smileys);
        self.buf.advance(1);
    }

    fn close_top(&mut self) -> Option<OpenTag<'t>> {
        let tag = self.tags.pop()?;
        trace!(target: TARGET, "closing [{}]", tag.tag);
        self.out.push_markup(&tag.after);
        Some(tag)
    }
}

/// What became of a tag candidate.
enum Outcome {
    Handled,
    /// A definition matched but its body or value was malformed.
    Inert,
    Unmatched,
}

/// A definition accepted for the opening tag at the cursor.
struct Matched<'t> {
    def: &'t TagDefinition,
    /// Offset just past the tag name.
    name_end: usize,
    /// Offset just past the character following the tag name, or past the closing `]` when
    /// the tag took parameters.
    value_start: usize,
    params: Vec<(&'t str, String)>,
}

/// The parser proper. Cheap to copy, it only borrows read-only configuration.
#[doc(alias = "parser")]
#[derive(Debug, Clone, Copy)]
pub struct BBParser<'t> {
    table: &'t TagTable,
    config: &'t ParserConfig,
    disabled: &'t DisabledSet,
    restrict: Option<&'t [String]>,
    smileys: Option<&'t SmileyTable>,
    depth: usize,
}

impl<'t> BBParser<'t> {
    pub fn new(table: &'t TagTable, config: &'t ParserConfig, disabled: &'t DisabledSet) -> Self {
        Self {
            table,
            config,
            disabled,
            restrict: None,
            smileys: None,
            depth: 0,
        }
    }

    /// Only recognize the given (lowercase) tag names.
    pub fn restricted_to(mut self, tags: &'t [String]) -> Self {
        self.restrict = Some(tags);
        self
    }

    pub fn with_smileys(mut self, smileys: &'t SmileyTable) -> Self {
        self.smileys = Some(smileys);
        self
    }

    fn allows(&self, tag: &str) -> bool {
        self.restrict.map_or(true, |only| only.iter().any(|t| t == tag))
    }

    fn features(&self) -> ParserFeature {
        self.config.feature_flags
    }

    /// Render a prepared message (see [html::prepare_message]).
    pub fn parse(&self, message: &str) -> String {
        let mut st = ParseState {
            buf: ParseBuffer::new(message.to_owned()),
            out: Output::default(),
            tags: TagStack::default(),
        };

        if !self.features().contains(ParserFeature::BBC) {
            st.out.push_text(message, true);
            return st.out.finish(self.smileys);
        }

        while !st.buf.is_at_end() {
            let cursor = st.buf.cursor();
            let next = self
                .table
                .find_candidate(st.buf.text(), cursor)
                .unwrap_or(st.buf.len());

            let from = st.buf.fixed_until().max(cursor);
            if next > from {
                let fixed = self.fix_slice(&st.tags, &st.buf.text()[from..next]);
                st.buf.mark_fixed(next);
                if let Some(fixed) = fixed {
                    st.buf.splice(from..next, &fixed);
                    // The fixed text may hold new candidates.
                    continue;
                }
            }

            if next > cursor {
                let smileys = st.smileys_allowed();
                st.out.push_text(&st.buf.text()[cursor..next], smileys);
                st.buf.advance_to(next);
            }

            if !st.buf.is_at_end() {
                self.step(&mut st);
            }
        }

        while st.close_top().is_some() {}

        st.out.finish(self.smileys)
    }

    /// Handle the candidate bracket at the cursor.
    fn step(&self, st: &mut ParseState<'t>) {
        if st.buf.remaining().as_bytes().get(1) == Some(&b'/') {
            if !self.close_tag(st) {
                st.inert();
            }
            return;
        }

        match self.open_tag(st) {
            Outcome::Handled => {}
            Outcome::Inert => st.inert(),
            Outcome::Unmatched => {
                if self.itemcode(st) {
                    return;
                }
                // Lists and tables implicitly close when something other than what they
                // require shows up in them. The candidate is retried against the outer tag.
                if st.tags.last().map_or(false, |t| t.require_children.is_some()) {
                    st.close_top();
                } else {
                    st.inert();
                }
            }
        }
    }

    fn is_block_level(&self, tag: &str) -> bool {
        self.table.lookup(tag).map_or(false, |def| def.block_level)
    }

    /// Close `[/tag]` at the cursor, returning false if it is inert.
    fn close_tag(&self, st: &mut ParseState<'t>) -> bool {
        let rest = st.buf.remaining();
        let Some(end) = rest.find(']') else {
            return false;
        };
        if end <= 2 {
            return false;
        }
        let look_for = rest[2..end].to_ascii_lowercase();

        let Some(target) = st.tags.innermost(&look_for) else {
            trace!(target: TARGET, "[/{look_for}] matches nothing open");
            return false;
        };

        // `None` unless a block-level frame is in the way, in which case only a block-level
        // closer may reach through it.
        let block_level: Option<bool> = st
            .tags
            .innermost_block()
            .filter(|block| *block >= target)
            .map(|_| self.is_block_level(&look_for));
        if block_level == Some(false) {
            trace!(target: TARGET, "[/{look_for}] stops at a block-level tag");
            return false;
        }

        let mut to_close = Vec::with_capacity(st.tags.len() - target);
        while st.tags.len() > target {
            if let Some(tag) = st.tags.pop() {
                to_close.push(tag);
            }
        }

        st.buf.advance(end + 1);
        for tag in to_close {
            trace!(target: TARGET, "closing [{}]", tag.tag);
            st.out.push_markup(&tag.after);
            Self::eat_after_close(st, &tag);
        }

        true
    }

    fn eat_after_close(st: &mut ParseState<'t>, tag: &OpenTag<'t>) {
        if tag.block_level {
            st.buf.eat(&BLOCK_TRAILER);
        }
        if tag.trim.eats_outside() {
            st.buf.eat(if tag.has_parents { &BREAK_RUN } else { &SPACE_RUN });
        }
    }

    /// Find the first definition that fits the opening tag at the cursor.
    fn match_definition(&self, st: &ParseState<'t>) -> Option<Matched<'t>> {
        let rest = st.buf.remaining();
        let initial = rest[1..].chars().next()?;
        let inside = st.tags.last();

        for cand in self.table.candidates(initial) {
            let def = &cand.def;
            if !self.allows(&def.tag) {
                continue;
            }

            let name_end = 1 + def.tag.len();
            if !rest
                .get(1..name_end)
                .map_or(false, |name| name.eq_ignore_ascii_case(&def.tag))
            {
                continue;
            }

            // A tag name at the very end of the message.
            let Some(next_c) = rest[name_end..].chars().next() else {
                break;
            };
            let after_next = name_end + next_c.len_utf8();

            if let Some(test) = &cand.test {
                if !test.is_match(&rest[after_next..]) {
                    continue;
                }
            }

            if !Self::syntax_fits(cand, &rest[name_end..], next_c) {
                continue;
            }

            if !Self::tree_allows(def, inside) {
                continue;
            }

            let (value_start, params) = match &cand.params {
                Some(matcher) => {
                    let blob_end = self
                        .table
                        .find_candidate(rest, name_end)
                        .unwrap_or(rest.len());
                    let Some((end, values)) = matcher.matches(&rest[name_end..blob_end]) else {
                        continue;
                    };
                    (name_end + end + 1, Self::param_values(def, values))
                }
                None => (after_next, Vec::new()),
            };

            return Some(Matched {
                def,
                name_end,
                value_start,
                params,
            });
        }

        None
    }

    fn syntax_fits(cand: &CompiledTag, after_name: &str, next_c: char) -> bool {
        if cand.params.is_some() {
            return next_c == ' ';
        }

        match cand.def.kind {
            ContentKind::Closed => {
                next_c == ']' || after_name.starts_with("/]") || after_name.starts_with(" /]")
            }
            ContentKind::Parsed | ContentKind::UnparsedContent => next_c == ']',
            _ => next_c == '=',
        }
    }

    fn tree_allows(def: &TagDefinition, inside: Option<&OpenTag<'t>>) -> bool {
        let lists = |list: &Option<Vec<String>>| {
            list.as_ref()
                .map(|names| names.iter().any(|n| *n == def.tag))
        };

        match (&def.require_parents, inside) {
            (Some(parents), Some(inside)) => parents.iter().any(|p| p == inside.tag),
            (Some(_), None) => false,
            (None, Some(inside)) => {
                lists(&inside.require_children).unwrap_or(true)
                    && !lists(&inside.disallow_children).unwrap_or(false)
            }
            (None, None) => true,
        }
    }

    fn param_values(def: &'t TagDefinition, values: Vec<Option<String>>) -> Vec<(&'t str, String)> {
        def.parameters
            .iter()
            .zip(values)
            .map(|((key, spec), value)| {
                let value = match value {
                    Some(v) => match (&spec.value, spec.validate) {
                        (Some(template), _) => html::substitute_positional(template, &[v]),
                        (None, Some(validator)) => validator.validate(&v),
                        (None, None) => v,
                    },
                    None => String::new(),
                };
                (key.as_str(), html::neutralize_placeholders(&value).into_owned())
            })
            .collect()
    }

    /// The before, after and content templates to use, with parameters substituted.
    fn templates(&self, m: &Matched<'t>, st: &ParseState<'t>) -> (String, String, String) {
        let def = m.def;
        let block = def.block_level;
        let (before, after, content) = if !self.disabled.contains(&def.tag) {
            (def.before.as_str(), def.after.as_str(), def.content.as_str())
        } else if def.disabled_before.is_none()
            && def.disabled_after.is_none()
            && def.disabled_content.is_none()
        {
            let content = match (&def.kind, block) {
                (ContentKind::Closed, _) => "",
                (_, true) => "<div>$1</div>",
                (_, false) => "$1",
            };
            if block {
                ("<div>", "</div>", content)
            } else {
                ("", "", content)
            }
        } else if def.disabled_before.is_some() || def.disabled_after.is_some() {
            let (open, close) = if block { ("<div>", "</div>") } else { ("", "") };
            (
                def.disabled_before.as_deref().unwrap_or(open),
                def.disabled_after.as_deref().unwrap_or(close),
                def.content.as_str(),
            )
        } else {
            (
                def.before.as_str(),
                def.after.as_str(),
                def.disabled_content.as_deref().unwrap_or_default(),
            )
        };

        let mut before = before.to_owned();
        if def.tag == "quote" {
            let alternate = st.tags.count("quote") % 2 == 1;
            let class = if alternate { "alternate" } else { "standard" };
            before = before.replace(
                "<blockquote>",
                &format!("<blockquote class=\"bbc_{class}_quote\">"),
            );
        }

        if m.params.is_empty() {
            return (before, after.to_owned(), content.to_owned());
        }

        let lookup = |key: &str| {
            m.params
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.as_str())
        };
        (
            html::substitute_named(&before, lookup),
            html::substitute_named(after, lookup),
            html::substitute_named(content, lookup),
        )
    }

    /// Open the tag at the cursor.
    fn open_tag(&self, st: &mut ParseState<'t>) -> Outcome {
        let Some(m) = self.match_definition(st) else {
            return Outcome::Unmatched;
        };
        let def = m.def;
        let (before, after, content) = self.templates(&m, st);

        let inside_block = st.tags.last().map_or(false, |t| t.block_level);
        let disallow_children = match (
            &def.disallow_children,
            st.tags.last().and_then(|t| t.disallow_children.as_ref()),
        ) {
            (Some(own), Some(outer)) => {
                let mut all = own.clone();
                all.extend(outer.iter().filter(|t| !own.contains(t)).cloned());
                Some(all)
            }
            (own, outer) => own.clone().or_else(|| outer.cloned()),
        };

        // Block-level tags can't live inside inline ones.
        if def.block_level && def.tag != "html" && !inside_block {
            while st.tags.last().map_or(false, |t| !t.block_level) {
                st.close_top();
            }
        }

        let frame = OpenTag {
            tag: &def.tag,
            after,
            block_level: def.block_level,
            trim: def.trim,
            has_parents: def.require_parents.is_some(),
            require_children: def.require_children.clone(),
            disallow_children,
            no_autolink: def.no_autolink,
        };

        let base = st.buf.cursor();
        let consumed = match &def.kind {
            ContentKind::Parsed => {
                st.out.push_markup(&before);
                Some(base + m.value_start)
            }
            ContentKind::Closed => st
                .buf
                .find_from(base + m.name_end, "]")
                .map(|close| {
                    st.out.push_markup(&content);
                    close.max(base + m.value_start - 1) + 1
                }),
            ContentKind::UnparsedContent => {
                self.unparsed_content(st, def, base + m.value_start, &content)
            }
            ContentKind::UnparsedEqualsContent { quoted } => {
                self.unparsed_equals_content(st, def, base + m.value_start, *quoted, &content)
            }
            ContentKind::UnparsedCommasContent => {
                self.unparsed_commas_content(st, def, base + m.value_start, &content)
            }
            ContentKind::UnparsedCommas => {
                let start = base + m.value_start;
                st.buf.find_from(start, "]").map(|close| {
                    let mut args: Vec<String> = st.buf.text()[start..close]
                        .split(',')
                        .map(|field| field.trim().to_owned())
                        .collect();
                    if let Some(validator) = def.validate {
                        validator.apply(&mut args);
                    }
                    st.out
                        .push_markup(&html::substitute_positional(&before, &args));
                    st.tags.push(OpenTag {
                        after: html::substitute_positional(&frame.after, &args),
                        ..frame.clone()
                    });
                    close + 1
                })
            }
            ContentKind::UnparsedEquals { quoted } | ContentKind::ParsedEquals { quoted, .. } => {
                let start = base + m.value_start;
                value_bounds(st.buf.text(), start, *quoted).map(|(value, end)| {
                    let mut args = vec![st.buf.text()[value].to_owned()];
                    if let Some(validator) = def.validate {
                        validator.apply(&mut args);
                    }
                    if let ContentKind::ParsedEquals { allowed_tags, .. } = &def.kind {
                        args[0] = self.parse_value(&args[0], allowed_tags.as_deref());
                    }
                    st.out
                        .push_markup(&html::substitute_positional(&before, &args));
                    st.tags.push(OpenTag {
                        after: html::substitute_positional(&frame.after, &args),
                        ..frame.clone()
                    });
                    end
                })
            }
        };

        let Some(consumed) = consumed else {
            trace!(target: TARGET, "[{}] is missing its value or closing tag", def.tag);
            return Outcome::Inert;
        };

        if def.kind == ContentKind::Parsed {
            st.tags.push(frame);
        }
        trace!(target: TARGET, "opened [{}]", def.tag);
        st.buf.advance_to(consumed);

        if def.block_level && st.buf.remaining().starts_with("<br>") {
            st.buf.advance("<br>".len());
        }
        if def.trim.eats_inside() {
            st.buf.eat(&BREAK_RUN);
        }

        Outcome::Handled
    }

    fn unparsed_content(
        &self,
        st: &mut ParseState<'t>,
        def: &TagDefinition,
        start: usize,
        content: &str,
    ) -> Option<usize> {
        let closer = format!("[/{}]", def.tag);
        let close = st.buf.find_ci_from(start, &closer)?;
        let mut args = vec![body(st.buf.text(), start..close, def.block_level)];
        if let Some(validator) = def.validate {
            validator.apply(&mut args);
        }

        st.out
            .push_markup(&html::substitute_positional(content, &args));
        Some(close + closer.len())
    }

    fn unparsed_equals_content(
        &self,
        st: &mut ParseState<'t>,
        def: &TagDefinition,
        start: usize,
        quoted: Quoting,
        content: &str,
    ) -> Option<usize> {
        let (value, body_start) = value_bounds(st.buf.text(), start, quoted)?;
        let closer = format!("[/{}]", def.tag);
        let close = st.buf.find_ci_from(body_start, &closer)?;
        let text = st.buf.text();
        let mut args = vec![
            body(text, body_start..close, def.block_level),
            text[value].to_owned(),
        ];
        if let Some(validator) = def.validate {
            validator.apply(&mut args);
        }

        st.out
            .push_markup(&html::substitute_positional(content, &args));
        Some(close + closer.len())
    }

    fn unparsed_commas_content(
        &self,
        st: &mut ParseState<'t>,
        def: &TagDefinition,
        start: usize,
        content: &str,
    ) -> Option<usize> {
        let value_end = st.buf.find_from(start, "]")?;
        let closer = format!("[/{}]", def.tag);
        let close = st.buf.find_ci_from(value_end, &closer)?;
        let text = st.buf.text();
        let mut args = vec![text[value_end + 1..close].trim().to_owned()];
        args.extend(
            text[start..value_end]
                .split(',')
                .map(|field| field.trim().to_owned()),
        );
        if let Some(validator) = def.validate {
            validator.apply(&mut args);
        }

        st.out
            .push_markup(&html::substitute_positional(content, &args));
        Some(close + closer.len())
    }

    /// Parse a tag value with a child parser, one level deeper.
    fn parse_value(&self, value: &str, allowed: Option<&'t [String]>) -> String {
        if self.depth >= self.config.max_depth {
            warn!(
                target: TARGET,
                "parsed values nested deeper than {}, emitting literally", self.config.max_depth
            );
            return html::escape_brackets(value).into_owned();
        }

        let child = Self {
            restrict: allowed.or(self.restrict),
            smileys: self.smileys.filter(|_| allowed.is_none()),
            depth: self.depth + 1,
            ..*self
        };
        child.parse(value)
    }
}

/// Locate a tag value starting at `start`, honouring its quoting.
///
/// Returns the value's range and the offset just past its terminator.
fn value_bounds(text: &str, start: usize, quoting: Quoting) -> Option<(std::ops::Range<usize>, usize)> {
    const QUOTE: &str = "&quot;";

    let quoted = text[start..].starts_with(QUOTE);
    let (start, terminator) = match (quoting, quoted) {
        (Quoting::Required, false) => return None,
        (Quoting::Optional | Quoting::Required, true) => (start + QUOTE.len(), "&quot;]"),
        _ => (start, "]"),
    };

    let end = start + text[start..].find(terminator)?;
    Some((start..end, end + terminator.len()))
}

/// An unparsed body. Block-level tags drop one leading line break.
fn body(text: &str, range: std::ops::Range<usize>, block_level: bool) -> String {
    let body = &text[range];
    if block_level {
        body.strip_prefix("<br>").unwrap_or(body).to_owned()
    } else {
        body.to_owned()
    }
}

#[cfg(test)]
mod tests;
