//! The working copy of a message and the output being assembled from it.
use std::ops::Range;

use regex::Regex;

use crate::html;
use crate::smileys::SmileyTable;

/// A message with a scan cursor.
///
/// Everything before the cursor has been consumed and is never touched again. Rewrites
/// (autolinked text, synthesized closing tags) may only land at or after the cursor, so the
/// scanner picks them up the next time it looks ahead.
#[derive(Debug, Clone, Default)]
pub struct ParseBuffer {
    text: String,
    cursor: usize,
    /// Text before this offset already went through the raw-text fixups.
    fixed_until: usize,
}

impl ParseBuffer {
    pub fn new(text: String) -> Self {
        Self {
            text,
            cursor: 0,
            fixed_until: 0,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_at_end(&self) -> bool {
        self.cursor >= self.text.len()
    }

    /// Returns all input text left to parse
    pub fn remaining(&self) -> &str {
        &self.text[self.cursor..]
    }

    pub fn advance(&mut self, by: usize) {
        self.advance_to(self.cursor + by);
    }

    pub fn advance_to(&mut self, pos: usize) {
        debug_assert!(pos >= self.cursor, "the cursor never moves backwards");
        self.cursor = pos.min(self.text.len());
    }

    pub fn fixed_until(&self) -> usize {
        self.fixed_until
    }

    pub fn mark_fixed(&mut self, until: usize) {
        self.fixed_until = self.fixed_until.max(until);
    }

    /// Replace `range` with `with`. Text spliced into the fixed region counts as fixed.
    pub fn splice(&mut self, range: Range<usize>, with: &str) {
        debug_assert!(range.start >= self.cursor, "consumed text is read-only");
        let removed = range.len();
        if self.fixed_until >= range.end {
            self.fixed_until = self.fixed_until - removed + with.len();
        } else if self.fixed_until > range.start {
            self.fixed_until = range.start + with.len();
        }
        self.text.replace_range(range, with);
    }

    pub fn insert(&mut self, pos: usize, with: &str) {
        self.splice(pos..pos, with);
    }

    /// Absolute offset of `needle` at or after `pos`.
    pub fn find_from(&self, pos: usize, needle: &str) -> Option<usize> {
        self.text.get(pos..)?.find(needle).map(|idx| pos + idx)
    }

    /// Like [ParseBuffer::find_from], ignoring ASCII case.
    pub fn find_ci_from(&self, pos: usize, needle: &str) -> Option<usize> {
        let hay = self.text.as_bytes();
        let needle = needle.as_bytes();
        if needle.is_empty() || hay.len() < needle.len() {
            return None;
        }

        // An ASCII needle only ever matches ASCII bytes, so any hit is a char boundary.
        (pos..=hay.len() - needle.len()).find(|&i| hay[i..i + needle.len()].eq_ignore_ascii_case(needle))
    }

    /// Skip whatever the anchored `pattern` matches at the cursor.
    pub fn eat(&mut self, pattern: &Regex) -> usize {
        let eaten = pattern.find(self.remaining()).map_or(0, |m| m.end());
        self.cursor += eaten;
        eaten
    }
}

/// A piece of rendered output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Message text. `smileys` is false inside tags that opt out of autolinking.
    Text { body: String, smileys: bool },
    /// Markup produced from tag templates, never touched again.
    Markup(String),
}

/// Append-only output of a parse.
#[derive(Debug, Clone, Default)]
pub struct Output {
    segments: Vec<Segment>,
}

impl Output {
    pub fn push_text(&mut self, text: &str, smileys: bool) {
        if text.is_empty() {
            return;
        }

        match self.segments.last_mut() {
            Some(Segment::Text {
                body,
                smileys: last_smileys,
            }) if *last_smileys == smileys => body.push_str(text),
            _ => self.segments.push(Segment::Text {
                body: text.to_owned(),
                smileys,
            }),
        }
    }

    pub fn push_markup(&mut self, markup: &str) {
        if markup.is_empty() {
            return;
        }

        match self.segments.last_mut() {
            Some(Segment::Markup(last)) => last.push_str(markup),
            _ => self.segments.push(Segment::Markup(markup.to_owned())),
        }
    }

    /// The last character of message text, unless markup was emitted after it.
    pub fn last_text_char(&self) -> Option<char> {
        match self.segments.last()? {
            Segment::Text { body, .. } => body.chars().next_back(),
            Segment::Markup(_) => None,
        }
    }

    #[cfg(test)]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Join all segments, tidying whitespace in text and replacing smileys where allowed.
    pub fn finish(self, smileys: Option<&SmileyTable>) -> String {
        let capacity = self
            .segments
            .iter()
            .map(|s| match s {
                Segment::Text { body, .. } => body.len(),
                Segment::Markup(markup) => markup.len(),
            })
            .sum();
        let mut out = String::with_capacity(capacity);

        for (idx, segment) in self.segments.into_iter().enumerate() {
            match segment {
                Segment::Markup(markup) => out.push_str(&markup),
                Segment::Text { body, smileys: allowed } => {
                    let tidy = html::tidy_spaces(&body, idx == 0);
                    match smileys.filter(|_| allowed) {
                        Some(table) => out.push_str(&table.replace(&tidy)),
                        None => out.push_str(&tidy),
                    }
                }
            }
        }

        out
    }
}
