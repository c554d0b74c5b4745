//! Smiley codes and their replacement.
use std::borrow::Cow;

use regex::Regex;
use static_assertions::assert_impl_all;

use crate::error::{ConfigError, ConfigResult};

/// Characters a smiley code may directly follow.
const LEADING_PUNCTUATION: &[char] = &['>', ':', '?', '.', '[', ']', '(', ')', '*', '\\', ';'];

/// One smiley: the code as typed and the markup that replaces it.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
pub struct SmileyEntry {
    pub code: String,
    pub markup: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub description: String,
}

/// A smiley as kept by whatever manages them: one image, any number of codes.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
pub struct RawSmiley {
    /// Newline-separated codes.
    pub codes: String,
    /// Image URL.
    pub image: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub description: String,
}

#[derive(Debug)]
pub struct SmileyTable {
    /// Longest code first.
    entries: Vec<SmileyEntry>,
    finder: Option<Regex>,
}

assert_impl_all!(SmileyTable: Send, Sync);

impl SmileyTable {
    /// Build a table from entries whose codes are written as a user would type them.
    ///
    /// Codes are matched against prepared text, so they are HTML-escaped here. Entries keep
    /// their order among codes of equal length.
    pub fn new(entries: impl IntoIterator<Item = SmileyEntry>) -> ConfigResult<Self> {
        let mut entries: Vec<SmileyEntry> = entries
            .into_iter()
            .filter(|e| !e.code.trim().is_empty())
            .map(|e| SmileyEntry {
                code: html_escape::encode_double_quoted_attribute(e.code.trim()).into_owned(),
                ..e
            })
            .collect();
        entries.sort_by(|a, b| b.code.len().cmp(&a.code.len()));

        let finder = if entries.is_empty() {
            None
        } else {
            let alternation = entries
                .iter()
                .map(|e| regex::escape(&e.code))
                .collect::<Vec<_>>()
                .join("|");
            Some(Regex::new(&alternation).map_err(ConfigError::SmileyPattern)?)
        };

        Ok(Self { entries, finder })
    }

    /// Build a table rendering each code as an image.
    pub fn from_images(raw: impl IntoIterator<Item = RawSmiley>) -> ConfigResult<Self> {
        let entries = raw.into_iter().flat_map(|smiley| {
            let image = html_escape::encode_double_quoted_attribute(&smiley.image).into_owned();
            let title = html_escape::encode_double_quoted_attribute(&smiley.description).into_owned();
            smiley
                .codes
                .lines()
                .map(|code| code.trim().to_owned())
                .filter(|code| !code.is_empty())
                .map(|code| SmileyEntry {
                    markup: format!(
                        "<img src=\"{image}\" alt=\"{}\" title=\"{title}\" class=\"smiley\">",
                        html_escape::encode_double_quoted_attribute(&code)
                    ),
                    code,
                    description: smiley.description.clone(),
                })
                .collect::<Vec<_>>()
        });

        Self::new(entries)
    }

    pub fn entries(&self) -> &[SmileyEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replace every delimited smiley code in `text`.
    pub fn replace<'a>(&self, text: &'a str) -> Cow<'a, str> {
        let Some(finder) = &self.finder else {
            return Cow::Borrowed(text);
        };

        let mut out = String::new();
        let mut copied = 0;
        let mut from = 0;
        let mut replaced = false;

        while let Some(found) = finder.find_at(text, from) {
            let start = found.start();
            let entry = preceded_by_boundary(text, start)
                .then(|| {
                    self.entries.iter().find(|e| {
                        text[start..].starts_with(e.code.as_str())
                            && followed_by_boundary(text, start + e.code.len())
                    })
                })
                .flatten();

            match entry {
                Some(entry) => {
                    out.push_str(&text[copied..start]);
                    out.push_str(&entry.markup);
                    copied = start + entry.code.len();
                    from = copied;
                    replaced = true;
                }
                None => {
                    from = start + text[start..].chars().next().map_or(1, char::len_utf8);
                }
            }
        }

        if !replaced {
            return Cow::Borrowed(text);
        }
        out.push_str(&text[copied..]);
        Cow::Owned(out)
    }
}

fn preceded_by_boundary(text: &str, at: usize) -> bool {
    text[..at]
        .chars()
        .next_back()
        .map_or(true, |c| c.is_whitespace() || LEADING_PUNCTUATION.contains(&c))
}

fn followed_by_boundary(text: &str, at: usize) -> bool {
    text[at..].chars().next().map_or(true, |c| !c.is_alphanumeric())
}
