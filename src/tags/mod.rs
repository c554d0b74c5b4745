//! Tag definitions and the compiled, read-only table the parser consults.
//!
//! A [TagTable] is built once (usually at startup, from [builtins::default_tags] or from
//! configuration data) and then shared between any number of concurrent parses.
use std::collections::{BTreeMap, BTreeSet, HashMap};

use regex::Regex;
use static_assertions::assert_impl_all;

use crate::error::{ConfigError, ConfigResult};
use crate::parser::params::ParamMatcher;

pub mod builtins;
pub mod validate;

pub use validate::Validator;

/// Legacy single-character list markers, written `[*]`, `[o]` and so on.
pub(crate) const ITEMCODE_MARKERS: &[char] = &['*', '@', '+', 'x', '#', 'o', 'O', '0'];

/// How the body and value of a tag are consumed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Deserialize),
    serde(tag = "type", rename_all = "snake_case")
)]
pub enum ContentKind {
    /// `[tag]body[/tag]`, the body is parsed like the rest of the message.
    #[default]
    Parsed,
    /// `[tag]body[/tag]`, the body is taken verbatim and rendered through `content`.
    UnparsedContent,
    /// `[tag]` or `[tag /]`, nothing to close.
    Closed,
    /// `[tag=value]body[/tag]`, the value is substituted literally.
    UnparsedEquals {
        #[cfg_attr(feature = "serde", serde(default))]
        quoted: Quoting,
    },
    /// `[tag=value]body[/tag]`, the value is itself parsed, limited to `allowed_tags` if given.
    ParsedEquals {
        #[cfg_attr(feature = "serde", serde(default))]
        quoted: Quoting,
        #[cfg_attr(feature = "serde", serde(default))]
        allowed_tags: Option<Vec<String>>,
    },
    /// `[tag=a,b,c]body[/tag]`, fields become `$1`, `$2`...
    UnparsedCommas,
    /// `[tag=a,b]body[/tag]`, the verbatim body is `$1` and the fields follow as `$2`...
    UnparsedCommasContent,
    /// `[tag=value]body[/tag]`, the verbatim body is `$1` and the value `$2`.
    UnparsedEqualsContent {
        #[cfg_attr(feature = "serde", serde(default))]
        quoted: Quoting,
    },
}

impl ContentKind {
    /// Whether the tag must be written `[tag=...`.
    pub fn wants_equals(&self) -> bool {
        matches!(
            self,
            Self::UnparsedEquals { .. }
                | Self::ParsedEquals { .. }
                | Self::UnparsedCommas
                | Self::UnparsedCommasContent
                | Self::UnparsedEqualsContent { .. }
        )
    }
}

/// Whether a tag value may or must be wrapped in `&quot;`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum Quoting {
    #[default]
    Never,
    Optional,
    Required,
}

/// Which whitespace is eaten around a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum Trim {
    #[default]
    None,
    Inside,
    Outside,
    Both,
}

impl Trim {
    pub fn eats_inside(self) -> bool {
        matches!(self, Self::Inside | Self::Both)
    }

    pub fn eats_outside(self) -> bool {
        matches!(self, Self::Outside | Self::Both)
    }
}

/// One named parameter of a tag, as in `[img width=100]`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize), serde(default))]
pub struct ParamSpec {
    pub optional: bool,
    pub quoted: bool,
    /// Regex fragment the value must match. Defaults to a lazy match of anything.
    pub matches: Option<String>,
    /// Template for the substituted value, `$1` being the matched value.
    pub value: Option<String>,
    pub validate: Option<Validator>,
}

impl ParamSpec {
    pub fn required() -> Self {
        Self::default()
    }

    pub fn optional() -> Self {
        Self {
            optional: true,
            ..Self::default()
        }
    }

    pub fn quoted(mut self) -> Self {
        self.quoted = true;
        self
    }

    pub fn matching(mut self, pattern: &str) -> Self {
        self.matches = Some(pattern.to_owned());
        self
    }

    pub fn value(mut self, template: &str) -> Self {
        self.value = Some(template.to_owned());
        self
    }

    pub fn validate(mut self, validator: Validator) -> Self {
        self.validate = Some(validator);
        self
    }
}

/// A single tag definition. Several definitions may share a name, they are tried in
/// registration order and the first one whose syntax fits wins.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize), serde(default))]
pub struct TagDefinition {
    pub tag: String,
    pub kind: ContentKind,
    pub parameters: BTreeMap<String, ParamSpec>,
    /// Regex fragment that must match right after the character following the tag name.
    pub test: Option<String>,
    pub before: String,
    pub after: String,
    pub content: String,
    pub disabled_before: Option<String>,
    pub disabled_after: Option<String>,
    pub disabled_content: Option<String>,
    pub block_level: bool,
    pub trim: Trim,
    pub require_parents: Option<Vec<String>>,
    pub require_children: Option<Vec<String>>,
    pub disallow_children: Option<Vec<String>>,
    /// Text inside this tag is never autolinked nor given smileys.
    pub no_autolink: bool,
    pub validate: Option<Validator>,
}

fn names(list: &[&str]) -> Option<Vec<String>> {
    Some(list.iter().map(|s| (*s).to_owned()).collect())
}

impl TagDefinition {
    pub fn new(tag: &str, kind: ContentKind) -> Self {
        Self {
            tag: tag.to_owned(),
            kind,
            ..Self::default()
        }
    }

    pub fn before(mut self, template: &str) -> Self {
        self.before = template.to_owned();
        self
    }

    pub fn after(mut self, template: &str) -> Self {
        self.after = template.to_owned();
        self
    }

    pub fn content(mut self, template: &str) -> Self {
        self.content = template.to_owned();
        self
    }

    pub fn disabled_before(mut self, template: &str) -> Self {
        self.disabled_before = Some(template.to_owned());
        self
    }

    pub fn disabled_after(mut self, template: &str) -> Self {
        self.disabled_after = Some(template.to_owned());
        self
    }

    pub fn disabled_content(mut self, template: &str) -> Self {
        self.disabled_content = Some(template.to_owned());
        self
    }

    pub fn test(mut self, pattern: &str) -> Self {
        self.test = Some(pattern.to_owned());
        self
    }

    pub fn param(mut self, name: &str, spec: ParamSpec) -> Self {
        self.parameters.insert(name.to_owned(), spec);
        self
    }

    pub fn block_level(mut self) -> Self {
        self.block_level = true;
        self
    }

    pub fn trim(mut self, trim: Trim) -> Self {
        self.trim = trim;
        self
    }

    pub fn require_parents(mut self, tags: &[&str]) -> Self {
        self.require_parents = names(tags);
        self
    }

    pub fn require_children(mut self, tags: &[&str]) -> Self {
        self.require_children = names(tags);
        self
    }

    pub fn disallow_children(mut self, tags: &[&str]) -> Self {
        self.disallow_children = names(tags);
        self
    }

    pub fn no_autolink(mut self) -> Self {
        self.no_autolink = true;
        self
    }

    pub fn validate(mut self, validator: Validator) -> Self {
        self.validate = Some(validator);
        self
    }
}

/// A definition together with everything compiled from it.
#[derive(Debug)]
pub(crate) struct CompiledTag {
    pub def: TagDefinition,
    pub test: Option<Regex>,
    pub params: Option<ParamMatcher>,
}

/// The immutable tag registry.
#[derive(Debug)]
pub struct TagTable {
    tags: Vec<CompiledTag>,
    by_initial: HashMap<char, Vec<usize>>,
    scanner: Regex,
}

assert_impl_all!(TagTable: Send, Sync);

fn valid_name(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
}

fn valid_param_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
}

impl TagTable {
    /// Validate and compile the given definitions.
    pub fn new(definitions: Vec<TagDefinition>) -> ConfigResult<Self> {
        let mut tags = Vec::with_capacity(definitions.len());
        let mut by_initial: HashMap<char, Vec<usize>> = HashMap::new();
        let mut all_names = BTreeSet::new();

        for mut def in definitions {
            def.tag.make_ascii_lowercase();
            if !valid_name(&def.tag) {
                return Err(ConfigError::InvalidTagName(def.tag));
            }

            if def.kind == ContentKind::Closed && def.content.contains("$1") {
                return Err(ConfigError::ClosedTagArgument(def.tag));
            }

            if let Some(param) = def.parameters.keys().find(|p| !valid_param_name(p)) {
                return Err(ConfigError::InvalidParamName {
                    tag: def.tag.clone(),
                    param: param.clone(),
                });
            }

            let test = def
                .test
                .as_deref()
                .map(|t| Regex::new(&format!("^(?:{t})")))
                .transpose()
                .map_err(|source| ConfigError::TagPattern {
                    tag: def.tag.clone(),
                    source,
                })?;

            let params = if def.parameters.is_empty() {
                None
            } else {
                Some(ParamMatcher::new(&def.parameters).map_err(|source| {
                    ConfigError::TagPattern {
                        tag: def.tag.clone(),
                        source,
                    }
                })?)
            };

            // Validated above, the name is non-empty ASCII.
            let initial = def.tag.as_bytes()[0] as char;
            by_initial.entry(initial).or_default().push(tags.len());
            all_names.insert(def.tag.clone());

            tags.push(CompiledTag { def, test, params });
        }

        let mut sorted: Vec<&String> = all_names.iter().collect();
        sorted.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        let alternation = sorted
            .iter()
            .map(|n| regex::escape(n))
            .collect::<Vec<_>>()
            .join("|");
        // None of the markers is special inside a character class.
        let markers: String = ITEMCODE_MARKERS.iter().collect();
        let pattern = if alternation.is_empty() {
            format!(r"\[/?[{markers}]")
        } else {
            format!(r"(?i)\[/?(?:(?:{alternation})\b|[{markers}])")
        };
        let scanner = Regex::new(&pattern).map_err(ConfigError::Scanner)?;

        log::debug!(
            target: "bbc.tags",
            "compiled tag table with {} definitions ({} names)",
            tags.len(),
            all_names.len()
        );

        Ok(Self {
            tags,
            by_initial,
            scanner,
        })
    }

    /// Load definitions from a JSON array and compile them.
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let definitions: Vec<TagDefinition> = serde_json::from_str(json)?;
        Self::new(definitions)
    }

    /// Byte offset of the next tag candidate (`[name`, `[/name` or an itemcode marker) at or after `from`.
    pub fn find_candidate(&self, text: &str, from: usize) -> Option<usize> {
        self.scanner.find_at(text, from).map(|m| m.start())
    }

    /// All definitions whose name starts with `initial`, in registration order.
    pub(crate) fn candidates(&self, initial: char) -> impl Iterator<Item = &CompiledTag> + '_ {
        self.by_initial
            .get(&initial.to_ascii_lowercase())
            .into_iter()
            .flatten()
            .map(|idx| &self.tags[*idx])
    }

    /// The first definition registered under `name`.
    pub fn lookup(&self, name: &str) -> Option<&TagDefinition> {
        let initial = name.chars().next()?;
        self.candidates(initial)
            .map(|t| &t.def)
            .find(|d| d.tag == name)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn definitions(&self) -> impl Iterator<Item = &TagDefinition> + '_ {
        self.tags.iter().map(|t| &t.def)
    }
}

/// Tag names an administrator turned off for the current call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct DisabledSet(BTreeSet<String>);

impl DisabledSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tag: &str) -> bool {
        self.0.insert(tag.to_ascii_lowercase())
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.contains(tag)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Names in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.0.iter().map(String::as_str)
    }
}

impl<S: AsRef<str>> FromIterator<S> for DisabledSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        for tag in iter {
            set.insert(tag.as_ref());
        }
        set
    }
}

#[cfg(test)]
mod tests;
