//! Matching of named parameter blocks such as `[quote author=Jo date=1700000000]`.
use std::collections::BTreeMap;

use regex::Regex;

use crate::tags::ParamSpec;

/// A compiled parameter schema.
///
/// Parameters may be written in any order, so the given `key=value` pieces are sorted before
/// being matched against a pattern that lists the keys in name order.
#[derive(Debug)]
pub struct ParamMatcher {
    keys: Vec<String>,
    splitter: Regex,
    pattern: Regex,
}

impl ParamMatcher {
    pub fn new(parameters: &BTreeMap<String, ParamSpec>) -> Result<Self, regex::Error> {
        let keys: Vec<String> = parameters.keys().cloned().collect();
        let alternation = keys
            .iter()
            .map(|k| regex::escape(k))
            .collect::<Vec<_>>()
            .join("|");

        let mut pattern = String::from("(?i)^");
        for (idx, (key, spec)) in parameters.iter().enumerate() {
            let quote = if spec.quoted { "&quot;" } else { "" };
            let value = spec.matches.as_deref().unwrap_or(".+?");
            pattern.push_str(&format!(
                r"(?:\s+{key}={quote}(?P<v{idx}>(?:{value})){quote}\s*)",
                key = regex::escape(key)
            ));
            if spec.optional {
                pattern.push('?');
            }
        }
        pattern.push('$');

        Ok(Self {
            splitter: Regex::new(&format!(r"(?i)(\s)(?:{alternation})="))?,
            pattern: Regex::new(&pattern)?,
            keys,
        })
    }

    /// Put the `key=value` pieces of `window` in name order.
    fn normalize(&self, window: &str) -> String {
        let mut pieces = Vec::new();
        let mut start = 0;
        for caps in self.splitter.captures_iter(window) {
            // Group 1 always participates.
            let Some(space) = caps.get(1) else { continue };
            pieces.push(&window[start..space.start()]);
            start = space.end();
        }
        pieces.push(&window[start..]);
        pieces.sort_unstable();
        pieces.join(" ")
    }

    /// Try progressively larger windows of `blob`, each ending right before a `]`.
    ///
    /// `blob` starts right after the tag name. On success returns the offset of the `]` closing
    /// the tag and one value per key, in key order.
    pub fn matches(&self, blob: &str) -> Option<(usize, Vec<Option<String>>)> {
        for (end, _) in blob.match_indices(']') {
            let normalized = self.normalize(&blob[..end]);
            let Some(caps) = self.pattern.captures(&normalized) else {
                continue;
            };

            let values = (0..self.keys.len())
                .map(|idx| caps.name(&format!("v{idx}")).map(|m| m.as_str().to_owned()))
                .collect();
            return Some((end, values));
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::ParamMatcher;
    use crate::tags::ParamSpec;

    fn quote_params() -> ParamMatcher {
        let mut params = BTreeMap::new();
        params.insert(
            "author".to_owned(),
            ParamSpec::required().matching(r"[^<>]{1,192}?"),
        );
        params.insert("date".to_owned(), ParamSpec::optional().matching(r"\d+"));
        ParamMatcher::new(&params).unwrap()
    }

    #[test]
    fn any_order() {
        let matcher = quote_params();
        let blob = " date=12 author=Jo Smith]body";
        let (end, values) = matcher.matches(blob).unwrap();
        assert_eq!(&blob[..end], " date=12 author=Jo Smith");
        assert_eq!(values, [Some("Jo Smith".to_owned()), Some("12".to_owned())]);
    }

    #[test]
    fn optional_may_be_missing() {
        let (_, values) = quote_params().matches(" AUTHOR=Jo]").unwrap();
        assert_eq!(values, [Some("Jo".to_owned()), None]);
    }

    #[test]
    fn windows_grow_past_inner_brackets() {
        let (end, _) = quote_params().matches(" author=a]b date=1]x").unwrap();
        assert_eq!(end, 9);

        let bracketed = {
            let mut params = BTreeMap::new();
            params.insert("n".to_owned(), ParamSpec::required().matching(r"a\]b"));
            ParamMatcher::new(&params).unwrap()
        };
        let (end, values) = bracketed.matches(" n=a]b]rest").unwrap();
        assert_eq!(end, 6);
        assert_eq!(values[0].as_deref(), Some("a]b"));

        let strict = {
            let mut params = BTreeMap::new();
            params.insert("n".to_owned(), ParamSpec::required().matching(r"\d+"));
            ParamMatcher::new(&params).unwrap()
        };
        assert_eq!(strict.matches(" n=x] n=1]"), None);
    }

    #[test]
    fn required_missing_rejects() {
        assert_eq!(quote_params().matches(" date=1]"), None);
        assert_eq!(quote_params().matches(" author=Jo"), None);
    }

    #[test]
    fn quoted_values() {
        let mut params = BTreeMap::new();
        params.insert("alt".to_owned(), ParamSpec::optional().quoted());
        let matcher = ParamMatcher::new(&params).unwrap();
        let (_, values) = matcher.matches(" alt=&quot;a cat&quot;]").unwrap();
        assert_eq!(values, [Some("a cat".to_owned())]);
        assert_eq!(matcher.matches(" alt=cat]"), None);
    }
}
