//! Site settings that shape rendering.
use std::time::Duration;

#[cfg(feature = "serde")]
use crate::error::ConfigResult;
use crate::parser::ParserFeature;
use crate::tags::DisabledSet;

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize), serde(default))]
pub struct EngineSettings {
    /// Parse tags at all.
    pub bbc: bool,
    pub autolink: bool,
    /// Recover pasted HTML.
    pub post_html: bool,
    /// Expand `[*]` list shorthand.
    pub itemcodes: bool,
    pub max_depth: usize,
    pub cache_ttl_secs: u64,
    /// Messages shorter than this are not worth caching.
    pub cache_min_length: usize,
    pub disabled_tags: Vec<String>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            bbc: true,
            autolink: true,
            post_html: false,
            itemcodes: true,
            max_depth: 8,
            cache_ttl_secs: 240,
            cache_min_length: 0,
            disabled_tags: Vec::new(),
        }
    }
}

impl EngineSettings {
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn features(&self) -> ParserFeature {
        let mut features = ParserFeature::empty();
        features.set(ParserFeature::BBC, self.bbc);
        features.set(ParserFeature::AUTOLINK, self.autolink);
        features.set(ParserFeature::POST_HTML, self.post_html);
        features.set(ParserFeature::ITEMCODES, self.itemcodes);
        features
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// The per-call set of disabled tags.
    pub fn disabled_set(&self) -> DisabledSet {
        self.disabled_tags.iter().collect()
    }
}
