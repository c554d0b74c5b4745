//! The rendering facade: cache lookup, parse, cache store.
use std::time::Duration;

use log::{debug, warn};
use static_assertions::assert_impl_all;

use crate::autolink::Autolinker;
use crate::cache::{CacheBackend, CacheKey};
use crate::config::EngineSettings;
use crate::html;
use crate::parser::{BBParser, ParserConfig, ParserFeature};
use crate::smileys::SmileyTable;
use crate::tags::{DisabledSet, TagTable};

const TARGET: &str = "bbc.engine";
const CACHE_TARGET: &str = "bbc.cache";

/// Per-call rendering options.
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    /// Replace smiley codes.
    pub smileys: bool,
    pub disabled: DisabledSet,
    /// Anything else the output depends on, such as the reader's locale. Only used for caching.
    pub fingerprint: String,
    /// Only recognize these tags. Restricted renders are never cached.
    pub only_tags: Option<Vec<String>>,
}

/// Renders messages against a fixed tag table.
///
/// An engine is immutable once built and can be shared between threads; every render
/// keeps its own parse state.
pub struct Engine {
    table: TagTable,
    smileys: Option<SmileyTable>,
    config: ParserConfig,
    cache: Option<Box<dyn CacheBackend>>,
    cache_ttl: Duration,
    cache_min_length: usize,
}

assert_impl_all!(Engine: Send, Sync);

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("tags", &self.table.len())
            .field("smileys", &self.smileys.as_ref().map(|s| s.entries().len()))
            .field("config", &self.config)
            .field("cached", &self.cache.is_some())
            .finish()
    }
}

impl Engine {
    pub fn builder(table: TagTable) -> EngineBuilder {
        EngineBuilder {
            table,
            smileys: None,
            config: ParserConfig::default(),
            cache: None,
            cache_ttl: EngineSettings::default().cache_ttl(),
            cache_min_length: 0,
        }
    }

    pub fn tags(&self) -> &TagTable {
        &self.table
    }

    /// Render a raw message.
    pub fn render(&self, message: &str, options: &RenderOptions) -> String {
        let key = match &self.cache {
            Some(_) if options.only_tags.is_none() && message.len() >= self.cache_min_length => {
                Some(CacheKey::new(
                    message,
                    options.smileys,
                    &options.disabled,
                    &options.fingerprint,
                ))
            }
            _ => None,
        };

        if let (Some(cache), Some(key)) = (&self.cache, &key) {
            match cache.get(key) {
                Ok(Some(hit)) => {
                    debug!(target: CACHE_TARGET, "hit for a {} byte message", message.len());
                    return hit;
                }
                Ok(None) => debug!(target: CACHE_TARGET, "miss for a {} byte message", message.len()),
                Err(err) => warn!(target: CACHE_TARGET, "lookup failed, rendering uncached: {err}"),
            }
        }

        let rendered = self.render_uncached(message, options);

        if let (Some(cache), Some(key)) = (&self.cache, key) {
            if let Err(err) = cache.put(key, rendered.clone(), self.cache_ttl) {
                warn!(target: CACHE_TARGET, "store failed: {err}");
            }
        }

        rendered
    }

    /// Render without consulting or filling the cache.
    pub fn render_uncached(&self, message: &str, options: &RenderOptions) -> String {
        if message.is_empty() {
            return String::new();
        }

        let prepared = html::prepare_message(message);
        let only_tags: Option<Vec<String>> = options
            .only_tags
            .as_ref()
            .map(|tags| tags.iter().map(|t| t.to_ascii_lowercase()).collect());

        let mut parser = BBParser::new(&self.table, &self.config, &options.disabled);
        if let Some(only) = &only_tags {
            debug!(target: TARGET, "rendering restricted to {only:?}");
            parser = parser.restricted_to(only);
        }
        if let (true, Some(smileys)) = (options.smileys, &self.smileys) {
            parser = parser.with_smileys(smileys);
        }

        parser.parse(&prepared)
    }
}

pub struct EngineBuilder {
    table: TagTable,
    smileys: Option<SmileyTable>,
    config: ParserConfig,
    cache: Option<Box<dyn CacheBackend>>,
    cache_ttl: Duration,
    cache_min_length: usize,
}

impl EngineBuilder {
    pub fn smileys(mut self, smileys: SmileyTable) -> Self {
        self.smileys = Some(smileys);
        self
    }

    pub fn autolinker(mut self, autolinker: Autolinker) -> Self {
        self.config.autolinker = Some(autolinker);
        self
    }

    pub fn features(mut self, features: ParserFeature) -> Self {
        self.config.feature_flags = features;
        self
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.config.max_depth = depth;
        self
    }

    pub fn cache(mut self, cache: impl CacheBackend + 'static) -> Self {
        self.cache = Some(Box::new(cache));
        self
    }

    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn cache_min_length(mut self, length: usize) -> Self {
        self.cache_min_length = length;
        self
    }

    /// Apply features, depth and cache settings. Disabled tags are per call, see
    /// [EngineSettings::disabled_set].
    pub fn settings(self, settings: &EngineSettings) -> Self {
        self.features(settings.features())
            .max_depth(settings.max_depth)
            .cache_ttl(settings.cache_ttl())
            .cache_min_length(settings.cache_min_length)
    }

    pub fn build(self) -> Engine {
        Engine {
            table: self.table,
            smileys: self.smileys,
            config: self.config,
            cache: self.cache,
            cache_ttl: self.cache_ttl,
            cache_min_length: self.cache_min_length,
        }
    }
}
