//! BBCode rendering for forum messages: tags, smileys, bare links and list shorthand.
//!
//! Build a [TagTable] once, wrap it in an [Engine] together with the site's smileys, link
//! detection and cache, then [render](Engine::render) messages from any number of threads.
//!
//! ```
//! use bbc_engine::{builtins, Engine, RenderOptions};
//!
//! let engine = Engine::builder(builtins::default_table().unwrap()).build();
//! assert_eq!(
//!     engine.render("[b]bold[/b] & [i]italic", &RenderOptions::default()),
//!     "<b>bold</b> &amp; <i>italic</i>"
//! );
//! ```

pub mod autolink;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod html;
pub mod parser;
pub mod smileys;
pub mod tags;

pub use autolink::Autolinker;
pub use cache::{CacheBackend, CacheKey, MemoryCache};
pub use config::EngineSettings;
pub use engine::{Engine, EngineBuilder, RenderOptions};
pub use error::{CacheError, ConfigError, ConfigResult};
pub use parser::{BBParser, ParserConfig, ParserFeature};
pub use smileys::{RawSmiley, SmileyEntry, SmileyTable};
pub use tags::{builtins, ContentKind, DisabledSet, ParamSpec, Quoting, TagDefinition, TagTable, Trim, Validator};
