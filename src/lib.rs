//! `wp-blocks` — parser and renderer for block-annotated content.
//!
//! Documents are HTML interleaved with block delimiter comments:
//!
//! ```text
//! <!-- wp:namespace/name {"json":"attributes"} --> inner html <!-- /wp:namespace/name -->
//! <!-- wp:namespace/name {"json":"attributes"} /-->
//! ```
//!
//! Rendering runs tokenizer → tree builder → renderer. Static block types
//! keep their saved markup (delimiters removed), dynamic block types are
//! replaced by the output of their render callback, and unregistered blocks
//! render nothing.
//!
//! # Quick start
//!
//! ```
//! use wp_blocks::{BlockTypeSettings, RenderContext, Registry, Renderer};
//!
//! let mut registry = Registry::with_core_blocks();
//! registry
//!     .register(
//!         "my-plugin/greeting",
//!         BlockTypeSettings::new().render_callback(|attrs, _content, _block| {
//!             format!("Hello, {}!", attrs["name"].as_str().unwrap_or("world"))
//!         }),
//!     )
//!     .unwrap();
//!
//! let html = Renderer::new(&registry).render_document(
//!     r#"<!-- wp:paragraph --><p>Hi</p><!-- /wp:paragraph --><!-- wp:my-plugin/greeting {"name":"Ada"} /-->"#,
//!     &mut RenderContext::new(),
//! );
//! assert_eq!(html, "<p>Hi</p>Hello, Ada!");
//! ```

pub mod classic;
pub mod config;
pub mod context;
pub mod error;
pub mod fixture;
pub mod parse;
pub mod registry;
pub mod render;
#[cfg(feature = "terminal")]
pub mod render_term;
pub mod tokenizer;
pub mod types;

use std::sync::PoisonError;

pub use classic::{ClassicContent, LegacyBridge};
pub use config::{RenderOptions, UnknownBlockPolicy};
pub use context::{Post, RenderContext, current_post, set_current_post};
pub use error::*;
pub use parse::{ParseResult, parse, parse_blocks};
pub use registry::{
    AttributeSchema, AttributeType, BlockType, BlockTypeSettings, Registry, RenderValue,
    is_block_type_registered, register_block_type, unregister_block_type,
};
pub use render::{BlockInstance, RenderHooks, Renderer};
pub use tokenizer::{has_blocks, tokenize};
pub use types::*;

/// Render a document with the global registry and default options.
///
/// The render context starts from the ambient current post, and the ambient
/// slot holds the same value afterwards.
///
/// The pass renders from a copy of the registry taken when it starts, and
/// the lock is released before any block renders. Callbacks may register
/// or unregister block types; the changes apply from the next call on.
pub fn render_document(content: &str) -> String {
    let registry = Registry::global()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();
    let mut ctx = RenderContext::from_ambient();
    Renderer::new(&registry).render_document(content, &mut ctx)
}

impl ParseResult {
    /// Render the parsed blocks with `renderer`.
    pub fn render(&self, renderer: &Renderer<'_>, ctx: &mut RenderContext) -> String {
        renderer.render_nodes(&self.blocks, ctx)
    }

    /// Tree view of the parsed blocks for terminal output.
    #[cfg(feature = "terminal")]
    pub fn to_tree(&self) -> String {
        render_term::to_tree(&self.blocks)
    }
}
