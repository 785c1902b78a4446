//! Block renderer.
//!
//! Walks parsed nodes in document order and produces the final markup:
//!
//! - freeform nodes pass through unchanged;
//! - unregistered blocks render nothing (see [`UnknownBlockPolicy`]);
//! - static blocks render their inner content with nested blocks spliced in
//!   and the delimiters removed;
//! - dynamic blocks render whatever their callback returns.
//!
//! Each callback runs to completion, and the render context and ambient post
//! slot are restored, before the next block is rendered.

use log::{debug, warn};

use crate::config::{RenderOptions, UnknownBlockPolicy};
use crate::context::{AmbientSnapshot, BlockScope, RenderContext};
use crate::parse::parse_blocks;
use crate::registry::Registry;
use crate::types::{Node, ParsedBlock};

/// Interface to an external filter system.
///
/// Both methods default to doing nothing.
pub trait RenderHooks {
    /// Return `Some` to replace a block's output without rendering it.
    fn pre_render(&self, _block: &ParsedBlock) -> Option<String> {
        None
    }

    /// Post-process a block's rendered output.
    fn post_render(&self, content: String, _block: &ParsedBlock) -> String {
        content
    }
}

/// The handle a render callback receives for the block being rendered.
pub struct BlockInstance<'a> {
    name: &'a str,
    block: Option<&'a ParsedBlock>,
    renderer: Option<&'a Renderer<'a>>,
    /// The render context; changes to `post` are undone after the callback.
    pub context: &'a mut RenderContext,
}

impl<'a> BlockInstance<'a> {
    /// An instance outside of a document render pass.
    pub fn detached(name: &'a str, context: &'a mut RenderContext) -> Self {
        Self {
            name,
            block: None,
            renderer: None,
            context,
        }
    }

    /// Full name of the block being rendered.
    pub fn name(&self) -> &str {
        self.name
    }

    /// The parsed block, when rendering from a document.
    pub fn block(&self) -> Option<&ParsedBlock> {
        self.block
    }

    /// Render another document with the same renderer and context.
    ///
    /// Returns `None` for a detached instance.
    pub fn render_nested(&mut self, document: &str) -> Option<String> {
        let renderer = self.renderer?;
        Some(renderer.render_document(document, self.context))
    }
}

/// Renders parsed blocks against a registry.
pub struct Renderer<'r> {
    registry: &'r Registry,
    options: RenderOptions,
    hooks: Option<&'r dyn RenderHooks>,
}

impl<'r> Renderer<'r> {
    /// A renderer over `registry` with default options and no hooks.
    pub fn new(registry: &'r Registry) -> Self {
        Self {
            registry,
            options: RenderOptions::default(),
            hooks: None,
        }
    }

    /// Replace the render options.
    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    /// Route every block through `hooks`.
    pub fn with_hooks(mut self, hooks: &'r dyn RenderHooks) -> Self {
        self.hooks = Some(hooks);
        self
    }

    /// The options in effect.
    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Parse and render a whole document.
    pub fn render_document(&self, document: &str, ctx: &mut RenderContext) -> String {
        self.render_nodes(&parse_blocks(document), ctx)
    }

    /// Render a node sequence, concatenating outputs in order.
    pub fn render_nodes(&self, nodes: &[Node], ctx: &mut RenderContext) -> String {
        let mut output = String::new();
        for node in nodes {
            output.push_str(&self.render_node(node, ctx));
        }
        output
    }

    /// Render one node: freeform text as is, blocks through [`Renderer::render_block`].
    pub fn render_node(&self, node: &Node, ctx: &mut RenderContext) -> String {
        match node {
            Node::Freeform { html, .. } => html.clone(),
            Node::Block(block) => self.render_block(block, ctx),
        }
    }

    /// Render one block and its inner blocks.
    pub fn render_block(&self, block: &ParsedBlock, ctx: &mut RenderContext) -> String {
        if ctx.depth() >= self.options.max_depth {
            warn!(
                "block {} exceeds maximum nesting depth {}; rendering nothing",
                block.name, self.options.max_depth
            );
            return String::new();
        }

        if let Some(output) = self.hooks.and_then(|hooks| hooks.pre_render(block)) {
            return output;
        }

        let block_type = self.registry.get_registered(&block.name);
        if block_type.is_none() && self.options.unknown_blocks == UnknownBlockPolicy::Drop {
            debug!("dropping unregistered block {}", block.name);
            return String::new();
        }

        let mut scope = BlockScope::enter(ctx);
        let content = self.render_inner(block, &mut scope);
        let output = match block_type {
            Some(block_type) if block_type.is_dynamic() => {
                debug!("rendering dynamic block {}", block.name);
                scope.save_post();
                let ambient = AmbientSnapshot::capture();
                let output = {
                    let mut instance = BlockInstance {
                        name: &block.name,
                        block: Some(block),
                        renderer: Some(self),
                        context: &mut scope,
                    };
                    block_type.render_with(&block.attrs, &content, &mut instance)
                };
                drop(ambient);
                scope.restore_post();
                output
            }
            _ => content,
        };
        drop(scope);

        match self.hooks {
            Some(hooks) => hooks.post_render(output, block),
            None => output,
        }
    }

    /// Interleave literal fragments with rendered inner blocks.
    fn render_inner(&self, block: &ParsedBlock, ctx: &mut RenderContext) -> String {
        let mut content = String::new();
        for (i, fragment) in block.inner_html.iter().enumerate() {
            content.push_str(fragment);
            if let Some(inner) = block.inner_blocks.get(i) {
                content.push_str(&self.render_block(inner, ctx));
            }
        }
        content
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Post;
    use crate::registry::BlockTypeSettings;
    use pretty_assertions::assert_eq;
    use serial_test::serial;
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn registry_with(name: &str, settings: BlockTypeSettings) -> Registry {
        let mut registry = Registry::with_core_blocks();
        registry.register(name, settings).unwrap();
        registry
    }

    fn render(registry: &Registry, doc: &str) -> String {
        Renderer::new(registry).render_document(doc, &mut RenderContext::new())
    }

    #[test]
    fn literal_text_is_unchanged() {
        let registry = Registry::new();
        let doc = "<p>No blocks <!-- comment --> here</p>\n";
        assert_eq!(render(&registry, doc), doc);
    }

    #[test]
    fn static_block_strips_delimiters() {
        let registry = Registry::with_core_blocks();
        let doc = "<!-- wp:paragraph -->\n<p>Hi</p>\n<!-- /wp:paragraph -->";
        assert_eq!(render(&registry, doc), "\n<p>Hi</p>\n");
    }

    #[test]
    fn static_void_block_renders_empty() {
        let registry = Registry::with_core_blocks();
        assert_eq!(render(&registry, "a<!-- wp:separator /-->b"), "ab");
    }

    #[test]
    fn unknown_block_renders_empty() {
        let registry = Registry::with_core_blocks();
        let doc = "x<!-- wp:my-plugin/gone --><p>hidden</p><!-- /wp:my-plugin/gone -->y";
        assert_eq!(render(&registry, doc), "xy");
    }

    #[test]
    fn unknown_block_passthrough_policy() {
        let registry = Registry::new();
        let renderer = Renderer::new(&registry)
            .with_options(RenderOptions::new().unknown_blocks(UnknownBlockPolicy::Passthrough));
        let doc = "<!-- wp:my-plugin/kept --><p>shown</p><!-- /wp:my-plugin/kept -->";
        assert_eq!(
            renderer.render_document(doc, &mut RenderContext::new()),
            "<p>shown</p>"
        );
    }

    #[test]
    fn nested_static_blocks_splice_in_place() {
        let registry = Registry::with_core_blocks();
        let doc = concat!(
            "<!-- wp:columns --><div>",
            "<!-- wp:column --><p>A</p><!-- /wp:column -->",
            "|",
            "<!-- wp:column --><p>B</p><!-- /wp:column -->",
            "</div><!-- /wp:columns -->"
        );
        assert_eq!(render(&registry, doc), "<div><p>A</p>|<p>B</p></div>");
    }

    #[test]
    #[serial]
    fn dynamic_callback_receives_inner_content() {
        let registry = registry_with(
            "core/test",
            BlockTypeSettings::new().render_callback(|attrs, content, _| {
                format!("[{}:{content}]", attrs["value"].as_str().unwrap_or(""))
            }),
        );
        let doc = r#"<!-- wp:core/test {"value":"v"} --><!-- wp:paragraph --><p>in</p><!-- /wp:paragraph --><!-- /wp:core/test -->"#;
        assert_eq!(render(&registry, doc), "[v:<p>in</p>]");
    }

    #[test]
    #[serial]
    fn dynamic_callbacks_run_in_document_order() {
        let counter = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&counter);
        let registry = registry_with(
            "core/test",
            BlockTypeSettings::new().render_callback(move |attrs, _, _| {
                let n = seen.fetch_add(1, Ordering::SeqCst) + 1;
                format!("{n}:{}", attrs["value"].as_str().unwrap_or(""))
            }),
        );
        let doc = concat!(
            r#"<!-- wp:core/test {"value":"outer"} -->"#,
            r#"<!-- wp:core/test {"value":"inner"} /-->"#,
            r#"<!-- /wp:core/test -->"#,
            r#"<!-- wp:core/test {"value":"last"} /-->"#,
        );
        // Inner blocks render before the block that contains them.
        assert_eq!(render(&registry, doc), "2:outer3:last");
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn unknown_parent_skips_inner_callbacks() {
        let counter = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&counter);
        let registry = registry_with(
            "core/test",
            BlockTypeSettings::new().render_callback(move |_, _, _| {
                seen.fetch_add(1, Ordering::SeqCst);
                "x"
            }),
        );
        let doc = "<!-- wp:my-plugin/unknown --><!-- wp:core/test /--><!-- /wp:my-plugin/unknown -->";
        assert_eq!(render(&registry, doc), "");
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    #[serial]
    fn context_post_restored_after_callback() {
        let registry = registry_with(
            "core/test",
            BlockTypeSettings::new().render_callback(|_, _, block| {
                let title = block
                    .context
                    .post
                    .as_ref()
                    .map(|p| p.title.clone())
                    .unwrap_or_default();
                block.context.post = Some(Post::new(99, "Replaced"));
                title
            }),
        );
        let mut ctx = RenderContext::with_post(Post::new(1, "Original"));
        let out = Renderer::new(&registry)
            .render_document("<!-- wp:core/test /--><!-- wp:core/test /-->", &mut ctx);
        assert_eq!(out, "OriginalOriginal");
        assert_eq!(ctx.post, Some(Post::new(1, "Original")));
    }

    #[test]
    #[serial]
    fn context_restored_when_callback_panics() {
        let registry = registry_with(
            "core/test",
            BlockTypeSettings::new().render_callback(|_, _, block| -> String {
                block.context.post = Some(Post::new(99, "Leaked"));
                panic!("callback failed");
            }),
        );
        let renderer = Renderer::new(&registry);
        let mut ctx = RenderContext::with_post(Post::new(1, "Original"));

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            renderer.render_document(
                "<!-- wp:group --><!-- wp:core/test /--><!-- /wp:group -->",
                &mut ctx,
            )
        }));

        assert!(result.is_err());
        assert_eq!(ctx.post, Some(Post::new(1, "Original")));
        assert_eq!(ctx.depth(), 0);

        // The same context still renders at full depth afterwards.
        let out = renderer.render_document(
            "<!-- wp:group --><p>ok</p><!-- /wp:group -->",
            &mut ctx,
        );
        assert_eq!(out, "<p>ok</p>");
    }

    #[test]
    #[serial]
    fn callback_can_render_nested_documents() {
        let registry = registry_with(
            "core/test",
            BlockTypeSettings::new().render_callback(|_, _, block| {
                block
                    .render_nested("<!-- wp:paragraph --><p>nested</p><!-- /wp:paragraph -->")
                    .unwrap_or_default()
            }),
        );
        assert_eq!(render(&registry, "<!-- wp:core/test /-->"), "<p>nested</p>");
    }

    #[test]
    #[serial]
    fn runaway_nesting_is_cut_off() {
        let registry = registry_with(
            "core/test",
            BlockTypeSettings::new().render_callback(|_, _, block| {
                let inner = block.render_nested("<!-- wp:core/test /-->").unwrap_or_default();
                format!("({inner})")
            }),
        );
        let renderer = Renderer::new(&registry).with_options(RenderOptions::new().max_depth(3));
        let out = renderer.render_document("<!-- wp:core/test /-->", &mut RenderContext::new());
        assert_eq!(out, "((()))");
    }

    #[test]
    fn depth_limit_counts_static_nesting() {
        let registry = Registry::with_core_blocks();
        let doc = concat!(
            "<!-- wp:group -->a<!-- wp:group -->b<!-- wp:group -->c",
            "<!-- /wp:group --><!-- /wp:group --><!-- /wp:group -->"
        );

        let shallow = Renderer::new(&registry).with_options(RenderOptions::new().max_depth(2));
        assert_eq!(shallow.render_document(doc, &mut RenderContext::new()), "ab");
        assert_eq!(render(&registry, doc), "abc");
    }

    #[test]
    #[serial]
    fn instance_exposes_block() {
        let registry = registry_with(
            "core/test",
            BlockTypeSettings::new().render_callback(|_, _, block| {
                let inner = block.block().map_or(0, |b| b.inner_blocks.len());
                format!("{}:{inner}", block.name())
            }),
        );
        let doc = "<!-- wp:core/test --><!-- wp:separator /--><!-- /wp:core/test -->";
        assert_eq!(render(&registry, doc), "core/test:1");
    }

    struct Shout;

    impl RenderHooks for Shout {
        fn pre_render(&self, block: &ParsedBlock) -> Option<String> {
            (block.name == "core/html").then(|| "<!-- html removed -->".to_string())
        }

        fn post_render(&self, content: String, _block: &ParsedBlock) -> String {
            content.to_uppercase()
        }
    }

    #[test]
    fn hooks_wrap_rendering() {
        let registry = Registry::with_core_blocks();
        let hooks = Shout;
        let renderer = Renderer::new(&registry).with_hooks(&hooks);
        let doc = "<!-- wp:paragraph --><p>a</p><!-- /wp:paragraph --><!-- wp:html --><b>x</b><!-- /wp:html -->";
        assert_eq!(
            renderer.render_document(doc, &mut RenderContext::new()),
            "<P>A</P><!-- html removed -->"
        );
    }
}
