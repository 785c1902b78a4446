//! Render context and the ambient "current post" slot.
//!
//! Callbacks receive an explicit [`RenderContext`]. Callbacks written against
//! the older implicit model read and write a process-wide slot instead
//! ([`current_post`] / [`set_current_post`]); the renderer snapshots that slot
//! around every callback with an [`AmbientSnapshot`] so nothing a callback
//! does to it leaks into sibling blocks or back to the caller.

use std::ops::{Deref, DerefMut};
use std::sync::{PoisonError, RwLock};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Publication state of a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Draft,
    #[default]
    Publish,
    Future,
    Pending,
    Private,
}

/// The subset of a CMS post that block callbacks read.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Post {
    pub id: u64,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub status: PostStatus,
}

impl Post {
    /// A published post with the given id and title.
    pub fn new(id: u64, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            ..Self::default()
        }
    }
}

/// State threaded through one render pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderContext {
    /// The post being rendered, if any.
    pub post: Option<Post>,
    depth: usize,
}

impl RenderContext {
    /// An empty context with no current post.
    pub fn new() -> Self {
        Self::default()
    }

    /// A context rendering `post`.
    pub fn with_post(post: Post) -> Self {
        Self {
            post: Some(post),
            depth: 0,
        }
    }

    /// A context seeded from the ambient slot.
    pub fn from_ambient() -> Self {
        Self {
            post: current_post(),
            depth: 0,
        }
    }

    /// Current block nesting depth.
    pub fn depth(&self) -> usize {
        self.depth
    }

    fn enter(&mut self) {
        self.depth += 1;
    }

    fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }
}

/// One level of block nesting over a [`RenderContext`].
///
/// Entering raises the depth. Dropping the scope lowers it again and puts
/// back any post saved with [`BlockScope::save_post`], also when a render
/// callback unwinds.
pub(crate) struct BlockScope<'c> {
    ctx: &'c mut RenderContext,
    saved_post: Option<Option<Post>>,
}

impl<'c> BlockScope<'c> {
    pub(crate) fn enter(ctx: &'c mut RenderContext) -> Self {
        ctx.enter();
        Self {
            ctx,
            saved_post: None,
        }
    }

    /// Remember the current post so it is restored when the scope ends.
    pub(crate) fn save_post(&mut self) {
        self.saved_post = Some(self.ctx.post.clone());
    }

    /// Put back the post saved by [`BlockScope::save_post`], if any.
    pub(crate) fn restore_post(&mut self) {
        if let Some(post) = self.saved_post.take() {
            self.ctx.post = post;
        }
    }
}

impl Deref for BlockScope<'_> {
    type Target = RenderContext;

    fn deref(&self) -> &RenderContext {
        self.ctx
    }
}

impl DerefMut for BlockScope<'_> {
    fn deref_mut(&mut self) -> &mut RenderContext {
        self.ctx
    }
}

impl Drop for BlockScope<'_> {
    fn drop(&mut self) {
        self.restore_post();
        self.ctx.leave();
    }
}

// ------------------------------------------------------------------
// Ambient slot
// ------------------------------------------------------------------

static CURRENT_POST: Lazy<RwLock<Option<Post>>> = Lazy::new(|| RwLock::new(None));

/// The process-wide current post.
pub fn current_post() -> Option<Post> {
    CURRENT_POST
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// Replace the process-wide current post, returning the previous value.
pub fn set_current_post(post: Option<Post>) -> Option<Post> {
    let mut slot = CURRENT_POST.write().unwrap_or_else(PoisonError::into_inner);
    std::mem::replace(&mut *slot, post)
}

/// Restores the ambient slot to its captured value when dropped.
#[must_use = "the ambient slot is restored when the snapshot is dropped"]
pub struct AmbientSnapshot {
    saved: Option<Option<Post>>,
}

impl AmbientSnapshot {
    /// Record the current value of the ambient slot.
    pub fn capture() -> Self {
        Self {
            saved: Some(current_post()),
        }
    }

    /// The value that will be restored.
    pub fn saved(&self) -> Option<&Post> {
        self.saved.as_ref().and_then(Option::as_ref)
    }
}

impl Drop for AmbientSnapshot {
    fn drop(&mut self) {
        if let Some(saved) = self.saved.take() {
            set_current_post(saved);
        }
    }
}
