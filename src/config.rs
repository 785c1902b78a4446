//! Renderer configuration.
//!
//! Options can be built in code or loaded from YAML:
//!
//! ```
//! use wp_blocks::config::{RenderOptions, UnknownBlockPolicy};
//!
//! let opts = RenderOptions::from_yaml_str("unknown_blocks: passthrough\n").unwrap();
//! assert_eq!(opts.unknown_blocks, UnknownBlockPolicy::Passthrough);
//! assert_eq!(opts.max_depth, 64);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// What to emit for a block whose name is not registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownBlockPolicy {
    /// Render nothing, including nested blocks.
    #[default]
    Drop,
    /// Render the block's inner content as if it were a static type.
    Passthrough,
}

/// Options controlling a [`Renderer`](crate::render::Renderer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Handling of unregistered block names (default: drop).
    pub unknown_blocks: UnknownBlockPolicy,
    /// Maximum block nesting depth (default: 64).
    ///
    /// Every level counts: blocks nested in the parsed document as well as
    /// nested document renders started from callbacks. A block deeper than
    /// this renders empty together with everything inside it, so deeply
    /// nested static content is dropped too.
    pub max_depth: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            unknown_blocks: UnknownBlockPolicy::Drop,
            max_depth: 64,
        }
    }
}

impl RenderOptions {
    /// Default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the policy for unregistered block names.
    pub fn unknown_blocks(mut self, policy: UnknownBlockPolicy) -> Self {
        self.unknown_blocks = policy;
        self
    }

    /// Set the maximum nesting depth.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Load options from a YAML document. Missing keys keep their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }
}
