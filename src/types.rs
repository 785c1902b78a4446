//! Core data types: tokens, parsed blocks and the serialized parse-tree shape.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Block attributes, decoded from the JSON object in an opening delimiter.
///
/// Keys keep the order in which they appear in the document.
pub type Attributes = Map<String, Value>;

/// Byte range of a token or block in the source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    /// Span for nodes that were not read from source text.
    pub const SYNTHETIC: Span = Span { start: 0, end: 0 };

    /// A span over `start..end`.
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// A lexical unit of a block-annotated document.
#[derive(Debug, Clone, PartialEq)]
pub enum Token<'a> {
    /// Text outside of any delimiter, passed through verbatim.
    Literal { text: &'a str, span: Span },
    /// `<!-- wp:name {attrs} -->`
    Opener {
        name: String,
        attrs: Attributes,
        raw_attrs: Option<&'a str>,
        span: Span,
    },
    /// `<!-- /wp:name -->`
    Closer { name: String, span: Span },
    /// `<!-- wp:name {attrs} /-->`
    Void {
        name: String,
        attrs: Attributes,
        raw_attrs: Option<&'a str>,
        span: Span,
    },
}

impl Token<'_> {
    /// Source location of the token.
    pub fn span(&self) -> Span {
        match self {
            Token::Literal { span, .. }
            | Token::Opener { span, .. }
            | Token::Closer { span, .. }
            | Token::Void { span, .. } => *span,
        }
    }

    /// The fully-qualified block name, or `None` for literal text.
    pub fn name(&self) -> Option<&str> {
        match self {
            Token::Literal { .. } => None,
            Token::Opener { name, .. } | Token::Closer { name, .. } | Token::Void { name, .. } => {
                Some(name)
            }
        }
    }
}

/// A block reconstructed from its delimiters.
///
/// `inner_html` always holds exactly one more fragment than `inner_blocks`:
/// fragment `i` precedes inner block `i`, and the last fragment trails the
/// final inner block.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedBlock {
    pub name: String,
    pub attrs: Attributes,
    pub inner_blocks: Vec<ParsedBlock>,
    pub inner_html: Vec<String>,
    pub span: Span,
}

impl ParsedBlock {
    /// A block with no attributes and no content.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Attributes::new(),
            inner_blocks: Vec::new(),
            inner_html: vec![String::new()],
            span: Span::SYNTHETIC,
        }
    }

    /// Replace the attributes.
    pub fn with_attrs(mut self, attrs: Attributes) -> Self {
        self.attrs = attrs;
        self
    }

    /// Append literal HTML to the current (last) fragment.
    pub fn push_html(&mut self, html: &str) {
        match self.inner_html.last_mut() {
            Some(last) => last.push_str(html),
            None => self.inner_html.push(html.to_string()),
        }
    }

    /// Append a nested block and open a fresh fragment after it.
    pub fn push_block(&mut self, block: ParsedBlock) {
        self.inner_blocks.push(block);
        self.inner_html.push(String::new());
    }

    /// All literal fragments joined, without nested block content.
    pub fn inner_html_string(&self) -> String {
        self.inner_html.concat()
    }
}

/// One element of a parsed document.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Literal HTML outside of any block.
    Freeform { html: String, span: Span },
    Block(ParsedBlock),
}

impl Node {
    /// Block name, or `None` for freeform text.
    pub fn name(&self) -> Option<&str> {
        match self {
            Node::Freeform { .. } => None,
            Node::Block(block) => Some(&block.name),
        }
    }

    /// The block, unless this is freeform text.
    pub fn as_block(&self) -> Option<&ParsedBlock> {
        match self {
            Node::Block(block) => Some(block),
            Node::Freeform { .. } => None,
        }
    }

    /// Source location of the node.
    pub fn span(&self) -> Span {
        match self {
            Node::Freeform { span, .. } => *span,
            Node::Block(block) => block.span,
        }
    }
}

// ------------------------------------------------------------------
// Serialized parse-tree shape
// ------------------------------------------------------------------

/// The JSON shape of a parsed block, as consumed by editors and fixtures.
///
/// `inner_content` mirrors `inner_html` fragments with `null` standing in
/// for each nested block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockRecord {
    pub block_name: Option<String>,
    pub attrs: Attributes,
    pub inner_blocks: Vec<BlockRecord>,
    #[serde(rename = "innerHTML")]
    pub inner_html: String,
    pub inner_content: Vec<Option<String>>,
}

impl From<&ParsedBlock> for BlockRecord {
    fn from(block: &ParsedBlock) -> Self {
        let mut inner_content = Vec::with_capacity(block.inner_html.len() * 2);
        for (i, fragment) in block.inner_html.iter().enumerate() {
            if !fragment.is_empty() {
                inner_content.push(Some(fragment.clone()));
            }
            if i < block.inner_blocks.len() {
                inner_content.push(None);
            }
        }

        BlockRecord {
            block_name: Some(block.name.clone()),
            attrs: block.attrs.clone(),
            inner_blocks: block.inner_blocks.iter().map(BlockRecord::from).collect(),
            inner_html: block.inner_html_string(),
            inner_content,
        }
    }
}

impl From<&Node> for BlockRecord {
    fn from(node: &Node) -> Self {
        match node {
            Node::Block(block) => BlockRecord::from(block),
            Node::Freeform { html, .. } => BlockRecord {
                block_name: None,
                attrs: Attributes::new(),
                inner_blocks: Vec::new(),
                inner_html: html.clone(),
                inner_content: vec![Some(html.clone())],
            },
        }
    }
}

impl Serialize for Node {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        BlockRecord::from(self).serialize(serializer)
    }
}

impl Serialize for ParsedBlock {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        BlockRecord::from(self).serialize(serializer)
    }
}
