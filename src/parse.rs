//! Block tree builder.
//!
//! Consumes the token stream and assembles the top-level sequence of
//! [`Node`]s. Building never fails: mismatched, stray and unclosed
//! delimiters are repaired and reported as diagnostics.

use log::warn;

use crate::error::{Diagnostic, ParseIssue};
use crate::tokenizer::Tokenizer;
use crate::types::{Node, ParsedBlock, Span, Token};

/// Output of [`parse`]: the block sequence plus any recovered anomalies.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseResult {
    pub blocks: Vec<Node>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Parse a document into its top-level nodes, collecting diagnostics.
pub fn parse(document: &str) -> ParseResult {
    let mut tokenizer = Tokenizer::new(document);
    let mut builder = TreeBuilder::new(document);
    for token in tokenizer.by_ref() {
        builder.push(token);
    }

    let (blocks, mut diagnostics) = builder.finish();
    let mut all = tokenizer.into_diagnostics();
    all.append(&mut diagnostics);
    all.sort_by_key(|d| d.span.start);

    ParseResult {
        blocks,
        diagnostics: all,
    }
}

/// Parse a document into its top-level nodes.
pub fn parse_blocks(document: &str) -> Vec<Node> {
    parse(document).blocks
}

/// Stack-based assembler turning tokens into a block forest.
pub struct TreeBuilder<'a> {
    document: &'a str,
    output: Vec<Node>,
    /// Open blocks waiting for their closers, innermost last.
    stack: Vec<ParsedBlock>,
    /// Literal text at the top level not yet flushed into a freeform node.
    freeform: Option<(String, Span)>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> TreeBuilder<'a> {
    /// A builder for tokens read from `document`.
    pub fn new(document: &'a str) -> Self {
        Self {
            document,
            output: Vec::new(),
            stack: Vec::new(),
            freeform: None,
            diagnostics: Vec::new(),
        }
    }

    /// Feed one token.
    pub fn push(&mut self, token: Token<'_>) {
        match token {
            Token::Literal { text, span } => self.push_literal(text, span),
            Token::Void {
                name, attrs, span, ..
            } => {
                let block = ParsedBlock {
                    span,
                    ..ParsedBlock::new(name).with_attrs(attrs)
                };
                self.attach(block);
            }
            Token::Opener {
                name, attrs, span, ..
            } => {
                self.flush_freeform();
                let block = ParsedBlock {
                    span,
                    ..ParsedBlock::new(name).with_attrs(attrs)
                };
                self.stack.push(block);
            }
            Token::Closer { name, span } => self.close(name, span),
        }
    }

    /// Close any open blocks and return the finished forest.
    pub fn finish(mut self) -> (Vec<Node>, Vec<Diagnostic>) {
        let end = self.document.len();
        while let Some(mut block) = self.stack.pop() {
            warn!("force-closing unclosed block {}", block.name);
            self.diagnostics.push(Diagnostic::new(
                ParseIssue::UnclosedBlock {
                    name: block.name.clone(),
                },
                block.span,
            ));
            block.span.end = end;
            self.attach(block);
        }
        self.flush_freeform();
        (self.output, self.diagnostics)
    }

    fn push_literal(&mut self, text: &str, span: Span) {
        if let Some(open) = self.stack.last_mut() {
            open.push_html(text);
            return;
        }
        match &mut self.freeform {
            Some((html, existing)) => {
                html.push_str(text);
                existing.end = span.end;
            }
            None => self.freeform = Some((text.to_string(), span)),
        }
    }

    fn close(&mut self, name: String, span: Span) {
        let Some(mut block) = self.stack.pop() else {
            // Nothing to close: keep the delimiter as literal text.
            warn!("stray closing delimiter for {name}");
            self.diagnostics
                .push(Diagnostic::new(ParseIssue::StrayCloser { name: name.clone() }, span));
            let source = self.document;
            self.push_literal(&source[span.start..span.end], span);
            return;
        };

        if block.name != name {
            warn!("closer for {name} closes {}", block.name);
            self.diagnostics.push(Diagnostic::new(
                ParseIssue::MismatchedCloser {
                    expected: block.name.clone(),
                    found: name,
                },
                span,
            ));
        }
        block.span.end = span.end;
        self.attach(block);
    }

    /// Add a completed block to the innermost open frame, or to the output.
    fn attach(&mut self, block: ParsedBlock) {
        match self.stack.last_mut() {
            Some(parent) => parent.push_block(block),
            None => {
                self.flush_freeform();
                self.output.push(Node::Block(block));
            }
        }
    }

    fn flush_freeform(&mut self) {
        if let Some((html, span)) = self.freeform.take()
            && !html.is_empty()
        {
            self.output.push(Node::Freeform { html, span });
        }
    }
}
