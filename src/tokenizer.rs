//! Single-pass tokenizer for block delimiters.
//!
//! Splits a document into literal text and block delimiter comments:
//!
//! ```text
//! <!-- wp:namespace/name {"json":"attrs"} -->   opener
//! <!-- /wp:namespace/name -->                   closer
//! <!-- wp:namespace/name {"json":"attrs"} /-->  void
//! ```
//!
//! The namespace is optional and defaults to `core`. Anything that does not
//! match the delimiter grammar exactly is literal text.

use log::{trace, warn};

use crate::error::{Diagnostic, ParseIssue};
use crate::types::{Attributes, Span, Token};

const COMMENT_OPEN: &str = "<!--";
const DEFAULT_NAMESPACE: &str = "core";

/// Returns `true` if the text contains at least one block opener prefix.
///
/// This is a cheap check; it does not validate the delimiter.
pub fn has_blocks(text: &str) -> bool {
    text.contains("<!-- wp:")
}

/// Tokenize a whole document.
pub fn tokenize(document: &str) -> (Vec<Token<'_>>, Vec<Diagnostic>) {
    let mut tokenizer = Tokenizer::new(document);
    let tokens: Vec<Token<'_>> = tokenizer.by_ref().collect();
    (tokens, tokenizer.into_diagnostics())
}

/// Streaming tokenizer over a borrowed document.
///
/// Literal runs are emitted as one token each, up to the next real
/// delimiter. Malformed attribute JSON is recorded as a diagnostic and the
/// token carries empty attributes.
pub struct Tokenizer<'a> {
    document: &'a str,
    pos: usize,
    pending: Option<Token<'a>>,
    diagnostics: Vec<Diagnostic>,
    /// No attribute object opening at or after this offset has a terminator.
    attrs_unterminated_from: usize,
}

/// A delimiter located in the source, before attribute decoding.
struct Delimiter<'a> {
    closer: bool,
    void: bool,
    name: String,
    raw_attrs: Option<&'a str>,
    span: Span,
}

impl<'a> Tokenizer<'a> {
    /// Start tokenizing `document` from its first byte.
    pub fn new(document: &'a str) -> Self {
        Self {
            document,
            pos: 0,
            pending: None,
            diagnostics: Vec::new(),
            attrs_unterminated_from: usize::MAX,
        }
    }

    /// Diagnostics recorded so far.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Consume the tokenizer, returning every diagnostic it recorded.
    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    fn literal(&self, start: usize, end: usize) -> Token<'a> {
        Token::Literal {
            text: &self.document[start..end],
            span: Span::new(start, end),
        }
    }

    fn build(&mut self, delim: Delimiter<'a>) -> Token<'a> {
        let Delimiter {
            closer,
            void,
            name,
            raw_attrs,
            span,
        } = delim;

        // A closer that also carries a void marker is read as void.
        if closer && !void {
            return Token::Closer { name, span };
        }

        let attrs = match raw_attrs {
            Some(raw) => self.decode_attrs(&name, raw, span),
            None => Attributes::new(),
        };

        if void {
            Token::Void {
                name,
                attrs,
                raw_attrs,
                span,
            }
        } else {
            Token::Opener {
                name,
                attrs,
                raw_attrs,
                span,
            }
        }
    }

    fn decode_attrs(&mut self, name: &str, raw: &str, span: Span) -> Attributes {
        match serde_json::from_str::<Attributes>(raw) {
            Ok(attrs) => attrs,
            Err(err) => {
                warn!("ignoring malformed attributes on {name}: {err}");
                self.diagnostics.push(Diagnostic::new(
                    ParseIssue::MalformedAttributes {
                        name: name.to_string(),
                        reason: err.to_string(),
                    },
                    span,
                ));
                Attributes::new()
            }
        }
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        if let Some(token) = self.pending.take() {
            trace!("token {token:?}");
            return Some(token);
        }

        let len = self.document.len();
        if self.pos >= len {
            return None;
        }

        let start = self.pos;
        let mut search = start;
        loop {
            let Some(rel) = self.document[search..].find(COMMENT_OPEN) else {
                self.pos = len;
                return Some(self.literal(start, len));
            };
            let at = search + rel;

            if let Some(delim) =
                match_delimiter(self.document, at, &mut self.attrs_unterminated_from)
            {
                self.pos = delim.span.end;
                let token = self.build(delim);
                if at > start {
                    self.pending = Some(token);
                    return Some(self.literal(start, at));
                }
                trace!("token {token:?}");
                return Some(token);
            }

            search = at + COMMENT_OPEN.len();
        }
    }
}

// ------------------------------------------------------------------
// Delimiter grammar
// ------------------------------------------------------------------

/// Try to read a block delimiter starting at `at` (which points at `<!--`).
///
/// `unterminated_from` carries the lowest offset from which an attribute
/// scan already failed. Any later `{` past it cannot be terminated either,
/// so it is rejected without scanning again and the whole pass stays linear.
fn match_delimiter<'d>(
    doc: &'d str,
    at: usize,
    unterminated_from: &mut usize,
) -> Option<Delimiter<'d>> {
    let bytes = doc.as_bytes();
    let mut i = at + COMMENT_OPEN.len();

    i = skip_required_ws(bytes, i)?;

    let closer = bytes.get(i) == Some(&b'/');
    if closer {
        i += 1;
    }

    if !bytes[i..].starts_with(b"wp:") {
        return None;
    }
    i += 3;

    let first_end = scan_ident(bytes, i)?;
    let name = if bytes.get(first_end) == Some(&b'/') {
        let second_end = scan_ident(bytes, first_end + 1)?;
        let name = doc[i..second_end].to_string();
        i = second_end;
        name
    } else {
        let name = format!("{DEFAULT_NAMESPACE}/{}", &doc[i..first_end]);
        i = first_end;
        name
    };

    i = skip_required_ws(bytes, i)?;

    let mut raw_attrs = None;
    if bytes.get(i) == Some(&b'{') {
        if i >= *unterminated_from {
            return None;
        }
        let Some(close) = find_attrs_end(bytes, i) else {
            *unterminated_from = i;
            return None;
        };
        raw_attrs = Some(&doc[i..=close]);
        i = skip_required_ws(bytes, close + 1)?;
    }

    let void = bytes.get(i) == Some(&b'/');
    if void {
        i += 1;
    }

    if !bytes[i..].starts_with(b"-->") {
        return None;
    }

    Some(Delimiter {
        closer,
        void,
        name,
        raw_attrs,
        span: Span::new(at, i + 3),
    })
}

/// Matches `[a-z][a-z0-9_-]*` and returns the end index.
fn scan_ident(bytes: &[u8], start: usize) -> Option<usize> {
    match bytes.get(start) {
        Some(b) if b.is_ascii_lowercase() => {}
        _ => return None,
    }
    let mut end = start + 1;
    while let Some(&b) = bytes.get(end) {
        if b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_' || b == b'-' {
            end += 1;
        } else {
            break;
        }
    }
    Some(end)
}

fn is_ws(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | 0x0B | 0x0C)
}

fn skip_ws(bytes: &[u8], mut i: usize) -> usize {
    while bytes.get(i).is_some_and(|&b| is_ws(b)) {
        i += 1;
    }
    i
}

/// Skips one or more whitespace bytes; `None` if there is none at `i`.
fn skip_required_ws(bytes: &[u8], i: usize) -> Option<usize> {
    let end = skip_ws(bytes, i);
    (end > i).then_some(end)
}

/// Find the `}` that ends an attribute object opened at `open`.
///
/// The object ends at the first `}` followed by whitespace and then `-->`
/// or `/-->`; braces inside JSON strings are not special.
fn find_attrs_end(bytes: &[u8], open: usize) -> Option<usize> {
    let mut j = open + 1;
    while j < bytes.len() {
        if bytes[j] == b'}' && closes_delimiter(bytes, j + 1) {
            return Some(j);
        }
        j += 1;
    }
    None
}

fn closes_delimiter(bytes: &[u8], i: usize) -> bool {
    let Some(k) = skip_required_ws(bytes, i) else {
        return false;
    };
    let rest = &bytes[k..];
    rest.starts_with(b"-->") || rest.starts_with(b"/-->")
}
