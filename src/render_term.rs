//! Colored tree view of a parsed document, for debugging.
//!
//! ```text
//! core/columns {"cols":2}
//! ├─ html "<div>"
//! ├─ core/column
//! │  └─ html "<p>A</p>"
//! └─ html "</div>"
//! ```

use colored::Colorize;

use crate::types::{Node, ParsedBlock};

/// Longest literal preview before truncation.
const PREVIEW_CHARS: usize = 40;

/// Render the node sequence as an indented tree.
pub fn to_tree(nodes: &[Node]) -> String {
    let mut out = String::new();
    for node in nodes {
        match node {
            Node::Freeform { html, .. } => {
                out.push_str(&format!("{} {}\n", "freeform".dimmed(), preview(html)));
            }
            Node::Block(block) => write_block(&mut out, block, ""),
        }
    }
    out
}

fn write_block(out: &mut String, block: &ParsedBlock, indent: &str) {
    out.push_str(&block_label(block));
    out.push('\n');

    // Fragments and inner blocks, in document order, skipping empty fragments.
    let mut children: Vec<Child<'_>> = Vec::new();
    for (i, fragment) in block.inner_html.iter().enumerate() {
        if !fragment.is_empty() {
            children.push(Child::Html(fragment));
        }
        if let Some(inner) = block.inner_blocks.get(i) {
            children.push(Child::Block(inner));
        }
    }

    let count = children.len();
    for (i, child) in children.into_iter().enumerate() {
        let last = i + 1 == count;
        let (branch, next_indent) = if last {
            ("└─ ", format!("{indent}   "))
        } else {
            ("├─ ", format!("{indent}│  "))
        };
        out.push_str(indent);
        out.push_str(branch);
        match child {
            Child::Html(html) => {
                out.push_str(&format!("{} {}\n", "html".dimmed(), preview(html)));
            }
            Child::Block(inner) => write_block(out, inner, &next_indent),
        }
    }
}

enum Child<'a> {
    Html(&'a str),
    Block(&'a ParsedBlock),
}

fn block_label(block: &ParsedBlock) -> String {
    let name = block.name.bold().cyan().to_string();
    if block.attrs.is_empty() {
        return name;
    }
    let attrs = serde_json::to_string(&block.attrs).unwrap_or_default();
    format!("{name} {}", attrs.yellow())
}

/// Debug-quoted literal, shortened to [`PREVIEW_CHARS`].
fn preview(html: &str) -> String {
    if html.chars().count() <= PREVIEW_CHARS {
        return format!("{html:?}");
    }
    let short: String = html.chars().take(PREVIEW_CHARS).collect();
    format!("{short:?}…")
}
