//! Minimal mustache template engine.
//!
//! Covers the subset the seven template roles rely on: variable substitution
//! and section iteration. Missing keys render as empty, sections iterate
//! ordered sequences of mappings, and nothing here knows anything about the
//! content tree.
//!
//! Supported tags:
//!
//! | Tag              | Meaning                                       |
//! |------------------|-----------------------------------------------|
//! | `{{key}}`        | HTML-escaped substitution                     |
//! | `{{{key}}}`      | raw substitution (also `{{& key}}`)           |
//! | `{{#key}}...{{/key}}` | section: string/true renders once, list iterates |
//! | `{{^key}}...{{/key}}` | inverted section: renders when falsy/absent |
//! | `{{! ...}}`      | comment                                       |

use crate::context::{Context, Value};
use anyhow::{Context as _, Result, bail};
use std::mem;

// ============================================================================
// Public API
// ============================================================================

/// Render a template string against a context.
///
/// # Errors
/// Returns error on malformed templates: an unterminated tag, an unclosed
/// section or a close tag that does not match its open.
pub fn render(template: &str, ctx: &Context) -> Result<String> {
    let nodes = parse(template)?;
    let mut out = String::with_capacity(template.len());
    render_nodes(&nodes, ctx, &mut out);
    Ok(out)
}

// ============================================================================
// Parsing
// ============================================================================

#[derive(Debug)]
enum Node<'a> {
    Text(&'a str),
    Var {
        name: &'a str,
        escape: bool,
    },
    Section {
        name: &'a str,
        inverted: bool,
        children: Vec<Node<'a>>,
    },
}

/// Parse a template into a node tree.
///
/// Linear scan for `{{`/`}}` delimiters; sections are matched with an
/// explicit open stack so nesting and mismatches are caught here rather
/// than surfacing as garbled output.
fn parse(template: &str) -> Result<Vec<Node<'_>>> {
    let mut stack: Vec<(&str, bool, Vec<Node>)> = Vec::new();
    let mut current: Vec<Node> = Vec::new();
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        if start > 0 {
            current.push(Node::Text(&rest[..start]));
        }
        let after = &rest[start + 2..];

        if let Some(inner) = after.strip_prefix('{') {
            // {{{key}}} raw substitution
            let end = inner.find("}}}").context("Unterminated raw tag")?;
            current.push(Node::Var {
                name: inner[..end].trim(),
                escape: false,
            });
            rest = &inner[end + 3..];
            continue;
        }

        let end = after.find("}}").context("Unterminated tag")?;
        let tag = after[..end].trim();
        rest = &after[end + 2..];

        match tag.as_bytes().first() {
            Some(b'#') => {
                stack.push((tag[1..].trim(), false, mem::take(&mut current)));
            }
            Some(b'^') => {
                stack.push((tag[1..].trim(), true, mem::take(&mut current)));
            }
            Some(b'/') => {
                let close = tag[1..].trim();
                let Some((name, inverted, parent)) = stack.pop() else {
                    bail!("Unexpected closing tag for section `{close}`");
                };
                if name != close {
                    bail!("Section `{name}` closed by `{close}`");
                }
                let children = mem::replace(&mut current, parent);
                current.push(Node::Section {
                    name,
                    inverted,
                    children,
                });
            }
            Some(b'!') => {} // comment
            Some(b'&') => current.push(Node::Var {
                name: tag[1..].trim(),
                escape: false,
            }),
            _ => current.push(Node::Var {
                name: tag,
                escape: true,
            }),
        }
    }

    if let Some((name, _, _)) = stack.last() {
        bail!("Unclosed section `{name}`");
    }
    if !rest.is_empty() {
        current.push(Node::Text(rest));
    }
    Ok(current)
}

// ============================================================================
// Rendering
// ============================================================================

fn render_nodes(nodes: &[Node], ctx: &Context, out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Var { name, escape } => {
                if let Some(value) = ctx.get(name) {
                    let text = value.as_text();
                    if *escape {
                        push_escaped(text, out);
                    } else {
                        out.push_str(text);
                    }
                }
            }
            Node::Section {
                name,
                inverted,
                children,
            } => {
                let value = ctx.get(name);
                let truthy = value.is_some_and(Value::is_truthy);

                if *inverted {
                    if !truthy {
                        render_nodes(children, ctx, out);
                    }
                } else if truthy {
                    match value {
                        Some(Value::List(items)) => {
                            // Each item is layered over the enclosing scope
                            for item in items {
                                let scope = ctx.merged(item);
                                render_nodes(children, &scope, out);
                            }
                        }
                        _ => render_nodes(children, ctx, out),
                    }
                }
            }
        }
    }
}

/// Escape special HTML characters.
fn push_escaped(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
