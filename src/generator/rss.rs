//! Per-blog RSS feed generation.
//!
//! The feed is template-driven: the site's `rss` template is rendered
//! against the blog's merged context, so the site controls channel
//! metadata and item markup entirely. The generator only contributes a
//! `current-time` build timestamp.

use crate::context::Context as RenderContext;
use crate::log;
use crate::render::Renderer;
use anyhow::{Context, Result};
use chrono::Local;
use std::fs;
use std::path::Path;

/// Render a blog's feed and write it next to the blog's index page.
///
/// The filename comes from the blog's resolved `rss-url` key.
pub fn write_feed(renderer: &Renderer, blog_dir: &Path, ctx: &RenderContext) -> Result<()> {
    let ctx = feed_context(ctx);
    let feed = renderer.render_role("rss", &ctx)?;

    let name = ctx.get_str("rss-url").unwrap_or("rss.xml");
    let path = blog_dir.join(name);
    fs::write(&path, feed).with_context(|| format!("Failed to write feed to {}", path.display()))?;

    log!("rss"; "{}", path.display());
    Ok(())
}

/// Extend a blog context with the build timestamp under `current-time`,
/// in the local timezone, RFC 2822 format.
fn feed_context(ctx: &RenderContext) -> RenderContext {
    let mut ctx = ctx.clone();
    ctx.set_str("current-time", Local::now().to_rfc2822());
    ctx
}

// ============================================================================
// Tests
// ============================================================================
