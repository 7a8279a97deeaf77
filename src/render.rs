//! Page rendering: converter invocation, three-stage template composition
//! and output placement.
//!
//! Every page goes through the same pipeline: convert the document body to
//! HTML with the external converter, render it into the role template
//! (`post` or `blog-index`), then wrap the result in header and footer and
//! hand all three to the container template. Page output always lands at
//! `<slug>/index.html` so URLs stay extensionless.

use crate::context::{Context as RenderContext, Value};
use crate::generator;
use crate::log;
use crate::site::{Blog, DEFAULT_CONVERTER, INDEX_DOC, Post, Site};
use crate::template;
use crate::{exec, utils};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

// ============================================================================
// Renderer
// ============================================================================

/// Walks a resolved [`Site`] and writes the output tree.
pub struct Renderer<'a> {
    site: &'a Site,
    /// Site context with the rendered navigation bound under `nav`.
    site_ctx: RenderContext,
    templates_dir: PathBuf,
    /// Converter command line, whitespace-split.
    converter: Vec<String>,
    copy_static: bool,
}

impl<'a> Renderer<'a> {
    /// Build a renderer, rendering the shared navigation fragment once.
    ///
    /// Navigation lists nested blogs first, then top-level posts, in
    /// discovery order.
    pub fn new(site: &'a Site, copy_static: bool) -> Result<Renderer<'a>> {
        let templates_dir = site.templates_dir();
        let converter = site
            .context
            .get_str("converter")
            .unwrap_or(DEFAULT_CONVERTER)
            .split_whitespace()
            .map(str::to_owned)
            .collect();

        let mut site_ctx = site.context.clone();
        let mut links = Vec::new();
        for blog in &site.blogs {
            links.push(nav_link(&blog.context));
        }
        for post in &site.top.posts {
            links.push(nav_link(&post.context));
        }
        site_ctx.set("nav-links", Value::List(links));

        let renderer = Renderer {
            site,
            site_ctx: RenderContext::new(),
            templates_dir,
            converter,
            copy_static,
        };
        let nav = renderer.render_role("nav", &site_ctx)?;
        site_ctx.set_str("nav", nav);

        Ok(Renderer {
            site_ctx,
            ..renderer
        })
    }

    /// Render the whole tree: nested blogs, top-level posts, then the site
    /// root index.
    pub fn render_site(&self) -> Result<()> {
        for blog in &self.site.blogs {
            self.render_blog(blog)?;
        }
        for post in &self.site.top.posts {
            self.render_post(post, &self.site.dest, &self.site_ctx)?;
        }
        self.render_root_index()?;
        if self.copy_static {
            self.copy_passthrough(&self.site.top.passthrough, &self.site.dest)?;
        }
        Ok(())
    }

    /// Render one blog: its index page, feed, posts and pass-through files.
    fn render_blog(&self, blog: &Blog) -> Result<()> {
        let mut ctx = self.site_ctx.merged(&blog.context);

        // The discovery-order posts list is rebuilt in display order right
        // before any template sees it.
        let sorted = blog.sorted_posts();
        ctx.set(
            "posts",
            Value::List(sorted.iter().map(|post| post.context.clone()).collect()),
        );

        let blog_dir = self.site.dest.join(blog.slug());
        fs::create_dir_all(&blog_dir)
            .with_context(|| format!("Failed to create {}", blog_dir.display()))?;

        let body = self.convert(&blog.src.join(INDEX_DOC))?;
        let html = self.compose_page("blog-index", body, &ctx)?;
        write_page(&blog_dir, &html)?;

        generator::rss::write_feed(self, &blog_dir, &ctx)?;

        for post in &blog.posts {
            self.render_post(post, &blog_dir, &ctx)?;
        }
        if self.copy_static {
            self.copy_passthrough(&blog.passthrough, &blog_dir)?;
        }
        Ok(())
    }

    /// Render one post into `parent/<slug>/index.html`.
    ///
    /// A post whose slug is literally `index` collapses into the parent
    /// directory, replacing its enclosing index page.
    fn render_post(&self, post: &Post, parent: &Path, parent_ctx: &RenderContext) -> Result<()> {
        let ctx = parent_ctx.merged(&post.context);
        let out_dir = match post.slug() {
            "index" => parent.to_path_buf(),
            slug => parent.join(slug),
        };
        fs::create_dir_all(&out_dir)
            .with_context(|| format!("Failed to create {}", out_dir.display()))?;

        let body = self.convert(&post.src)?;
        let html = self.compose_page("post", body, &ctx)?;
        write_page(&out_dir, &html)
    }

    /// Render the site root index page from the site context alone.
    fn render_root_index(&self) -> Result<()> {
        let body = self.convert(&self.site.src.join(INDEX_DOC))?;
        let html = self.compose_page("post", body, &self.site_ctx)?;
        write_page(&self.site.dest, &html)
    }

    /// Three-stage composition: body into the role template, the resulting
    /// page into header/footer, all three into the container.
    fn compose_page(
        &self,
        role: &str,
        body: Option<String>,
        ctx: &RenderContext,
    ) -> Result<String> {
        let mut ctx = ctx.clone();
        if let Some(body) = body {
            ctx.set_str("content", body);
        } else {
            ctx.remove("content");
        }
        let page = self.render_role(role, &ctx)?;

        ctx.set_str("content", page);
        let header = self.render_role("header", &ctx)?;
        let footer = self.render_role("footer", &ctx)?;
        ctx.set_str("header", header);
        ctx.set_str("footer", footer);
        self.render_role("container", &ctx)
    }

    /// Load a role's template file and render it against a context.
    ///
    /// The filename comes from the `<role>-template` context key, so a
    /// site can remap any role in `defaults.org`.
    pub fn render_role(&self, role: &str, ctx: &RenderContext) -> Result<String> {
        let key = format!("{role}-template");
        let default = format!("{role}.mustache");
        let file = ctx
            .get_str(&key)
            .or_else(|| self.site_ctx.get_str(&key))
            .unwrap_or(&default);

        let path = self.templates_dir.join(file);
        let source = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read template {}", path.display()))?;
        template::render(&source, ctx)
            .with_context(|| format!("Failed to render template {}", path.display()))
    }

    /// Convert a document to an HTML body fragment.
    ///
    /// Whitespace-only converter output counts as no body at all, so
    /// templates can detect it with an inverted section.
    fn convert(&self, doc: &Path) -> Result<Option<String>> {
        let output = exec!(&self.converter; &*doc)
            .with_context(|| format!("Failed to convert {}", doc.display()))?;
        let body = String::from_utf8(output.stdout)
            .with_context(|| format!("Converter produced invalid UTF-8 for {}", doc.display()))?;
        if body.trim().is_empty() {
            Ok(None)
        } else {
            Ok(Some(body))
        }
    }

    /// Copy pass-through entries into an output directory, verbatim.
    fn copy_passthrough(&self, entries: &[PathBuf], dest: &Path) -> Result<()> {
        for entry in entries {
            let name = entry
                .file_name()
                .with_context(|| format!("{} has no file name", entry.display()))?;
            let target = dest.join(name);
            if entry.is_dir() {
                utils::copy_dir_all(entry, &target)?;
            } else {
                fs::copy(entry, &target).with_context(|| {
                    format!("Failed to copy {} to {}", entry.display(), target.display())
                })?;
            }
            log!("copy"; "{}", target.display());
        }
        Ok(())
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// A navigation entry carrying just the keys the nav template iterates on.
fn nav_link(ctx: &RenderContext) -> RenderContext {
    let mut link = RenderContext::new();
    if let Some(name) = ctx.get_str("nav-name") {
        link.set_str("nav-name", name);
    }
    if let Some(url) = ctx.get_str("nav-url") {
        link.set_str("nav-url", url);
    }
    link
}

/// Write a finished page as `dir/index.html`.
fn write_page(dir: &Path, html: &str) -> Result<()> {
    let path = dir.join("index.html");
    fs::write(&path, html).with_context(|| format!("Failed to write {}", path.display()))?;
    log!("render"; "{}", path.display());
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
