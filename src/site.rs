//! Content tree discovery and per-node context resolution.
//!
//! The tree is exactly two levels deep: a [`Site`] owns nested [`Blog`]s plus
//! one implicit top-level blog rooted at the source directory, and each blog
//! owns [`Post`]s. Discovery walks git-tracked entries, never the raw
//! filesystem, so ignore rules hold and stray files stay out of the build.
//! The tree is built once, read-only; rendering never mutates it.

use crate::context::{Context, Value};
use crate::utils::git::{self, RevisionDates, TrackedEntry};
use crate::utils::slug::slugify;
use anyhow::{Context as _, Result};
use chrono::{DateTime, FixedOffset};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Document file extension.
pub const DOC_EXT: &str = "org";
/// Per-directory index document, reserved.
pub const INDEX_DOC: &str = "index.org";
/// Site-level defaults document, reserved.
pub const DEFAULTS_DOC: &str = "defaults.org";
/// Templates directory base name, skipped by discovery.
pub const TEMPLATES_DIR: &str = "templates";
/// Default org-to-HTML converter command.
pub const DEFAULT_CONVERTER: &str = "org2html";

/// The seven template roles every site must provide.
pub const TEMPLATE_ROLES: [&str; 7] = [
    "header",
    "post",
    "footer",
    "nav",
    "container",
    "blog-index",
    "rss",
];

// ============================================================================
// Site Context
// ============================================================================

/// Resolve the site-level context: process defaults overlaid with the
/// `defaults.org` document, then any CLI converter override on top.
pub fn site_context(src: &Path, converter_override: Option<&str>) -> Result<Context> {
    let mut defaults = Context::new();
    defaults.set_str(
        "templates-dir",
        src.join(TEMPLATES_DIR).to_string_lossy().into_owned(),
    );
    for role in TEMPLATE_ROLES {
        defaults.set_str(format!("{role}-template"), format!("{role}.mustache"));
    }
    defaults.set_str("language", "en-us");
    defaults.set("show-nav-links", Value::Bool(true));
    defaults.set("show-meta", Value::Bool(true));
    defaults.set_str("converter", DEFAULT_CONVERTER);

    let doc = src.join(DEFAULTS_DOC);
    let parsed = Context::from_document(&doc)
        .with_context(|| format!("extracting context from {}", doc.display()))?;
    let mut ctx = defaults.merged(&parsed);

    if let Some(converter) = converter_override {
        ctx.set_str("converter", converter);
    }
    Ok(ctx)
}

// ============================================================================
// Post
// ============================================================================

/// A single content document rendered into its own output location.
#[derive(Debug, Clone)]
pub struct Post {
    pub src: PathBuf,
    pub context: Context,
    /// Full-precision revision dates; `dates.creation` gives a tie-free
    /// ordering key where the calendar-day `creation` context value cannot.
    pub dates: RevisionDates,
}

impl Post {
    /// Resolve a post: parse headers, derive dates from revision history,
    /// layer the parsed context over its computed defaults.
    fn resolve(src: PathBuf) -> Result<Post> {
        let parsed = Context::from_document(&src)?;
        let dates = git::revision_dates(&src)?;
        let stem = src
            .file_stem()
            .context("Post path has no file stem")?
            .to_string_lossy()
            .into_owned();

        let context = post_context(&stem, &parsed, &dates);
        Ok(Post {
            src,
            context,
            dates,
        })
    }

    /// Resolved URL slug.
    pub fn slug(&self) -> &str {
        self.context.get_str("nav-url").unwrap_or("")
    }

    /// High-precision creation timestamp, for descending sort order.
    pub fn created_at(&self) -> DateTime<FixedOffset> {
        self.dates.creation
    }
}

/// Layer a post's parsed context over its computed defaults.
///
/// `nav-name` falls back to the document title, then the filename stem;
/// `nav-url` is the slug of whichever nav-name won. An explicit `nav-url`
/// header still overrides the computed one.
fn post_context(stem: &str, parsed: &Context, dates: &RevisionDates) -> Context {
    let nav_name = parsed
        .get_str("nav-name")
        .or_else(|| parsed.get_str("title"))
        .unwrap_or(stem);

    let mut defaults = Context::new();
    defaults.set_str("nav-name", nav_name);
    defaults.set_str("nav-url", slugify(nav_name));
    defaults.set_str("creation", dates.creation_ymd());
    defaults.set_str("last-mod", dates.last_modified_ymd());
    defaults.merged(parsed)
}

// ============================================================================
// Blog
// ============================================================================

/// A directory with its own index document, owned posts and a feed.
#[derive(Debug, Clone)]
pub struct Blog {
    pub src: PathBuf,
    pub context: Context,
    pub posts: Vec<Post>,
    /// Tracked entries that are neither documents nor reserved names.
    /// Inert unless `--copy-static` is given.
    pub passthrough: Vec<PathBuf>,
}

impl Blog {
    /// Discover a nested blog. A blog does not search for blogs inside
    /// itself; tracked subdirectories become pass-through entries.
    fn discover(src: PathBuf) -> Result<Blog> {
        let mut posts = Vec::new();
        let mut passthrough = Vec::new();

        for entry in git::list_tracked(&src)? {
            match entry {
                TrackedEntry::File(name) => {
                    if is_reserved(&name) {
                        continue;
                    }
                    if is_document(&name) {
                        posts.push(Post::resolve(src.join(name))?);
                    } else {
                        passthrough.push(src.join(name));
                    }
                }
                TrackedEntry::Dir(name) => passthrough.push(src.join(name)),
            }
        }

        let parsed = Context::from_document(&src.join(INDEX_DOC))?;
        let context = blog_context(&dir_name(&src)?, &parsed, &posts);
        Ok(Blog {
            src,
            context,
            posts,
            passthrough,
        })
    }

    /// Resolved URL slug.
    pub fn slug(&self) -> &str {
        self.context.get_str("nav-url").unwrap_or("")
    }

    /// Posts ordered by descending high-precision creation timestamp.
    pub fn sorted_posts(&self) -> Vec<&Post> {
        let mut sorted: Vec<&Post> = self.posts.iter().collect();
        sorted.sort_by_key(|post| std::cmp::Reverse(post.created_at()));
        sorted
    }
}

/// Layer a blog's parsed index context over its computed defaults.
fn blog_context(dir_name: &str, parsed: &Context, posts: &[Post]) -> Context {
    let nav_url = slugify(dir_name);

    let mut defaults = Context::new();
    defaults.set_str("blog-url", &nav_url);
    defaults.set_str("nav-url", nav_url);
    defaults.set_str("rss-url", "rss.xml");
    if let Some(title) = parsed.get_str("title") {
        defaults.set_str("nav-name", title);
    }
    defaults.set(
        "posts",
        Value::List(posts.iter().map(|post| post.context.clone()).collect()),
    );
    defaults.merged(parsed)
}

// ============================================================================
// Site
// ============================================================================

/// The root of the content tree.
#[derive(Debug)]
pub struct Site {
    pub src: PathBuf,
    pub dest: PathBuf,
    /// Site-level resolved context (process defaults + `defaults.org`).
    pub context: Context,
    /// Implicit blog rooted at the source directory itself.
    pub top: Blog,
    /// Nested blogs, in discovery order.
    pub blogs: Vec<Blog>,
    /// Revision dates of the root index document.
    pub index_dates: RevisionDates,
}

impl Site {
    /// Discover the whole tree. Recursion terminates at depth two: nested
    /// blogs are found only among the source root's immediate
    /// subdirectories.
    pub fn discover(src: PathBuf, dest: PathBuf, context: Context) -> Result<Site> {
        let templates_name = templates_base_name(&context);
        let mut blogs = Vec::new();
        let mut posts = Vec::new();
        let mut passthrough = Vec::new();

        for entry in git::list_tracked(&src)? {
            match entry {
                TrackedEntry::Dir(name) => {
                    if name.as_os_str() == templates_name.as_os_str() {
                        continue;
                    }
                    let dir = src.join(&name);
                    if dir.join(INDEX_DOC).is_file() {
                        blogs.push(Blog::discover(dir)?);
                    } else {
                        passthrough.push(dir);
                    }
                }
                TrackedEntry::File(name) => {
                    if is_reserved(&name) {
                        continue;
                    }
                    if is_document(&name) {
                        posts.push(Post::resolve(src.join(name))?);
                    } else {
                        passthrough.push(src.join(name));
                    }
                }
            }
        }

        let index_doc = src.join(INDEX_DOC);
        let index_dates = git::revision_dates(&index_doc)?;
        let parsed = Context::from_document(&index_doc)?;
        let top_context = blog_context(&dir_name(&src)?, &parsed, &posts);
        let top = Blog {
            src: src.clone(),
            context: top_context,
            posts,
            passthrough,
        };

        Ok(Site {
            src,
            dest,
            context,
            top,
            blogs,
            index_dates,
        })
    }

    /// Templates directory from the resolved site context.
    pub fn templates_dir(&self) -> PathBuf {
        PathBuf::from(self.context.get_str("templates-dir").unwrap_or_default())
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Reserved filenames, never classified as posts.
fn is_reserved(name: &Path) -> bool {
    name.as_os_str() == INDEX_DOC || name.as_os_str() == DEFAULTS_DOC
}

/// Whether a tracked file carries the document extension.
fn is_document(name: &Path) -> bool {
    name.extension().is_some_and(|ext| ext == DOC_EXT)
}

/// Base name of the configured templates directory, skipped by discovery
/// under whatever name `defaults.org` maps it to.
fn templates_base_name(ctx: &Context) -> OsString {
    ctx.get_str("templates-dir")
        .map(Path::new)
        .and_then(Path::file_name)
        .map_or_else(|| OsString::from(TEMPLATES_DIR), ToOwned::to_owned)
}

/// Final path component as a string.
///
/// A relative source like `.` has no final component until resolved.
fn dir_name(path: &Path) -> Result<String> {
    if let Some(name) = path.file_name() {
        return Ok(name.to_string_lossy().into_owned());
    }
    let canonical = path
        .canonicalize()
        .with_context(|| format!("Failed to resolve {}", path.display()))?;
    canonical
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .with_context(|| format!("{} has no directory name", path.display()))
}

// ============================================================================
// Tests
// ============================================================================
