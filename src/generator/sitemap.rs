//! Sitemap generation.
//!
//! Generates a sitemap.xml file listing every rendered page for search
//! engine indexing, after rendering so each node has a final URL and
//! last-modified date.
//!
//! # Sitemap Format
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
//!   <url>
//!     <loc>https://example.com/</loc>
//!     <lastmod>2025-01-01</lastmod>
//!     <changefreq>weekly</changefreq>
//!   </url>
//! </urlset>
//! ```

use crate::log;
use crate::site::{Blog, Post, Site};
use anyhow::{Context, Result};
use std::fs;

// ============================================================================
// Constants
// ============================================================================

/// XML namespace for sitemap
const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

/// Change-frequency hint applied to every entry.
const CHANGE_FREQ: &str = "weekly";

// ============================================================================
// Public API
// ============================================================================

/// Build the sitemap and write it to the destination root.
pub fn build_sitemap(site: &Site) -> Result<()> {
    let base = super::base_url(&site.context)?;
    let sitemap = Sitemap::from_site(site, &base);
    sitemap.write(site)
}

// ============================================================================
// Sitemap Implementation
// ============================================================================

/// Sitemap data structure
struct Sitemap {
    /// List of URL entries
    urls: Vec<UrlEntry>,
}

/// Single URL entry in the sitemap
struct UrlEntry {
    /// Full URL location
    loc: String,
    /// Last modification date (optional, YYYY-MM-DD format)
    lastmod: Option<String>,
}

impl Sitemap {
    /// One entry per rendered page: site root, each nested blog, each of
    /// its posts, then each top-level post.
    fn from_site(site: &Site, base: &str) -> Self {
        let mut urls = Vec::new();

        urls.push(UrlEntry {
            loc: format!("{base}/"),
            lastmod: Some(site.index_dates.last_modified_ymd()),
        });

        for blog in &site.blogs {
            let blog_loc = format!("{base}/{}/", blog.slug());
            urls.push(UrlEntry {
                loc: blog_loc.clone(),
                lastmod: blog_lastmod(blog),
            });
            for post in &blog.posts {
                urls.push(post_entry(post, &blog_loc));
            }
        }

        let root_loc = format!("{base}/");
        for post in &site.top.posts {
            urls.push(post_entry(post, &root_loc));
        }

        Self { urls }
    }

    /// Generate sitemap XML string.
    fn into_xml(self) -> String {
        let mut xml = String::with_capacity(4096);

        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        xml.push('\n');
        xml.push_str(&format!(r#"<urlset xmlns="{SITEMAP_NS}">"#));
        xml.push('\n');

        for entry in self.urls {
            xml.push_str("  <url>\n");
            xml.push_str(&format!("    <loc>{}</loc>\n", escape_xml(&entry.loc)));
            if let Some(lastmod) = entry.lastmod {
                xml.push_str(&format!("    <lastmod>{lastmod}</lastmod>\n"));
            }
            xml.push_str(&format!("    <changefreq>{CHANGE_FREQ}</changefreq>\n"));
            xml.push_str("  </url>\n");
        }

        xml.push_str("</urlset>\n");
        xml
    }

    /// Write sitemap to the destination root.
    fn write(self, site: &Site) -> Result<()> {
        let path = site.dest.join("sitemap.xml");
        let xml = self.into_xml();

        fs::write(&path, xml)
            .with_context(|| format!("Failed to write sitemap to {}", path.display()))?;

        log!("sitemap"; "{}", path.display());
        Ok(())
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Entry for a post under its parent's URL; an `index` slug collapses into
/// the parent URL, mirroring its output placement.
fn post_entry(post: &Post, parent_loc: &str) -> UrlEntry {
    let loc = match post.slug() {
        "index" => parent_loc.to_owned(),
        slug => format!("{parent_loc}{slug}/"),
    };
    UrlEntry {
        loc,
        lastmod: Some(post.dates.last_modified_ymd()),
    }
}

/// Oldest last-modified date across a blog's posts; a blog with no posts
/// gets no `<lastmod>` at all.
fn blog_lastmod(blog: &Blog) -> Option<String> {
    blog.posts
        .iter()
        .map(|post| post.dates.last_modified)
        .min()
        .map(|date| date.format("%Y-%m-%d").to_string())
}

/// Escape special XML characters.
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::utils::git::RevisionDates;
    use chrono::{FixedOffset, TimeZone};
    use std::path::PathBuf;

    fn dates(day: u32) -> RevisionDates {
        let date = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 1, day, 10, 0, 0)
            .unwrap();
        RevisionDates {
            creation: date,
            last_modified: date,
        }
    }

    fn post(slug: &str, day: u32) -> Post {
        let mut context = Context::new();
        context.set_str("nav-url", slug);
        Post {
            src: PathBuf::from(format!("{slug}.org")),
            context,
            dates: dates(day),
        }
    }

    fn blog(slug: &str, posts: Vec<Post>) -> Blog {
        let mut context = Context::new();
        context.set_str("nav-url", slug);
        Blog {
            src: PathBuf::from(slug),
            context,
            posts,
            passthrough: Vec::new(),
        }
    }

    fn site(blogs: Vec<Blog>, top_posts: Vec<Post>) -> Site {
        Site {
            src: PathBuf::from("src"),
            dest: PathBuf::from("dest"),
            context: Context::new(),
            top: blog("src", top_posts),
            blogs,
            index_dates: dates(10),
        }
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("hello"), "hello");
        assert_eq!(escape_xml("<test>"), "&lt;test&gt;");
        assert_eq!(escape_xml("a & b"), "a &amp; b");
        assert_eq!(escape_xml(r#"say "hi""#), "say &quot;hi&quot;");
        assert_eq!(escape_xml("it's"), "it&apos;s");
    }

    #[test]
    fn test_sitemap_root_only() {
        let sitemap = Sitemap::from_site(&site(vec![], vec![]), "https://example.com");
        let xml = sitemap.into_xml();

        assert!(xml.contains(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(xml.contains(&format!(r#"<urlset xmlns="{SITEMAP_NS}">"#)));
        assert!(xml.contains("<loc>https://example.com/</loc>"));
        assert!(xml.contains("<lastmod>2024-01-10</lastmod>"));
        assert_eq!(xml.matches("<url>").count(), 1);
    }

    #[test]
    fn test_sitemap_entry_count() {
        // 1 root + 2 blogs + 3 nested posts + 1 top-level post
        let s = site(
            vec![
                blog("notes", vec![post("a", 1), post("b", 2)]),
                blog("essays", vec![post("c", 3)]),
            ],
            vec![post("about", 4)],
        );
        let xml = Sitemap::from_site(&s, "https://example.com").into_xml();
        assert_eq!(xml.matches("<url>").count(), 7);
        assert_eq!(xml.matches("</url>").count(), 7);
    }

    #[test]
    fn test_sitemap_nested_post_urls() {
        let s = site(vec![blog("notes", vec![post("hello", 5)])], vec![]);
        let xml = Sitemap::from_site(&s, "https://example.com").into_xml();

        assert!(xml.contains("<loc>https://example.com/notes/</loc>"));
        assert!(xml.contains("<loc>https://example.com/notes/hello/</loc>"));
        assert!(xml.contains("<lastmod>2024-01-05</lastmod>"));
    }

    #[test]
    fn test_sitemap_blog_lastmod_is_oldest_post() {
        let s = site(vec![blog("notes", vec![post("a", 3), post("b", 1), post("c", 2)])], vec![]);
        let xml = Sitemap::from_site(&s, "https://example.com").into_xml();

        let blog_entry = xml
            .split("<url>")
            .find(|chunk| chunk.contains("<loc>https://example.com/notes/</loc>"))
            .unwrap();
        assert!(blog_entry.contains("<lastmod>2024-01-01</lastmod>"));
    }

    #[test]
    fn test_sitemap_empty_blog_has_no_lastmod() {
        let s = site(vec![blog("notes", vec![])], vec![]);
        let xml = Sitemap::from_site(&s, "https://example.com").into_xml();

        let blog_entry = xml
            .split("<url>")
            .find(|chunk| chunk.contains("<loc>https://example.com/notes/</loc>"))
            .unwrap();
        assert!(!blog_entry.contains("<lastmod>"));
        assert!(blog_entry.contains("<changefreq>weekly</changefreq>"));
    }

    #[test]
    fn test_sitemap_index_slug_collapses_into_parent() {
        let s = site(vec![blog("notes", vec![post("index", 1)])], vec![]);
        let xml = Sitemap::from_site(&s, "https://example.com").into_xml();
        assert!(!xml.contains("/notes/index/"));
        assert_eq!(
            xml.matches("<loc>https://example.com/notes/</loc>").count(),
            2
        );
    }

    #[test]
    fn test_sitemap_every_entry_weekly() {
        let s = site(vec![blog("notes", vec![post("a", 1)])], vec![post("b", 2)]);
        let xml = Sitemap::from_site(&s, "https://example.com").into_xml();
        assert_eq!(
            xml.matches("<changefreq>weekly</changefreq>").count(),
            xml.matches("<url>").count()
        );
    }

    #[test]
    fn test_sitemap_xml_structure() {
        let xml = Sitemap::from_site(&site(vec![], vec![]), "https://example.com").into_xml();
        let lines: Vec<&str> = xml.lines().collect();
        assert_eq!(lines[0], r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        assert!(lines[1].starts_with("<urlset"));
        assert!(lines.last().unwrap().trim() == "</urlset>");
    }

    #[test]
    fn test_url_entry_escapes_loc() {
        let sitemap = Sitemap {
            urls: vec![UrlEntry {
                loc: "https://example.com/a&b/".to_string(),
                lastmod: None,
            }],
        };
        assert!(sitemap.into_xml().contains("<loc>https://example.com/a&amp;b/</loc>"));
    }
}
