//! robots.txt generation.
//!
//! A single `Sitemap:` directive pointing crawlers at the absolute
//! sitemap URL.

use crate::log;
use crate::site::Site;
use anyhow::{Context, Result};
use std::fs;

/// Write robots.txt to the destination root.
pub fn build_robots(site: &Site) -> Result<()> {
    let base = super::base_url(&site.context)?;
    let path = site.dest.join("robots.txt");

    fs::write(&path, robots_body(&base))
        .with_context(|| format!("Failed to write robots.txt to {}", path.display()))?;

    log!("robots"; "{}", path.display());
    Ok(())
}

fn robots_body(base: &str) -> String {
    format!("Sitemap: {base}/sitemap.xml\n")
}
