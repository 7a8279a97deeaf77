//! Site-wide output generators: per-blog feeds and crawl metadata.

pub mod robots;
pub mod rss;
pub mod sitemap;

use crate::context::Context;
use anyhow::{Result, bail};

/// Site base URL from the resolved context, without a trailing slash.
///
/// Required for any absolute-URL output; its absence is caught here once
/// rather than producing relative crawl metadata.
pub fn base_url(ctx: &Context) -> Result<String> {
    match ctx.get_str("base-url") {
        Some(url) => Ok(url.trim_end_matches('/').to_owned()),
        None => bail!("`base-url` is not set in defaults.org; required for sitemap.xml and robots.txt"),
    }
}
