//! Orgsite - a static site generator for org-mode blogs.

mod cli;
mod context;
mod error;
mod generator;
mod logger;
mod render;
mod site;
mod template;
mod utils;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use context::Context;
use error::PreflightError;
use render::Renderer;
use site::{DEFAULTS_DOC, INDEX_DOC, Site, TEMPLATE_ROLES};
use std::path::{Path, PathBuf};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let src = cli.source_dir();
    let dest = cli.dest_dir();

    check_tree(&src, &dest)?;
    let ctx = site::site_context(&src, cli.converter.as_deref())?;
    check_templates(&ctx)?;
    check_converter(&ctx)?;

    let site = Site::discover(src, dest, ctx)?;
    let renderer = Renderer::new(&site, cli.copy_static)?;
    renderer.render_site()?;

    generator::sitemap::build_sitemap(&site)?;
    generator::robots::build_robots(&site)?;

    crate::log!("build"; "done");
    Ok(())
}

/// Verify source and destination layout before reading any document.
fn check_tree(src: &Path, dest: &Path) -> Result<()> {
    for dir in [src, dest] {
        if !dir.is_dir() {
            return Err(PreflightError::NotADirectory(dir.to_path_buf()).into());
        }
    }
    for doc in [INDEX_DOC, DEFAULTS_DOC] {
        if !src.join(doc).is_file() {
            return Err(PreflightError::MissingDocument(doc, src.to_path_buf()).into());
        }
    }
    Ok(())
}

/// Verify the templates directory holds all seven role templates, under
/// whatever filenames the resolved context maps them to.
fn check_templates(ctx: &Context) -> Result<()> {
    let templates_dir = PathBuf::from(ctx.get_str("templates-dir").unwrap_or_default());
    if !templates_dir.is_dir() {
        return Err(PreflightError::NotADirectory(templates_dir).into());
    }

    for role in TEMPLATE_ROLES {
        let default = format!("{role}.mustache");
        let file = ctx
            .get_str(&format!("{role}-template"))
            .unwrap_or(&default)
            .to_owned();
        if !templates_dir.join(&file).is_file() {
            return Err(PreflightError::MissingTemplate(file, templates_dir).into());
        }
    }
    Ok(())
}

/// Verify the converter executable is reachable on PATH.
fn check_converter(ctx: &Context) -> Result<()> {
    let command = ctx.get_str("converter").unwrap_or(site::DEFAULT_CONVERTER);
    let program = command.split_whitespace().next().unwrap_or(command);
    if which::which(program).is_err() {
        return Err(PreflightError::ConverterNotFound(program.to_owned()).into());
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
