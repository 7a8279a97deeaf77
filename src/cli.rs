//! Command-line interface definitions.
//!
//! Defines all CLI arguments using clap.

use clap::Parser;
use std::path::PathBuf;

/// Orgsite static site generator CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Source directory (must contain index.org, defaults.org and templates/)
    pub source: PathBuf,

    /// Destination directory for the rendered site (must exist)
    pub dest: PathBuf,

    /// Copy unclassified tracked files into their blog's output directory
    #[arg(long)]
    pub copy_static: bool,

    /// Override the org-to-HTML converter command
    ///
    /// Defaults to `org2html`, or the `#+CONVERTER:` key in defaults.org.
    /// The command is invoked with one argument, the source document path;
    /// its stdout becomes the page body.
    #[arg(long)]
    pub converter: Option<String>,
}

impl Cli {
    /// Source directory with `~` expanded.
    pub fn source_dir(&self) -> PathBuf {
        expand_tilde(&self.source)
    }

    /// Destination directory with `~` expanded.
    pub fn dest_dir(&self) -> PathBuf {
        expand_tilde(&self.dest)
    }
}

/// Expand a leading tilde in a path.
fn expand_tilde(path: &PathBuf) -> PathBuf {
    match path.to_str() {
        Some(s) => PathBuf::from(shellexpand::tilde(s).into_owned()),
        None => path.clone(),
    }
}
