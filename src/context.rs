//! Layered template context: typed values, header parsing, merge.
//!
//! Every node (site, blog, post) resolves to a [`Context`], a flat mapping
//! from lowercase keys to typed values. Coercion of the reserved tokens
//! (`none`, `false`) and `_list` keys happens exactly once, here in the
//! parser; nothing downstream re-interprets strings.

use anyhow::{Context as _, Result};
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

/// Header line pattern: `#+KEY: VALUE`.
static HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#\+([^:\s]+):[ \t]*(.*?)[ \t\r]*$").unwrap());

// ============================================================================
// Values
// ============================================================================

/// A context value.
///
/// Absence is modeled by the key not being present; looking up a missing key
/// yields `None`, never an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Bool(bool),
    /// Ordered sequence of mappings, iterated by template sections.
    List(Vec<Context>),
}

impl Value {
    /// Section truthiness: `false`, the empty string and the empty list
    /// render nothing.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Str(s) => !s.is_empty(),
            Self::Bool(b) => *b,
            Self::List(items) => !items.is_empty(),
        }
    }

    /// Text used when the value is interpolated as a variable.
    pub fn as_text(&self) -> &str {
        match self {
            Self::Str(s) => s,
            Self::Bool(true) => "true",
            // `false` and lists have no sensible inline form
            Self::Bool(false) | Self::List(_) => "",
        }
    }
}

// ============================================================================
// Context
// ============================================================================

/// An insertion-order-irrelevant key/value mapping resolved per node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    entries: HashMap<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a key; a missing key is `None`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Look up a key as a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.get(key) {
            Some(Value::Str(s)) => Some(s),
            _ => None,
        }
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.entries.insert(key.into(), value);
    }

    pub fn set_str(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.set(key, Value::Str(value.into()));
    }

    pub fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }

    /// Shallow copy-then-update: `overlay` wins on key collision.
    ///
    /// This is the one merge primitive every layer of the configuration
    /// stack goes through, so override precedence is uniform.
    pub fn merged(&self, overlay: &Context) -> Context {
        let mut merged = self.clone();
        for (key, value) in &overlay.entries {
            merged.entries.insert(key.clone(), value.clone());
        }
        merged
    }

    // ------------------------------------------------------------------------
    // Header parsing
    // ------------------------------------------------------------------------

    /// Parse header lines out of raw document text.
    ///
    /// Lines not matching `#+KEY: VALUE` are ignored without diagnostic.
    /// Keys are lowercased. Reserved value tokens, case-insensitive:
    /// `none` leaves the key absent (a later `none` line also clears an
    /// earlier one), `false` becomes a boolean. A key ending in `_list`
    /// splits its value on whitespace into `{base-key: token}` mappings.
    pub fn from_document_text(text: &str) -> Context {
        let mut ctx = Context::new();
        for caps in HEADER_RE.captures_iter(text) {
            let key = caps[1].to_lowercase();
            let value = &caps[2];

            if value.eq_ignore_ascii_case("none") {
                ctx.remove(&key);
            } else if value.eq_ignore_ascii_case("false") {
                ctx.set(key, Value::Bool(false));
            } else if let Some(base) = key.strip_suffix("_list") {
                let items = value
                    .split_whitespace()
                    .map(|token| {
                        let mut item = Context::new();
                        item.set_str(base, token);
                        item
                    })
                    .collect();
                ctx.set(key, Value::List(items));
            } else {
                ctx.set(key, Value::Str(value.to_string()));
            }
        }
        ctx
    }

    /// Parse a document file's headers.
    pub fn from_document(path: &Path) -> Result<Context> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(Self::from_document_text(&text))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_headers() {
        let ctx = Context::from_document_text("#+TITLE: Hello World\n#+AUTHOR: Kay\n");
        assert_eq!(ctx.get_str("title"), Some("Hello World"));
        assert_eq!(ctx.get_str("author"), Some("Kay"));
    }

    #[test]
    fn test_parse_key_case_insensitive() {
        let ctx = Context::from_document_text("#+Nav-Name: About\n");
        assert_eq!(ctx.get_str("nav-name"), Some("About"));
    }

    #[test]
    fn test_parse_value_trimmed() {
        let ctx = Context::from_document_text("#+TITLE:   spaced out   \n");
        assert_eq!(ctx.get_str("title"), Some("spaced out"));
    }

    #[test]
    fn test_parse_ignores_non_header_lines() {
        let text = "Some prose.\n#+TITLE: Post\n* A heading\nbody text #+NOT: header\n";
        let ctx = Context::from_document_text(text);
        assert_eq!(ctx.get_str("title"), Some("Post"));
        assert!(ctx.get("not").is_none());
    }

    #[test]
    fn test_parse_key_stops_at_whitespace() {
        // The key class excludes every whitespace kind, tab and NBSP included
        let ctx = Context::from_document_text("#+TWO WORDS: v\n#+TAB\tKEY: v\n#+NB\u{a0}SP: v\n");
        assert!(ctx.get("two").is_none());
        assert!(ctx.get("two words").is_none());
        assert!(ctx.get("tab").is_none());
        assert!(ctx.get("nb\u{a0}sp").is_none());
    }

    #[test]
    fn test_parse_none_is_absent() {
        let ctx = Context::from_document_text("#+NAV-NAME: none\n");
        assert!(ctx.get("nav-name").is_none());

        // case-insensitive
        let ctx = Context::from_document_text("#+NAV-NAME: NONE\n");
        assert!(ctx.get("nav-name").is_none());
    }

    #[test]
    fn test_parse_late_none_clears_earlier_value() {
        let ctx = Context::from_document_text("#+X: set\n#+X: none\n");
        assert!(ctx.get("x").is_none());
    }

    #[test]
    fn test_parse_false_is_boolean() {
        let ctx = Context::from_document_text("#+SHOW-META: false\n");
        assert_eq!(ctx.get("show-meta"), Some(&Value::Bool(false)));
        assert!(!ctx.get("show-meta").unwrap().is_truthy());
    }

    #[test]
    fn test_parse_list_key() {
        let ctx = Context::from_document_text("#+TAG_LIST: rust org blog\n");
        let Some(Value::List(items)) = ctx.get("tag_list") else {
            panic!("expected list");
        };
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].get_str("tag"), Some("rust"));
        assert_eq!(items[1].get_str("tag"), Some("org"));
        assert_eq!(items[2].get_str("tag"), Some("blog"));
    }

    #[test]
    fn test_parse_is_pure() {
        let text = "#+TITLE: t\n#+TAG_LIST: a b\n#+HIDDEN: false\n";
        assert_eq!(
            Context::from_document_text(text),
            Context::from_document_text(text)
        );
    }

    #[test]
    fn test_parse_duplicate_key_last_wins() {
        let ctx = Context::from_document_text("#+TITLE: first\n#+TITLE: second\n");
        assert_eq!(ctx.get_str("title"), Some("second"));
    }

    #[test]
    fn test_merged_overlay_wins() {
        let mut base = Context::new();
        base.set_str("title", "base");
        base.set_str("language", "en-us");

        let mut overlay = Context::new();
        overlay.set_str("title", "overlay");

        let merged = base.merged(&overlay);
        assert_eq!(merged.get_str("title"), Some("overlay"));
        assert_eq!(merged.get_str("language"), Some("en-us"));
        // inputs untouched
        assert_eq!(base.get_str("title"), Some("base"));
    }

    #[test]
    fn test_merged_absent_in_overlay_keeps_base() {
        let mut base = Context::new();
        base.set_str("nav-name", "stem");
        let merged = base.merged(&Context::new());
        assert_eq!(merged.get_str("nav-name"), Some("stem"));
    }

    #[test]
    fn test_truthiness() {
        assert!(Value::Str("x".into()).is_truthy());
        assert!(!Value::Str(String::new()).is_truthy());
        assert!(Value::Bool(true).is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(!Value::List(Vec::new()).is_truthy());
        assert!(Value::List(vec![Context::new()]).is_truthy());
    }

    #[test]
    fn test_value_as_text() {
        assert_eq!(Value::Str("hi".into()).as_text(), "hi");
        assert_eq!(Value::Bool(true).as_text(), "true");
        assert_eq!(Value::Bool(false).as_text(), "");
        assert_eq!(Value::List(Vec::new()).as_text(), "");
    }
}
