//! HTML extraction.
//!
//! Two modes, both pure functions of their input:
//! - search results: up to `MAX_SEARCH_RESULTS` titled, linked, snippeted records
//! - generic page: one normalized, truncated text blob plus a single citation
//!
//! Markup varies between upstream layouts, so every field is looked up
//! through a `SelectorChain`: an ordered list of selectors tried in turn.
//! Snippets take the first selector that matches at all; content regions take
//! the first one with non-empty text.

use std::sync::LazyLock;

use regex::Regex;
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::{ExtractionMode, ResolvedTarget};
use crate::models::SourceRecord;

/// Only the first N result containers are considered.
pub const MAX_SEARCH_RESULTS: usize = 5;
/// Generic-page text is cut to this many characters.
pub const MAX_PAGE_CHARS: usize = 5000;

const RESULT_CONTAINER: &str = "div.g";
const TITLE_SELECTORS: &[&str] = &["h3"];
const LINK_SELECTOR: &str = "a";
const SNIPPET_SELECTORS: &[&str] = &["div.VwiC3b", "div[data-sncf=\"2\"]"];
const CONTENT_REGIONS: &[&str] = &["main", "article", "body"];
const PAGE_TITLE: &[&str] = &["title"];

/// Elements whose text is never page content.
const NON_TEXT_TAGS: &[&str] = &["script", "style", "noscript", "template"];

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s{2,}").expect("whitespace regex is valid"));
static BLANK_LINE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n").expect("blank-line regex is valid"));

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("invalid selector '{css}': {reason}")]
    Selector { css: String, reason: String },
}

/// Extractor output, one variant per `ExtractionMode`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Results(Vec<SourceRecord>),
    Page(PageContent),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContent {
    /// Normalized text, at most `MAX_PAGE_CHARS` characters.
    pub text: String,
    pub source: SourceRecord,
}

/// Ordered selector fallback. Each selector is tried against the scope in
/// turn and only its first matching element is read.
pub struct SelectorChain {
    selectors: Vec<Selector>,
}

impl SelectorChain {
    pub fn new(css: &[&str]) -> Result<Self, ExtractError> {
        let selectors = css.iter().map(|c| selector(c)).collect::<Result<Vec<_>, _>>()?;
        Ok(Self { selectors })
    }

    /// Text of the first selector whose match is non-blank. A blank match
    /// falls through to the next selector.
    pub fn first_text(&self, scope: ElementRef<'_>) -> Option<String> {
        self.selectors.iter().find_map(|sel| {
            scope
                .select(sel)
                .next()
                .map(element_text)
                .filter(|text| !text.trim().is_empty())
        })
    }

    /// Text of the first selector that matches anything at all. A blank match
    /// ends the chain with `None`; later selectors are only tried when the
    /// earlier ones match no element.
    pub fn first_match_text(&self, scope: ElementRef<'_>) -> Option<String> {
        self.selectors
            .iter()
            .find_map(|sel| scope.select(sel).next())
            .map(element_text)
            .filter(|text| !text.trim().is_empty())
    }
}

fn selector(css: &str) -> Result<Selector, ExtractError> {
    Selector::parse(css).map_err(|e| ExtractError::Selector {
        css: css.to_string(),
        reason: e.to_string(),
    })
}

/// Run the extractor matching `target.mode`.
pub fn extract(html: &str, target: &ResolvedTarget) -> Result<Extraction, ExtractError> {
    match target.mode {
        ExtractionMode::SearchResults => {
            extract_search_results(html, &target.url).map(Extraction::Results)
        }
        ExtractionMode::GenericPage => extract_page(html, &target.url).map(Extraction::Page),
    }
}

// ---------------------------------------------------------------------------
// Search-results mode
// ---------------------------------------------------------------------------

/// Records for the first `MAX_SEARCH_RESULTS` result containers, in document
/// order. Containers missing a title, link or snippet are skipped.
pub fn extract_search_results(html: &str, page_url: &Url) -> Result<Vec<SourceRecord>, ExtractError> {
    let doc = Html::parse_document(html);
    let container = selector(RESULT_CONTAINER)?;
    let link = selector(LINK_SELECTOR)?;
    let titles = SelectorChain::new(TITLE_SELECTORS)?;
    let snippets = SelectorChain::new(SNIPPET_SELECTORS)?;

    let records = doc
        .select(&container)
        .take(MAX_SEARCH_RESULTS)
        .filter_map(|el| {
            let title = titles.first_text(el).map(|t| collapse_whitespace(&t))?;
            let uri = el
                .select(&link)
                .next()
                .and_then(|a| a.value().attr("href"))
                .map(str::trim)
                .filter(|href| !href.is_empty())
                .map(|href| resolve_link(page_url, href))?;
            let snippet = snippets.first_match_text(el).map(|t| collapse_whitespace(&t))?;
            Some(SourceRecord { title, uri, snippet: Some(snippet) })
        })
        .collect();

    Ok(records)
}

fn resolve_link(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

// ---------------------------------------------------------------------------
// Generic-page mode
// ---------------------------------------------------------------------------

/// Text of the first non-empty region among `main`, `article`, `body`,
/// normalized and truncated, cited by the page title (or the URL).
pub fn extract_page(html: &str, url: &Url) -> Result<PageContent, ExtractError> {
    let doc = Html::parse_document(html);
    let regions = SelectorChain::new(CONTENT_REGIONS)?;
    let title_chain = SelectorChain::new(PAGE_TITLE)?;

    let raw = regions.first_text(doc.root_element()).unwrap_or_default();
    let text = truncate_chars(&normalize_text(&raw), MAX_PAGE_CHARS);

    let title = title_chain
        .first_text(doc.root_element())
        .map(|t| collapse_whitespace(&t))
        .unwrap_or_else(|| url.to_string());

    Ok(PageContent {
        text,
        source: SourceRecord { title, uri: url.to_string(), snippet: None },
    })
}

/// Collapse whitespace runs to one space, blank-line runs to one newline, trim.
///
/// The space pass runs first and already folds any run of two or more
/// whitespace characters (newlines included), so `"a\n\n\nb"` becomes
/// `"a b"`; the blank-line pass only sees what is left after it.
pub fn normalize_text(raw: &str) -> String {
    let spaced = WHITESPACE_RUN.replace_all(raw, " ");
    let lined = BLANK_LINE_RUN.replace_all(&spaced, "\n");
    lined.trim().to_string()
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Concatenated descendant text, skipping script-like elements.
fn element_text(el: ElementRef<'_>) -> String {
    let mut out = String::new();
    collect_text(el, &mut out);
    out
}

fn collect_text(el: ElementRef<'_>, out: &mut String) {
    for child in el.children() {
        match child.value() {
            Node::Text(text) => out.push_str(&text.text),
            Node::Element(child_el) if !NON_TEXT_TAGS.contains(&child_el.name()) => {
                if let Some(child_ref) = ElementRef::wrap(child) {
                    collect_text(child_ref, out);
                }
            }
            _ => {}
        }
    }
}
