//! Turns extractor output into the text + citations the
//! caller receives. Never fails; an empty extraction still yields a header.

use super::extract::{Extraction, PageContent};
use super::{ExtractionMode, ResolvedTarget};
use crate::fetch::FetchError;
use crate::models::{Report, SourceRecord};

pub fn assemble(extraction: Extraction, target: &ResolvedTarget) -> Report {
    match extraction {
        Extraction::Results(records) => search_report(records, &target.query),
        Extraction::Page(content) => page_report(content, target.url.as_str()),
    }
}

/// Header line followed by one numbered `[Source N: title]` / `Snippet:` block
/// per record, blocks separated by a blank line.
pub fn search_report(records: Vec<SourceRecord>, query: &str) -> Report {
    let mut text = format!(
        "Intelligence report based on top search results for query: \"{}\"",
        query
    );
    for (i, record) in records.iter().enumerate() {
        text.push_str(&format!(
            "\n\n[Source {}: {}]\nSnippet: {}",
            i + 1,
            record.title,
            record.snippet.as_deref().unwrap_or_default()
        ));
    }
    Report { text, sources: records }
}

pub fn page_report(content: PageContent, url: &str) -> Report {
    let mut text = format!("Raw text content from {}:", url);
    if !content.text.is_empty() {
        text.push_str("\n\n");
        text.push_str(&content.text);
    }
    Report { text, sources: vec![content.source] }
}

/// Report returned when the upstream fetch failed and the failure is absorbed.
pub fn fetch_failure_report(target: &ResolvedTarget, err: &FetchError) -> Report {
    Report {
        text: format!(
            "No intelligence could be gathered for {}: the upstream source could not be retrieved ({}).",
            describe(target),
            err
        ),
        sources: Vec::new(),
    }
}

fn describe(target: &ResolvedTarget) -> String {
    match target.mode {
        ExtractionMode::SearchResults => format!("query \"{}\"", target.query),
        ExtractionMode::GenericPage => target.url.to_string(),
    }
}
