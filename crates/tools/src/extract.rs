//! Content extraction pipeline.
//!
//! Turns a fetched HTML document into a bounded, noise-free block of text:
//!
//! 1. Parse the markup.
//! 2. Prune noise elements (scripts, navigation, ads, hidden nodes...).
//! 3. Locate the main content region.
//! 4. Flatten it to newline-joined text and normalize whitespace.
//! 5. Prepend a source header and truncate to the character budget.
//!
//! Every outcome is a value. Failures carry a machine-readable
//! [`FailureReason`] plus the message shown to the model.

use std::fmt;
use std::sync::LazyLock;

use regex_lite::Regex;
use scraper::node::Element;
use scraper::{ElementRef, Html, Node};

/// Default character budget for extracted page text.
pub const DEFAULT_MAX_CHARS: usize = 3000;

/// Element names removed before text extraction.
pub const NOISE_TAGS: &[&str] = &[
    "script",
    "style",
    "nav",
    "footer",
    "header",
    "aside",
    "form",
    "iframe",
    "noscript",
    "advertisement",
];

const HIDDEN_STYLE_PATTERN: &str = r"(?i)display:\s*none|visibility:\s*hidden";
const CONTENT_CLASS_PATTERN: &str = r"(?i)article|content|post|story";

static HIDDEN_STYLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(HIDDEN_STYLE_PATTERN).expect("hidden-style pattern compiles"));
static CONTENT_CLASS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(CONTENT_CLASS_PATTERN).expect("content-class pattern compiles"));
const SEPARATOR_WIDTH: usize = 40;

/// Why extraction did not produce page text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    InvalidUrl,
    Timeout,
    ConnectionFailed,
    Blocked,
    NotFound,
    HttpStatus(u16),
    Transport,
    UnsupportedType,
    NoContentFound,
    NoReadableText,
}

impl FailureReason {
    /// Short code used in logs.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidUrl => "invalid_url",
            Self::Timeout => "timeout",
            Self::ConnectionFailed => "connection_failed",
            Self::Blocked => "blocked",
            Self::NotFound => "not_found",
            Self::HttpStatus(_) => "http_status",
            Self::Transport => "transport",
            Self::UnsupportedType => "unsupported_type",
            Self::NoContentFound => "no_content_found",
            Self::NoReadableText => "no_readable_text",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HttpStatus(status) => write!(f, "http_status({status})"),
            other => f.write_str(other.code()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionFailure {
    pub reason: FailureReason,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedPage {
    /// `SOURCE` / `TITLE` lines plus the separator
    pub header: String,
    /// Normalized, possibly truncated page text
    pub body: String,
}

/// Result of reading one page. Never an error type: failure is a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Page(ExtractedPage),
    Failed(ExtractionFailure),
}

impl Extraction {
    pub fn failed(reason: FailureReason, message: impl Into<String>) -> Self {
        Self::Failed(ExtractionFailure {
            reason,
            message: message.into(),
        })
    }

    pub fn is_page(&self) -> bool {
        matches!(self, Self::Page(_))
    }

    pub fn failure_reason(&self) -> Option<FailureReason> {
        match self {
            Self::Failed(failure) => Some(failure.reason),
            Self::Page(_) => None,
        }
    }

    /// The text handed to the model: `header + body`, or the failure message.
    pub fn into_text(self) -> String {
        match self {
            Self::Page(page) => page.header + &page.body,
            Self::Failed(failure) => failure.message,
        }
    }
}

/// Only absolute web URLs are fetched.
pub fn is_accepted_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// True for the content types the pipeline can parse.
pub fn is_html_content_type(content_type: &str) -> bool {
    let content_type = content_type.to_ascii_lowercase();
    content_type.contains("text/html") || content_type.contains("application/xhtml+xml")
}

/// The literal marker appended when the body is cut. It sits on its own
/// line and survives [`normalize_text`] unchanged.
pub fn truncation_marker(max_chars: usize) -> String {
    format!("\n[... truncated at {max_chars} chars ...]")
}

/// Extract readable text from an HTML document fetched from `url`.
pub fn extract_document(url: &str, html: &str, max_chars: usize) -> Extraction {
    extract_with(&NoiseFilter::new(NOISE_TAGS), url, html, max_chars)
}

fn extract_with(filter: &NoiseFilter, url: &str, html: &str, max_chars: usize) -> Extraction {
    let document = Html::parse_document(html);

    let Some(main) = locate_main_content(&document, filter) else {
        return Extraction::failed(
            FailureReason::NoContentFound,
            format!("Error: Could not find readable content on '{url}'."),
        );
    };

    let mut segments = Vec::new();
    collect_segments(main, filter, &mut segments);
    let text = normalize_text(&segments.join("\n"));

    if text.is_empty() {
        return Extraction::failed(
            FailureReason::NoReadableText,
            format!("Error: Page at '{url}' contained no readable text."),
        );
    }

    Extraction::Page(ExtractedPage {
        header: source_header(url, &page_title(&document, filter)),
        body: truncate_chars(text, max_chars),
    })
}

/// Normalize flattened page text.
///
/// Lines are trimmed and whitespace-only lines dropped, runs of three or
/// more newlines shrink to two, and runs of spaces or tabs become a single
/// space. Applying it to its own output changes nothing.
pub fn normalize_text(raw: &str) -> String {
    let lines: Vec<&str> = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    let joined = collapse_blank_runs(&lines.join("\n"));
    collapse_horizontal_whitespace(&joined)
}

fn collapse_blank_runs(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut newlines = 0;
    for ch in text.chars() {
        if ch == '\n' {
            newlines += 1;
            if newlines <= 2 {
                out.push(ch);
            }
        } else {
            newlines = 0;
            out.push(ch);
        }
    }
    out
}

fn collapse_horizontal_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    // First blank of the current run and the run length.
    let mut run: Option<(char, usize)> = None;
    for ch in text.chars() {
        if ch == ' ' || ch == '\t' {
            run = Some(match run {
                Some((first, len)) => (first, len + 1),
                None => (ch, 1),
            });
            continue;
        }
        if let Some(blank) = run.take() {
            out.push(collapsed(blank));
        }
        out.push(ch);
    }
    if let Some(blank) = run {
        out.push(collapsed(blank));
    }
    out
}

fn collapsed((first, len): (char, usize)) -> char {
    if len == 1 { first } else { ' ' }
}

/// Cut `text` after `max_chars` characters. Trailing whitespace left by
/// the cut is dropped so the result stays normalized.
fn truncate_chars(text: String, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => {
            let kept = text[..cut].trim_end();
            let marker = truncation_marker(max_chars);
            if kept.is_empty() {
                marker.trim_start().to_string()
            } else {
                format!("{kept}{marker}")
            }
        }
        None => text,
    }
}

fn source_header(url: &str, title: &str) -> String {
    format!(
        "SOURCE: {url}\nTITLE: {title}\n{}\n",
        "─".repeat(SEPARATOR_WIDTH)
    )
}

/// Text of the first `<title>` that survived noise pruning, on one line.
fn page_title(document: &Html, filter: &NoiseFilter) -> String {
    document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "title")
        .filter(|el| !filter.is_pruned(*el))
        .map(|el| el.text().flat_map(str::split_whitespace).collect::<Vec<_>>().join(" "))
        .find(|title| !title.is_empty())
        .unwrap_or_else(|| "Unknown".to_string())
}

/// Decides which elements are noise.
///
/// The parsed tree is never mutated: an element is pruned when it, or any
/// ancestor, is noise. The result is therefore the same whatever order the
/// noise categories are listed in.
struct NoiseFilter {
    tags: Vec<String>,
}

impl NoiseFilter {
    fn new(tags: &[&str]) -> Self {
        Self {
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    fn is_noise(&self, element: &Element) -> bool {
        self.tags.iter().any(|t| t == element.name())
            || element
                .attr("style")
                .is_some_and(|style| HIDDEN_STYLE.is_match(style))
    }

    fn is_pruned(&self, element: ElementRef<'_>) -> bool {
        std::iter::once(element)
            .chain(element.ancestors().filter_map(ElementRef::wrap))
            .any(|el| self.is_noise(el.value()))
    }

}

/// First surviving element by priority: `article`, `main`, `#content`,
/// a content-like class, then `body`.
fn locate_main_content<'a>(document: &'a Html, filter: &NoiseFilter) -> Option<ElementRef<'a>> {
    let survivors: Vec<ElementRef<'a>> = document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|el| !filter.is_pruned(*el))
        .collect();

    find_first(&survivors, |el| el.name() == "article")
        .or_else(|| find_first(&survivors, |el| el.name() == "main"))
        .or_else(|| find_first(&survivors, |el| el.id() == Some("content")))
        .or_else(|| {
            find_first(&survivors, |el| {
                el.attr("class").is_some_and(|c| CONTENT_CLASS.is_match(c))
            })
        })
        .or_else(|| find_first(&survivors, |el| el.name() == "body"))
}

fn find_first<'a>(
    elements: &[ElementRef<'a>],
    pred: impl Fn(&Element) -> bool,
) -> Option<ElementRef<'a>> {
    elements.iter().copied().find(|el| pred(el.value()))
}

/// Gather every text node under `element`, skipping noise subtrees.
fn collect_segments<'a>(element: ElementRef<'a>, filter: &NoiseFilter, out: &mut Vec<&'a str>) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push(&**text),
            Node::Element(el) if !filter.is_noise(el) => {
                if let Some(child_ref) = ElementRef::wrap(child) {
                    collect_segments(child_ref, filter, out);
                }
            }
            _ => {}
        }
    }
}
