//! Content extraction after a marker boundary
//!
//! The page-side script ([`TEXT_NODE_SCRIPT`]) walks every text node of the
//! rendered document in document order and reports its trimmed text, the
//! owning element's computed visibility properties and its bounding rectangle.
//! [`scan_text_nodes`] then finds the marker and turns what follows it into
//! [`ContentUnit`]s.
//!
//! Visibility is decided from computed style and geometry rather than DOM
//! presence: pagination engines leave zero-height or transparent placeholder
//! nodes behind after reflow.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::{HarnessError, HarnessResult};
use crate::session::DocumentPage;

/// Walks text nodes depth-first in document order.
///
/// Returns `null` when the document has no body.
pub const TEXT_NODE_SCRIPT: &str = r#"
(() => {
    const root = document.body;
    if (!root) return null;
    const walker = document.createTreeWalker(root, NodeFilter.SHOW_TEXT, null);
    const nodes = [];
    let node;
    while ((node = walker.nextNode())) {
        const text = (node.textContent || '').trim();
        if (!text) continue;
        const element = node.parentElement;
        if (!element) continue;
        const rect = element.getBoundingClientRect();
        const style = window.getComputedStyle(element);
        nodes.push({
            text: text,
            display: style.display,
            visibility: style.visibility,
            opacity: style.opacity,
            rect: { x: rect.x, y: rect.y, width: rect.width, height: rect.height }
        });
    }
    return nodes;
})()
"#;

/// Parameters for [`extract_content_after_marker`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractOptions {
    /// Text whose first occurrence starts the reported region
    pub marker: String,
    /// Text must be strictly longer than this (in characters) to be reported
    ///
    /// Length counts Unicode scalar values, so a character outside the Basic
    /// Multilingual Plane such as an emoji counts once, where a DOM
    /// `String.length` would count two UTF-16 units.
    pub min_text_len: usize,
    /// Maximum characters kept from each text
    pub sample_len: usize,
    /// Maximum number of units reported
    pub max_units: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            marker: "Events".to_string(),
            min_text_len: 10,
            sample_len: 100,
            max_units: 10,
        }
    }
}

/// Bounding rectangle in layout pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// One non-blank text node as reported by [`TEXT_NODE_SCRIPT`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextNodeSample {
    /// Trimmed text content
    pub text: String,
    /// Computed `display` of the owning element
    pub display: String,
    /// Computed `visibility` of the owning element
    pub visibility: String,
    /// Computed `opacity` of the owning element
    pub opacity: String,
    /// Bounding rectangle of the owning element
    pub rect: LayoutRect,
}

impl TextNodeSample {
    /// Whether the owning element is actually rendered
    ///
    /// Visible only if display is not `none`, visibility is not `hidden`,
    /// opacity is not zero, and the rectangle has positive width and height.
    pub fn is_visible(&self) -> bool {
        self.display != "none"
            && self.visibility != "hidden"
            && !is_zero_opacity(&self.opacity)
            && self.rect.width > 0.0
            && self.rect.height > 0.0
    }
}

fn is_zero_opacity(opacity: &str) -> bool {
    let opacity = opacity.trim();
    match opacity.parse::<f64>() {
        Ok(value) => value == 0.0,
        Err(_) => opacity == "0",
    }
}

/// A span of rendered text found after the marker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentUnit {
    /// Text truncated to the configured sample length
    pub text: String,
    /// Visibility verdict
    pub visible: bool,
    /// Position and size of the owning element
    pub rect: LayoutRect,
}

/// Result of one extraction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Extraction {
    /// Whether the marker text appeared anywhere in the document
    pub marker_found: bool,
    /// Content after the marker, in document order, capped
    pub units: Vec<ContentUnit>,
    /// More qualifying text followed the marker than the cap allowed
    #[serde(default)]
    pub truncated: bool,
}

impl Extraction {
    /// Number of content units found
    pub fn count(&self) -> usize {
        self.units.len()
    }

    /// Number of units judged visible
    pub fn visible_count(&self) -> usize {
        self.units.iter().filter(|u| u.visible).count()
    }

    /// Marker present but nothing qualifying follows it
    pub fn is_empty_after_marker(&self) -> bool {
        self.marker_found && self.units.is_empty()
    }
}

/// Find the marker among `nodes` and collect the content that follows
///
/// The node containing the marker is never reported. Nodes after it are
/// reported when their text is longer than `min_text_len`, up to
/// `max_units`.
pub fn scan_text_nodes<I>(nodes: I, options: &ExtractOptions) -> Extraction
where
    I: IntoIterator<Item = TextNodeSample>,
{
    let mut extraction = Extraction::default();

    for node in nodes {
        if !extraction.marker_found {
            if node.text.contains(&options.marker) {
                extraction.marker_found = true;
            }
            continue;
        }

        if node.text.chars().count() <= options.min_text_len {
            continue;
        }

        if extraction.units.len() == options.max_units {
            extraction.truncated = true;
            break;
        }

        extraction.units.push(ContentUnit {
            text: truncate_chars(&node.text, options.sample_len),
            visible: node.is_visible(),
            rect: node.rect,
        });
    }

    extraction
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}

/// Extract the content that follows `options.marker` in a loaded page
///
/// # Errors
///
/// Returns [`HarnessError::Extraction`] if the script fails, the document has
/// no body, or the result has an unexpected shape.
#[instrument(skip(page, options), fields(marker = %options.marker))]
pub async fn extract_content_after_marker<P>(
    page: &P,
    options: &ExtractOptions,
) -> HarnessResult<Extraction>
where
    P: DocumentPage + ?Sized,
{
    let value = page.evaluate(TEXT_NODE_SCRIPT).await?;
    if value.is_null() {
        return Err(HarnessError::Extraction(
            "document has no body element".to_string(),
        ));
    }

    let nodes: Vec<TextNodeSample> = serde_json::from_value(value)
        .map_err(|e| HarnessError::Extraction(format!("unexpected text node payload: {}", e)))?;
    debug!("Scanned {} text nodes", nodes.len());

    let extraction = scan_text_nodes(nodes, options);
    debug!(
        "Marker found: {}, content units: {}",
        extraction.marker_found,
        extraction.count()
    );
    Ok(extraction)
}
