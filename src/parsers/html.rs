//! HTML link parser
//!
//! Extracts outbound links from fetched pages. Because a parser only sees
//! text, relative links cannot be resolved and are skipped.

use scraper::{Html, Selector};
use url::Url;

/// Extracts absolute http(s) links from `<a href>` elements
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` links
/// - Data URIs and fragment-only links
/// - Relative links
///
/// # Example
///
/// ```
/// use gsdl_harvest::parsers::extract_links;
///
/// let html = r#"<a href="https://example.com/a">A</a><a href="/relative">B</a>"#;
/// assert_eq!(extract_links(html), vec!["https://example.com/a".to_string()]);
/// ```
pub fn extract_links(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut links = Vec::new();

    let Ok(a_selector) = Selector::parse("a[href]") else {
        return links;
    };

    for element in document.select(&a_selector) {
        if element.value().attr("download").is_some() {
            continue;
        }

        if let Some(link) = element.value().attr("href").and_then(absolute_link) {
            links.push(link);
        }
    }

    links
}

/// Returns the href as an absolute URL, or None if it should be excluded
fn absolute_link(href: &str) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    let url = Url::parse(href).ok()?;
    match url.scheme() {
        "http" | "https" => Some(url.to_string()),
        _ => None,
    }
}
