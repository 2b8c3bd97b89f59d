use regex::Regex;
use scraper::Html;
use serde::Deserialize;
use std::sync::LazyLock;

static LINE_BREAK_TAGS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>|</p\s*>").expect("Regex must be valid"));
static WHITESPACE_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("Regex must be valid"));

/// A catalog volume as shown to users. Fetched fresh on every lookup and never stored as is.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Book {
    /// The catalog's identifier for the volume.
    pub external_id: String,
    pub title: Option<String>,
    /// Authors in the order the catalog lists them.
    pub authors: Vec<String>,
    /// Plain-text description, HTML markup removed.
    pub description: Option<String>,
    pub categories: Vec<String>,
    /// Publication date as the catalog reports it, e.g. `2004` or `2004-05-12`.
    pub publication_date: Option<String>,
    pub isbn13: Option<String>,
    pub thumbnail_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchResponse {
    #[serde(default)]
    items: Vec<Volume>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Volume {
    id: String,
    #[serde(default)]
    volume_info: VolumeInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VolumeInfo {
    title: Option<String>,
    #[serde(default)]
    authors: Vec<String>,
    description: Option<String>,
    #[serde(default)]
    categories: Vec<String>,
    published_date: Option<String>,
    #[serde(default)]
    industry_identifiers: Vec<IndustryIdentifier>,
    image_links: Option<ImageLinks>,
}

#[derive(Debug, Deserialize)]
struct IndustryIdentifier {
    #[serde(rename = "type")]
    kind: String,
    identifier: String,
}

#[derive(Debug, Deserialize)]
struct ImageLinks {
    thumbnail: Option<String>,
}

impl From<Volume> for Book {
    fn from(volume: Volume) -> Self {
        let info = volume.volume_info;
        let isbn13 = info
            .industry_identifiers
            .into_iter()
            .find(|id| id.kind == "ISBN_13")
            .map(|id| id.identifier);

        Self {
            external_id: volume.id,
            title: non_empty(info.title),
            authors: info.authors,
            description: info
                .description
                .map(|html| html_to_text(&html))
                .filter(|text| !text.is_empty()),
            categories: info.categories,
            publication_date: non_empty(info.published_date),
            isbn13,
            thumbnail_url: info.image_links.and_then(|links| links.thumbnail),
        }
    }
}

/// Parses the body of a volume search.
pub(crate) fn parse_search(body: &str) -> Result<Vec<Book>, serde_json::Error> {
    let response: SearchResponse = serde_json::from_str(body)?;
    Ok(response.items.into_iter().map(Book::from).collect())
}

/// Parses the body of a single-volume lookup.
pub(crate) fn parse_volume(body: &str) -> Result<Book, serde_json::Error> {
    let volume: Volume = serde_json::from_str(body)?;
    Ok(Book::from(volume))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
}

/// Reduces an HTML description to plain text, one paragraph per line.
pub(crate) fn html_to_text(html: &str) -> String {
    let with_breaks = LINE_BREAK_TAGS.replace_all(html, "\n");
    let fragment = Html::parse_fragment(&with_breaks);
    let text = fragment.root_element().text().collect::<String>();

    text.lines()
        .map(|line| WHITESPACE_RUNS.replace_all(line, " ").trim().to_owned())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
