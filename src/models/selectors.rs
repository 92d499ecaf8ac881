// src/models/selectors.rs

//! CSS selector chains for scraping listing cards and article pages.
//!
//! Every field is an ordered chain: selectors are tried in sequence and the
//! first one yielding a non-empty value wins. Site markup drifts between
//! redesigns, so older selectors can stay in the chain behind newer ones.

use serde::{Deserialize, Serialize};

/// Selectors grouped by extraction shape.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SelectorConfig {
    #[serde(default)]
    pub listing: ListingSelectors,

    #[serde(default)]
    pub date: DateSelectors,
}

/// Selectors for article cards on a listing page or fragment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingSelectors {
    /// Selector for each article card
    #[serde(default = "defaults::card")]
    pub card: Vec<String>,

    /// Selector for the heading link within a card
    #[serde(default = "defaults::link")]
    pub link: Vec<String>,

    /// Selector for the title text (falls back to the link text)
    #[serde(default)]
    pub title: Vec<String>,

    /// HTML attribute holding the article URL
    #[serde(default = "defaults::link_attr")]
    pub link_attr: String,

    #[serde(default = "defaults::category")]
    pub category: Vec<String>,

    #[serde(default = "defaults::summary")]
    pub summary: Vec<String>,

    #[serde(default = "defaults::author")]
    pub author: Vec<String>,

    /// Prefixes removed from the author text (e.g. "By ")
    #[serde(default = "defaults::author_prefixes")]
    pub author_prefixes: Vec<String>,

    #[serde(default = "defaults::image")]
    pub image: Vec<String>,

    /// Image attributes checked in order (lazy-loaded images use `data-src`)
    #[serde(default = "defaults::image_attrs")]
    pub image_attrs: Vec<String>,
}

impl Default for ListingSelectors {
    fn default() -> Self {
        Self {
            card: defaults::card(),
            link: defaults::link(),
            title: Vec::new(),
            link_attr: defaults::link_attr(),
            category: defaults::category(),
            summary: defaults::summary(),
            author: defaults::author(),
            author_prefixes: defaults::author_prefixes(),
            image: defaults::image(),
            image_attrs: defaults::image_attrs(),
        }
    }
}

impl ListingSelectors {
    /// All selector strings, for validation.
    pub fn all(&self) -> impl Iterator<Item = &String> {
        self.card
            .iter()
            .chain(&self.link)
            .chain(&self.title)
            .chain(&self.category)
            .chain(&self.summary)
            .chain(&self.author)
            .chain(&self.image)
    }
}

/// A selector paired with the attribute to read (`None` reads the text).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AttrSelector {
    pub selector: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attr: Option<String>,
}

impl AttrSelector {
    pub fn new(selector: impl Into<String>, attr: Option<&str>) -> Self {
        Self {
            selector: selector.into(),
            attr: attr.map(str::to_string),
        }
    }
}

/// Selectors for the publication date on an article page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateSelectors {
    /// Machine-readable date fields, parsed as RFC 3339 / ISO 8601
    #[serde(default = "defaults::structured")]
    pub structured: Vec<AttrSelector>,

    /// Also look for `datePublished` in JSON-LD blocks
    #[serde(default = "defaults::json_ld")]
    pub json_ld: bool,

    /// Human-readable date elements, parsed with `formats`
    #[serde(default = "defaults::human")]
    pub human: Vec<String>,

    /// `chrono` format strings for the human-readable date
    #[serde(default = "defaults::formats")]
    pub formats: Vec<String>,
}

impl Default for DateSelectors {
    fn default() -> Self {
        Self {
            structured: defaults::structured(),
            json_ld: defaults::json_ld(),
            human: defaults::human(),
            formats: defaults::formats(),
        }
    }
}

impl DateSelectors {
    /// All selector strings, for validation.
    pub fn all(&self) -> impl Iterator<Item = &String> {
        self.structured
            .iter()
            .map(|s| &s.selector)
            .chain(&self.human)
    }
}

mod defaults {
    use super::AttrSelector;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    pub fn card() -> Vec<String> {
        strings(&["div.card-object", "div.list-object", "article"])
    }
    pub fn link() -> Vec<String> {
        strings(&[
            "a.list-object__heading-link",
            ".list-object__heading a",
            "h2 a",
            "h3 a",
        ])
    }
    pub fn link_attr() -> String {
        "href".into()
    }
    pub fn category() -> Vec<String> {
        strings(&[".list-object__category a", ".list-object__category"])
    }
    pub fn summary() -> Vec<String> {
        strings(&[".list-object__description"])
    }
    pub fn author() -> Vec<String> {
        strings(&[".list-object__author"])
    }
    pub fn author_prefixes() -> Vec<String> {
        strings(&["By "])
    }
    pub fn image() -> Vec<String> {
        strings(&[
            ".card-object__figure picture img",
            ".card-object__figure img",
            "img",
        ])
    }
    pub fn image_attrs() -> Vec<String> {
        strings(&["src", "data-src"])
    }

    pub fn structured() -> Vec<AttrSelector> {
        vec![
            AttrSelector::new("meta[property='article:published_time']", Some("content")),
            AttrSelector::new("meta[itemprop='datePublished']", Some("content")),
            AttrSelector::new("time[datetime]", Some("datetime")),
        ]
    }
    pub fn json_ld() -> bool {
        true
    }
    pub fn human() -> Vec<String> {
        strings(&["a.link.link--date", ".link--date", "time"])
    }
    pub fn formats() -> Vec<String> {
        strings(&["%d %b %Y", "%d %B %Y", "%B %d, %Y", "%b %d, %Y"])
    }
}
