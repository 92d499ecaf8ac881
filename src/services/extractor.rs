// src/services/extractor.rs

//! Listing and article-page extraction.
//!
//! Selectors are compiled once; every field is read through an ordered
//! chain where the first selector yielding a non-empty value wins.

use chrono::NaiveDate;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{DateSelectors, ListingSelectors, RawArticle};
use crate::utils::date::{parse_human, parse_structured};
use crate::utils::{normalize_whitespace, resolve_url};

/// Compile a CSS selector, mapping failures to a configuration error.
pub fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

/// Ordered fallback list of compiled selectors.
#[derive(Debug, Clone)]
struct SelectorChain(Vec<Selector>);

impl SelectorChain {
    fn compile(selectors: &[String]) -> Result<Self> {
        selectors
            .iter()
            .map(|s| parse_selector(s))
            .collect::<Result<Vec<_>>>()
            .map(Self)
    }

    /// Matches of the first selector that matches anything in the document.
    fn select_all<'a>(&self, document: &'a Html) -> Vec<ElementRef<'a>> {
        self.0
            .iter()
            .map(|sel| document.select(sel).collect::<Vec<_>>())
            .find(|matches| !matches.is_empty())
            .unwrap_or_default()
    }

    /// First element under `scope` accepted by `accept`, trying each selector in turn.
    fn find<'a, F>(&self, scope: ElementRef<'a>, accept: F) -> Option<ElementRef<'a>>
    where
        F: Fn(&ElementRef<'a>) -> bool,
    {
        self.0
            .iter()
            .find_map(|sel| scope.select(sel).find(|el| accept(el)))
    }

    /// First non-empty, whitespace-normalized text under `scope`.
    fn text(&self, scope: ElementRef<'_>) -> Option<String> {
        self.0.iter().find_map(|sel| {
            scope
                .select(sel)
                .map(|el| element_text(&el))
                .find(|text| !text.is_empty())
        })
    }
}

fn element_text(element: &ElementRef<'_>) -> String {
    normalize_whitespace(&element.text().collect::<String>())
}

fn non_empty_attr<'a>(element: &ElementRef<'a>, attr: &str) -> Option<&'a str> {
    element
        .value()
        .attr(attr)
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Extracts article cards from a listing page or AJAX fragment.
#[derive(Debug, Clone)]
pub struct ListingExtractor {
    base_url: Url,
    card: SelectorChain,
    link: SelectorChain,
    title: SelectorChain,
    link_attr: String,
    category: SelectorChain,
    summary: SelectorChain,
    author: SelectorChain,
    author_prefixes: Vec<String>,
    image: SelectorChain,
    image_attrs: Vec<String>,
}

impl ListingExtractor {
    /// Compile the listing selectors. Image sources are resolved against `base_url`.
    pub fn new(selectors: &ListingSelectors, base_url: Url) -> Result<Self> {
        Ok(Self {
            base_url,
            card: SelectorChain::compile(&selectors.card)?,
            link: SelectorChain::compile(&selectors.link)?,
            title: SelectorChain::compile(&selectors.title)?,
            link_attr: selectors.link_attr.clone(),
            category: SelectorChain::compile(&selectors.category)?,
            summary: SelectorChain::compile(&selectors.summary)?,
            author: SelectorChain::compile(&selectors.author)?,
            author_prefixes: selectors.author_prefixes.clone(),
            image: SelectorChain::compile(&selectors.image)?,
            image_attrs: selectors.image_attrs.clone(),
        })
    }

    /// Extract entries in page order.
    ///
    /// Cards without a title or link are dropped; missing optional fields
    /// are left empty.
    pub fn extract(&self, html: &str) -> Vec<RawArticle> {
        let document = Html::parse_document(html);
        let cards = self.card.select_all(&document);
        log::debug!("Found {} article cards", cards.len());

        cards
            .into_iter()
            .filter_map(|card| self.parse_card(card))
            .collect()
    }

    fn parse_card(&self, card: ElementRef<'_>) -> Option<RawArticle> {
        let Some(link) = self
            .link
            .find(card, |el| non_empty_attr(el, &self.link_attr).is_some())
        else {
            log::debug!("Skipping card: no link with '{}'", self.link_attr);
            return None;
        };
        let href = non_empty_attr(&link, &self.link_attr)?.to_string();

        let title = self.title.text(card).unwrap_or_else(|| element_text(&link));
        if title.is_empty() {
            log::debug!("Skipping card: empty title for {}", href);
            return None;
        }

        Some(RawArticle {
            title,
            href,
            category: self.category.text(card),
            summary: self.summary.text(card),
            author: self.author.text(card).and_then(|a| self.strip_author_prefix(a)),
            image_url: self.image_url(card),
        })
    }

    fn strip_author_prefix(&self, author: String) -> Option<String> {
        let stripped = self
            .author_prefixes
            .iter()
            .find_map(|prefix| author.strip_prefix(prefix.as_str()))
            .unwrap_or(&author)
            .trim();
        (!stripped.is_empty()).then(|| stripped.to_string())
    }

    fn image_url(&self, card: ElementRef<'_>) -> Option<String> {
        let image = self.image.find(card, |el| self.image_source(el).is_some())?;
        self.image_source(&image)
            .map(|src| resolve_url(&self.base_url, src))
    }

    /// First usable source attribute; inline `data:` placeholders are skipped.
    fn image_source<'a>(&self, element: &ElementRef<'a>) -> Option<&'a str> {
        self.image_attrs
            .iter()
            .filter_map(|attr| non_empty_attr(element, attr))
            .find(|src| !src.starts_with("data:"))
    }
}

/// Extracts the publication date from an article page.
#[derive(Debug, Clone)]
pub struct DateExtractor {
    structured: Vec<(Selector, Option<String>)>,
    json_ld: Option<Selector>,
    human: SelectorChain,
    formats: Vec<String>,
}

impl DateExtractor {
    pub fn new(selectors: &DateSelectors) -> Result<Self> {
        let structured = selectors
            .structured
            .iter()
            .map(|s| Ok((parse_selector(&s.selector)?, s.attr.clone())))
            .collect::<Result<Vec<_>>>()?;
        let json_ld = if selectors.json_ld {
            Some(parse_selector("script[type='application/ld+json']")?)
        } else {
            None
        };

        Ok(Self {
            structured,
            json_ld,
            human: SelectorChain::compile(&selectors.human)?,
            formats: selectors.formats.clone(),
        })
    }

    /// Find the publication date.
    ///
    /// Machine-readable fields are preferred, then JSON-LD, then the visible
    /// date text. Returns `None` when nothing parses.
    pub fn extract(&self, html: &str) -> Option<NaiveDate> {
        let document = Html::parse_document(html);

        self.from_structured(&document)
            .or_else(|| self.from_json_ld(&document))
            .or_else(|| self.from_human(&document))
    }

    fn from_structured(&self, document: &Html) -> Option<NaiveDate> {
        self.structured.iter().find_map(|(selector, attr)| {
            document.select(selector).find_map(|el| match attr {
                Some(attr) => el.value().attr(attr).and_then(parse_structured),
                None => parse_structured(&element_text(&el)),
            })
        })
    }

    fn from_json_ld(&self, document: &Html) -> Option<NaiveDate> {
        let selector = self.json_ld.as_ref()?;
        document.select(selector).find_map(|script| {
            let raw: String = script.text().collect();
            let json: Value = serde_json::from_str(raw.trim()).ok()?;
            find_date_published(&json).and_then(parse_structured)
        })
    }

    fn from_human(&self, document: &Html) -> Option<NaiveDate> {
        let root = document.root_element();
        self.human.0.iter().find_map(|selector| {
            root.select(selector).find_map(|el| {
                let text = element_text(&el);
                let parsed = parse_human(&text, &self.formats);
                if parsed.is_none() && !text.is_empty() {
                    log::debug!("Date text '{}' matches no known format", text);
                }
                parsed
            })
        })
    }
}

/// Depth-first search for a string `datePublished` (handles `@graph` arrays).
fn find_date_published(value: &Value) -> Option<&str> {
    match value {
        Value::Object(map) => map
            .get("datePublished")
            .and_then(Value::as_str)
            .or_else(|| map.values().find_map(find_date_published)),
        Value::Array(items) => items.iter().find_map(find_date_published),
        _ => None,
    }
}
