//! HTML parser for extracting raw match records
//!
//! A listing page groups match items under date labels. Labels and cards
//! are siblings rather than parent and child, so the Nth label is paired
//! with the Nth card by document order. Field extraction inside a match item
//! is driven by the [`FIELD_RULES`] table.

use crate::ScrapeError;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Date headers, one per card
pub const LABEL_SELECTOR: &str = r#"div[class="wf-label mod-large"]"#;

/// Cards holding the match items of one date
pub const CARD_SELECTOR: &str = r#"div[class="wf-card"]"#;

/// One match entry inside a card
pub const MATCH_ITEM_SELECTOR: &str = "a.wf-module-item.match-item";

/// Fields a rule can fill on a [`RawRecord`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Time,
    Event,
    Stakes,
    /// Repeated: every match contributes one tag
    StatTag,
}

/// How text is taken from a matched element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extract {
    /// Only the element's direct text nodes, joined
    OwnText,
    /// All descendant text
    Text,
}

/// Maps one record field to a selector relative to the match item
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub field: Field,
    pub selector: &'static str,
    pub extract: Extract,
}

/// Per-field extraction rules, applied to every match item
pub const FIELD_RULES: &[FieldRule] = &[
    FieldRule {
        field: Field::Time,
        selector: r#"div[class="match-item-time"]"#,
        extract: Extract::OwnText,
    },
    FieldRule {
        field: Field::Event,
        selector: r#"div[class="match-item-event text-of"]"#,
        extract: Extract::OwnText,
    },
    FieldRule {
        field: Field::Stakes,
        selector: r#"div[class="match-item-event-series text-of"]"#,
        extract: Extract::Text,
    },
    FieldRule {
        field: Field::StatTag,
        selector: r#"div[class="match-item-vod"] > div[class="wf-tag mod-big"]"#,
        extract: Extract::Text,
    },
];

/// String fields of one match, as found in the markup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    /// 1-indexed listing page
    pub page: u32,
    /// Text of the date label the match was listed under
    pub date_label: String,
    /// `href` of the match item
    pub url: String,
    /// Integer path segment after the site root of `url`
    pub match_id: Option<i64>,
    pub time: String,
    pub event: String,
    /// Empty when the item has no series label
    pub stakes: String,
    pub stat_tags: Vec<String>,
}

impl RawRecord {
    fn apply<I>(&mut self, field: Field, mut values: I)
    where
        I: Iterator<Item = String>,
    {
        match field {
            Field::Time => self.time = values.next().unwrap_or_default(),
            Field::Event => self.event = values.next().unwrap_or_default(),
            Field::Stakes => self.stakes = values.next().unwrap_or_default(),
            Field::StatTag => self.stat_tags.extend(values.filter(|v| !v.is_empty())),
        }
    }
}

impl Extract {
    fn apply(&self, element: ElementRef<'_>) -> String {
        match self {
            Self::OwnText => own_text(element),
            Self::Text => element.text().collect::<String>().trim().to_string(),
        }
    }
}

/// Joins the direct text children of an element and trims the result
fn own_text(element: ElementRef<'_>) -> String {
    let mut text = String::new();
    for child in element.children() {
        if let Some(node) = child.value().as_text() {
            text.push_str(node);
        }
    }
    text.trim().to_string()
}

/// Extracts the match id from a match href
///
/// Both `/184234/team-a-vs-team-b` and absolute URLs on the site are
/// accepted.
pub fn match_id_from_href(href: &str) -> Option<i64> {
    let path = match Url::parse(href) {
        Ok(url) => url.path().to_string(),
        Err(_) => href.split(['?', '#']).next().unwrap_or_default().to_string(),
    };

    path.trim_start_matches('/').split('/').next()?.parse().ok()
}

fn compile(selector: &str) -> Result<Selector, ScrapeError> {
    Selector::parse(selector).map_err(|e| ScrapeError::Selector {
        selector: selector.to_string(),
        message: e.to_string(),
    })
}

/// Turns listing pages into raw records
///
/// Selectors are compiled once, when the parser is built.
pub struct PageParser {
    label: Selector,
    card: Selector,
    match_item: Selector,
    fields: Vec<(FieldRule, Selector)>,
}

impl PageParser {
    /// Builds a parser from the default selector table
    pub fn new() -> Result<Self, ScrapeError> {
        Self::with_rules(LABEL_SELECTOR, CARD_SELECTOR, MATCH_ITEM_SELECTOR, FIELD_RULES)
    }

    /// Builds a parser from custom selectors
    ///
    /// # Returns
    ///
    /// * `Ok(PageParser)` - All selectors compiled
    /// * `Err(ScrapeError::Selector)` - A selector failed to parse
    pub fn with_rules(
        label: &str,
        card: &str,
        match_item: &str,
        rules: &[FieldRule],
    ) -> Result<Self, ScrapeError> {
        let fields = rules
            .iter()
            .map(|rule| Ok((*rule, compile(rule.selector)?)))
            .collect::<Result<Vec<_>, ScrapeError>>()?;

        Ok(Self {
            label: compile(label)?,
            card: compile(card)?,
            match_item: compile(match_item)?,
            fields,
        })
    }

    /// Lazily yields the records of a parsed page in document order
    ///
    /// Surplus labels or cards are ignored. The iterator only borrows the
    /// document; calling this again walks the page from the start.
    pub fn parse<'a>(
        &'a self,
        document: &'a Html,
        page: u32,
    ) -> impl Iterator<Item = RawRecord> + 'a {
        let labels = document.select(&self.label);
        let cards = document.select(&self.card);

        labels.zip(cards).flat_map(move |(label, card)| {
            let date_label = own_text(label);
            card.select(&self.match_item)
                .map(move |item| self.extract(item, &date_label, page))
        })
    }

    /// Parses raw HTML and collects every record of the page
    pub fn parse_html(&self, html: &str, page: u32) -> Vec<RawRecord> {
        let document = Html::parse_document(html);
        self.parse(&document, page).collect()
    }

    fn extract(&self, item: ElementRef<'_>, date_label: &str, page: u32) -> RawRecord {
        let url = item.value().attr("href").unwrap_or_default().trim().to_string();

        let mut record = RawRecord {
            page,
            date_label: date_label.to_string(),
            match_id: match_id_from_href(&url),
            url,
            ..RawRecord::default()
        };

        for (rule, selector) in &self.fields {
            let values = item.select(selector).map(|element| rule.extract.apply(element));
            record.apply(rule.field, values);
        }

        record
    }
}
