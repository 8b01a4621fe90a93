//! Player detail pages.
//!
//! A detail page yields one [`PlayerRecord`]: seven identity fields located
//! through independent lookups, then every value in the attribute panel.
//!
//! # Identity Lookups
//!
//! | Field | Anchor |
//! |-------|--------|
//! | name | `.headertitle` → first `h1` |
//! | club | `.titleDetails` → `img[alt="Badge"]` → parent |
//! | nation | `.titleDetails` → `img[alt="Nation"]` → parent |
//! | age | text `Age` → grandparent → next text fragment |
//! | position | text `Positions` → grandparent → first `b` |
//! | overall | text `OVR` → grandparent → first `div` |
//! | potential | text `POT` → grandparent → first `div` |
//!
//! A lookup that finds nothing yields [`PLACEHOLDER`]. Youth players with no
//! club are common, so this is not logged.
//!
//! # Attribute Panel
//!
//! `.row.stats` → each `.col-2` group → each `.individual-stat-bar-stat`,
//! all in document order. A page without the panel cannot produce a record.

use crate::error::ExtractionError;
use crate::models::{IDENTITY_FIELD_COUNT, PLACEHOLDER, PlayerRecord};
use crate::utils::normalize_text;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

static HEADER_TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse(".headertitle").unwrap());
static H1: Lazy<Selector> = Lazy::new(|| Selector::parse("h1").unwrap());
static TITLE_DETAILS: Lazy<Selector> = Lazy::new(|| Selector::parse(".titleDetails").unwrap());
static BADGE_IMG: Lazy<Selector> = Lazy::new(|| Selector::parse(r#"img[alt="Badge"]"#).unwrap());
static NATION_IMG: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"img[alt="Nation"]"#).unwrap());
static BOLD: Lazy<Selector> = Lazy::new(|| Selector::parse("b").unwrap());
static DIV: Lazy<Selector> = Lazy::new(|| Selector::parse("div").unwrap());
static STATS_PANEL: Lazy<Selector> = Lazy::new(|| Selector::parse(".row.stats").unwrap());
static STATS_GROUP: Lazy<Selector> = Lazy::new(|| Selector::parse(".col-2").unwrap());
static STAT_VALUE: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".individual-stat-bar-stat").unwrap());

/// Locates one identity field, or reports it missing.
pub type FieldLookup = fn(&Html) -> Option<String>;

/// Identity fields in output order.
pub const IDENTITY_FIELDS: [(&str, FieldLookup); IDENTITY_FIELD_COUNT] = [
    ("name", lookup_name),
    ("club", lookup_club),
    ("nation", lookup_nation),
    ("age", lookup_age),
    ("position", lookup_position),
    ("overall", lookup_overall),
    ("potential", lookup_potential),
];

fn text_of(element: ElementRef<'_>) -> Option<String> {
    normalize_text(&element.text().collect::<String>())
}

fn lookup_name(doc: &Html) -> Option<String> {
    let title = doc.select(&HEADER_TITLE).next()?;
    text_of(title.select(&H1).next()?)
}

fn title_detail_by_image(doc: &Html, image: &Selector) -> Option<String> {
    let details = doc.select(&TITLE_DETAILS).next()?;
    let img = details.select(image).next()?;
    text_of(ElementRef::wrap(img.parent()?)?)
}

fn lookup_club(doc: &Html) -> Option<String> {
    title_detail_by_image(doc, &BADGE_IMG)
}

fn lookup_nation(doc: &Html) -> Option<String> {
    title_detail_by_image(doc, &NATION_IMG)
}

/// The element two levels above the first text node reading exactly `label`.
fn label_container<'a>(doc: &'a Html, label: &str) -> Option<ElementRef<'a>> {
    let text_node = doc
        .tree
        .root()
        .descendants()
        .find(|node| node.value().as_text().is_some_and(|t| t.trim() == label))?;
    let holder = text_node.parent()?;
    ElementRef::wrap(holder.parent()?)
}

fn lookup_age(doc: &Html) -> Option<String> {
    let container = label_container(doc, "Age")?;
    let mut fragments = container.text().map(str::trim).filter(|t| !t.is_empty());
    fragments.find(|t| *t == "Age")?;
    normalize_text(fragments.next()?)
}

fn lookup_position(doc: &Html) -> Option<String> {
    text_of(label_container(doc, "Positions")?.select(&BOLD).next()?)
}

fn lookup_overall(doc: &Html) -> Option<String> {
    text_of(label_container(doc, "OVR")?.select(&DIV).next()?)
}

fn lookup_potential(doc: &Html) -> Option<String> {
    text_of(label_container(doc, "POT")?.select(&DIV).next()?)
}

/// Attribute values in panel order, or `None` if there is no panel.
fn attribute_values(doc: &Html) -> Option<Vec<String>> {
    let panel = doc.select(&STATS_PANEL).next()?;
    let values = panel
        .select(&STATS_GROUP)
        .flat_map(|group| group.select(&STAT_VALUE))
        .map(|stat| text_of(stat).unwrap_or_else(|| PLACEHOLDER.to_string()))
        .collect();
    Some(values)
}

/// Builds [`PlayerRecord`]s from parsed detail pages.
///
/// The default extractor accepts any number of attribute values.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlayerExtractor {
    attribute_count: Option<usize>,
}

impl PlayerExtractor {
    /// Extractor producing exactly `attribute_count` attribute fields.
    ///
    /// Pages with fewer values are padded with [`PLACEHOLDER`]; pages with
    /// more values than the header has columns are rejected.
    pub fn with_attribute_count(attribute_count: usize) -> Self {
        Self {
            attribute_count: Some(attribute_count),
        }
    }

    /// Extract one record from a detail page.
    ///
    /// # Errors
    ///
    /// [`ExtractionError::StructureMismatch`] if the attribute panel is
    /// missing or empty, or holds more values than the schema allows.
    pub fn extract(&self, doc: &Html) -> Result<PlayerRecord, ExtractionError> {
        let identity = IDENTITY_FIELDS
            .map(|(_, lookup)| lookup(doc).unwrap_or_else(|| PLACEHOLDER.to_string()));

        let mut attributes = attribute_values(doc)
            .ok_or_else(|| ExtractionError::mismatch("attribute panel missing"))?;

        if attributes.is_empty() && self.attribute_count != Some(0) {
            return Err(ExtractionError::mismatch("attribute panel has no values"));
        }

        if let Some(expected) = self.attribute_count {
            if attributes.len() > expected {
                return Err(ExtractionError::mismatch(format!(
                    "attribute panel has {} values, schema has {} attribute columns",
                    attributes.len(),
                    expected
                )));
            }
            attributes.resize(expected, PLACEHOLDER.to_string());
        }

        Ok(PlayerRecord::new(identity, attributes))
    }
}
