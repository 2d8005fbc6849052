//! Turns a rendered result page into [`CandidateRecord`]s.
//!
//! Field text is taken as rendered; cleanup happens later during
//! normalization. A panel without a name or address element is dropped and
//! reported as an [`ExtractionWarning`].

use outletdb_core::CandidateRecord;
use scraper::{ElementRef, Html, Selector};

use crate::error::ExtractError;
use crate::navigator::RawPage;

/// CSS selectors describing one result panel. Field selectors are evaluated
/// relative to the panel element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelSelectors {
    pub panel: String,
    pub name: String,
    /// The first match is the postal address, the second the telephone.
    pub address: String,
    /// Facility badge labels; every match is kept.
    pub facilities: String,
    /// Anchor whose `href` is the map link.
    pub map_link: String,
}

impl Default for PanelSelectors {
    fn default() -> Self {
        Self {
            panel: "div.addressTop".to_string(),
            name: "a.addressTitle strong".to_string(),
            address: "p.addressText".to_string(),
            facilities: "a.ed-tooltip > span.ed-tooltiptext".to_string(),
            map_link: "a[href*=\"waze.com\"]".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionWarning {
    pub page: u32,
    /// 0-based position of the panel on its page.
    pub panel_index: usize,
    pub missing_field: &'static str,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageExtraction {
    pub candidates: Vec<CandidateRecord>,
    pub warnings: Vec<ExtractionWarning>,
}

/// Pre-parsed [`PanelSelectors`].
#[derive(Debug, Clone)]
pub struct PanelExtractor {
    panel: Selector,
    name: Selector,
    address: Selector,
    facilities: Selector,
    map_link: Selector,
}

fn parse_selector(selector: &str) -> Result<Selector, ExtractError> {
    Selector::parse(selector).map_err(|e| ExtractError::InvalidSelector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

fn record_warning(
    extraction: &mut PageExtraction,
    page: u32,
    panel_index: usize,
    missing_field: &'static str,
) {
    tracing::warn!(page, panel_index, missing_field, "dropping result panel");
    extraction.warnings.push(ExtractionWarning {
        page,
        panel_index,
        missing_field,
    });
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect()
}

fn first_text(panel: ElementRef<'_>, selector: &Selector) -> Option<String> {
    panel.select(selector).next().map(element_text)
}

impl PanelExtractor {
    /// # Errors
    ///
    /// Returns [`ExtractError::InvalidSelector`] if any selector does not parse.
    pub fn new(selectors: &PanelSelectors) -> Result<Self, ExtractError> {
        Ok(Self {
            panel: parse_selector(&selectors.panel)?,
            name: parse_selector(&selectors.name)?,
            address: parse_selector(&selectors.address)?,
            facilities: parse_selector(&selectors.facilities)?,
            map_link: parse_selector(&selectors.map_link)?,
        })
    }

    /// Extracts every panel on `page`. Never fails; an empty page yields an
    /// empty extraction.
    #[must_use]
    pub fn extract(&self, page: &RawPage) -> PageExtraction {
        let mut extraction = PageExtraction::default();
        if page.html.is_empty() {
            return extraction;
        }

        let document = Html::parse_document(&page.html);
        for (panel_index, panel) in document.select(&self.panel).enumerate() {
            let Some(name) = first_text(panel, &self.name) else {
                record_warning(&mut extraction, page.page_number, panel_index, "name");
                continue;
            };
            let mut address_lines = panel.select(&self.address).map(element_text);
            let Some(address) = address_lines.next() else {
                record_warning(&mut extraction, page.page_number, panel_index, "address");
                continue;
            };
            let telephone = address_lines.next();

            let facilities = panel.select(&self.facilities).map(element_text).collect();
            let map_link = panel
                .select(&self.map_link)
                .next()
                .and_then(|a| a.value().attr("href"))
                .map(str::to_string);

            extraction.candidates.push(CandidateRecord {
                page: page.page_number,
                name,
                address,
                telephone,
                facilities,
                map_link,
            });
        }

        tracing::debug!(
            page = page.page_number,
            candidates = extraction.candidates.len(),
            warnings = extraction.warnings.len(),
            "extracted result panels"
        );
        extraction
    }
}

#[cfg(test)]
#[path = "extract_test.rs"]
mod tests;
