//! Decoder implementations
//!
//! Each decoder handles one page layout of the certification site.

use super::types::{Decoded, PageDecoder};
use crate::error::{Error, Result};
use crate::types::{DecoderKind, MatchedRecord, OptionStringExt};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

/// Any character from the Thai block (ก to ๙)
static THAI_TEXT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ก-๙]").unwrap());

/// Build the decoder for a configured page layout
pub fn build_decoder(kind: DecoderKind) -> Result<Box<dyn PageDecoder>> {
    Ok(match kind {
        DecoderKind::SummaryTable => Box::new(SummaryTableDecoder::new()?),
        DecoderKind::DetailTable => Box::new(DetailTableDecoder::new()?),
        DecoderKind::Heading => Box::new(HeadingDecoder::new()?),
    })
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| Error::selector(css, format!("{e:?}")))
}

/// Collapse the text content of an element into single-spaced text
fn element_text(element: &ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

// ============================================================================
// Summary Table Decoder
// ============================================================================

/// Decoder for the four-column search result table
///
/// Reads the first `table.table tbody tr` row as Type | Brand | Model | Cert-No.
#[derive(Debug, Clone)]
pub struct SummaryTableDecoder {
    rows: Selector,
    cells: Selector,
}

impl SummaryTableDecoder {
    /// Create a new summary table decoder
    pub fn new() -> Result<Self> {
        Ok(Self {
            rows: selector("table.table tbody tr")?,
            cells: selector("td")?,
        })
    }
}

impl PageDecoder for SummaryTableDecoder {
    fn decode(&self, id: u64, body: &str) -> Result<Decoded> {
        let document = Html::parse_document(body);
        let Some(row) = document.select(&self.rows).next() else {
            return Ok(Decoded::Empty);
        };

        let mut cells = row
            .select(&self.cells)
            .map(|cell| element_text(&cell).none_if_empty());

        let record = MatchedRecord {
            category: cells.next().flatten(),
            brand: cells.next().flatten(),
            model: cells.next().flatten(),
            certificate_number: cells.next().flatten(),
            ..MatchedRecord::new(id)
        };

        if record.is_empty() {
            Ok(Decoded::Empty)
        } else {
            Ok(Decoded::Record(record))
        }
    }
}

// ============================================================================
// Detail Table Decoder
// ============================================================================

/// Field a detail-page label maps to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DetailField {
    Subcategory,
    Category,
    Company,
    Certificate,
    Brand,
    Model,
    Name,
}

/// Label keywords in English and Thai, checked in order
const DETAIL_LABELS: &[(DetailField, &[&str])] = &[
    (DetailField::Subcategory, &["subcategory", "sub-category", "ประเภทย่อย"]),
    (DetailField::Company, &["company", "applicant", "บริษัท", "ผู้ยื่น"]),
    (
        DetailField::Certificate,
        &["certificate", "certification", "cert", "เลขที่", "หนังสือรับรอง"],
    ),
    (DetailField::Brand, &["brand", "manufacturer", "ยี่ห้อ", "ตราอักษร"]),
    (DetailField::Model, &["model", "รุ่น"]),
    (DetailField::Category, &["category", "type", "ประเภท"]),
    (DetailField::Name, &["name", "ชื่อ"]),
];

fn classify_label(label: &str) -> Option<DetailField> {
    let label = label.to_lowercase();
    DETAIL_LABELS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| label.contains(k)))
        .map(|(field, _)| *field)
}

/// Decoder for detail pages laid out as label/value rows
///
/// A sub-category row wins over a plain category row.
#[derive(Debug, Clone)]
pub struct DetailTableDecoder {
    rows: Selector,
    cells: Selector,
}

impl DetailTableDecoder {
    /// Create a new detail table decoder
    pub fn new() -> Result<Self> {
        Ok(Self {
            rows: selector("tr")?,
            cells: selector("th, td")?,
        })
    }
}

impl PageDecoder for DetailTableDecoder {
    fn decode(&self, id: u64, body: &str) -> Result<Decoded> {
        let document = Html::parse_document(body);
        let mut record = MatchedRecord::new(id);
        let mut subcategory = None;

        for row in document.select(&self.rows) {
            let cells: Vec<String> = row
                .select(&self.cells)
                .map(|cell| element_text(&cell))
                .collect();
            let [label, value, ..] = cells.as_slice() else {
                continue;
            };
            let Some(value) = value.clone().none_if_empty() else {
                continue;
            };

            let slot = match classify_label(label) {
                Some(DetailField::Subcategory) => &mut subcategory,
                Some(DetailField::Category) => &mut record.category,
                Some(DetailField::Company) => &mut record.company,
                Some(DetailField::Certificate) => &mut record.certificate_number,
                Some(DetailField::Brand) => &mut record.brand,
                Some(DetailField::Model) => &mut record.model,
                Some(DetailField::Name) => &mut record.name,
                None => continue,
            };
            slot.get_or_insert(value);
        }

        if subcategory.is_some() {
            record.category = subcategory;
        }

        if record.is_empty() {
            Ok(Decoded::Empty)
        } else {
            Ok(Decoded::Record(record))
        }
    }
}

// ============================================================================
// Heading Decoder
// ============================================================================

/// Decoder that takes the device name from the first Thai `h2`/`h3`
#[derive(Debug, Clone)]
pub struct HeadingDecoder {
    headings: Vec<Selector>,
}

impl HeadingDecoder {
    /// Create a new heading decoder
    pub fn new() -> Result<Self> {
        Ok(Self {
            headings: vec![selector("h2")?, selector("h3")?],
        })
    }
}

impl PageDecoder for HeadingDecoder {
    fn decode(&self, id: u64, body: &str) -> Result<Decoded> {
        let document = Html::parse_document(body);

        let name = self
            .headings
            .iter()
            .filter_map(|sel| document.select(sel).next())
            .map(|heading| element_text(&heading))
            .find(|text| THAI_TEXT.is_match(text));

        Ok(match name {
            Some(name) => Decoded::Record(MatchedRecord {
                name: Some(name),
                ..MatchedRecord::new(id)
            }),
            None => Decoded::Empty,
        })
    }
}
