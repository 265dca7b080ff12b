use chrono::{DateTime, FixedOffset, TimeZone};
use thiserror::Error;
use tracing::debug;

use super::date_shape;
use super::dates::{DateParser, FormatDateParser};
use super::{FieldKind, RawField, Record};

/// Why a candidate item produced no record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("item has no title text")]
    MissingTitle,

    #[error("item has neither a link nor date text")]
    MissingLinkAndDate,
}

/// Offset used when none is configured (UTC+08:00).
pub fn default_offset() -> FixedOffset {
    FixedOffset::east_opt(8 * 3600).expect("UTC+08:00 is a valid offset")
}

/// Normalizes raw field strings into [`Record`]s.
///
/// Parsed dates get the configured fixed offset attached; the timezone is
/// never inferred from page content.
pub struct RecordAssembler {
    offset: FixedOffset,
    parser: Box<dyn DateParser + Send + Sync>,
}

impl RecordAssembler {
    pub fn new(offset: FixedOffset) -> Self {
        Self::with_parser(offset, FormatDateParser)
    }

    pub fn with_parser<P>(offset: FixedOffset, parser: P) -> Self
    where
        P: DateParser + Send + Sync + 'static,
    {
        Self {
            offset,
            parser: Box::new(parser),
        }
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Build a record, or `None` when the item is not a usable entry.
    pub fn assemble(&self, title: &str, link: Option<&str>, date_text: &str) -> Option<Record> {
        self.try_assemble(title, link, date_text).ok()
    }

    pub fn try_assemble(
        &self,
        title: &str,
        link: Option<&str>,
        date_text: &str,
    ) -> Result<Record, Rejection> {
        let title = title.trim();
        if title.is_empty() {
            return Err(Rejection::MissingTitle);
        }

        let link = link.map(str::trim).filter(|l| !l.is_empty());
        let raw_date_text = date_text.trim();
        if link.is_none() && raw_date_text.is_empty() {
            return Err(Rejection::MissingLinkAndDate);
        }

        let date = self.parse_date(raw_date_text);
        if date.is_none() && !raw_date_text.is_empty() {
            debug!("Keeping record {:?} without a parsed date ({:?})", title, raw_date_text);
        }

        Ok(Record {
            title: title.to_string(),
            link: link.map(str::to_string),
            date,
            raw_date_text: raw_date_text.to_string(),
        })
    }

    /// Assemble from a field triple as produced by the extractor.
    pub fn assemble_fields(&self, fields: &[RawField]) -> Result<Record, Rejection> {
        let field = |kind: FieldKind| fields.iter().find(|f| f.kind == kind);

        let title = field(FieldKind::Title).map(|f| f.text.as_str()).unwrap_or("");
        let link = field(FieldKind::Link).and_then(|f| f.attribute_value.as_deref());
        let date = field(FieldKind::Date).map(|f| f.text.as_str()).unwrap_or("");
        self.try_assemble(title, link, date)
    }

    /// Parse the whole text first, then its first date-shaped fragment.
    fn parse_date(&self, text: &str) -> Option<DateTime<FixedOffset>> {
        if text.is_empty() {
            return None;
        }
        let naive = self.parser.parse(text).or_else(|| {
            date_shape::find_first_match(text)
                .filter(|fragment| *fragment != text)
                .and_then(|fragment| self.parser.parse(fragment))
        })?;
        self.offset.from_local_datetime(&naive).single()
    }
}

impl Default for RecordAssembler {
    fn default() -> Self {
        Self::new(default_offset())
    }
}
