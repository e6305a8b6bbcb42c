use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Workspace-wide result alias.
pub type Result<T> = color_eyre::eyre::Result<T>;

pub const ID_COLUMN: &str = "id";
pub const TYPE_COLUMN: &str = "type";
pub const QUANTITY_COLUMN: &str = "quantity";

/// Columns that carry row metadata rather than translations.
pub const RESERVED_COLUMNS: [&str; 3] = [ID_COLUMN, TYPE_COLUMN, QUANTITY_COLUMN];

/// One row of the source table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    pub id: String,
    /// Raw `type` cell; classified later by the normalizer.
    pub kind: String,
    /// Raw `quantity` cell, `None` when the column is absent.
    pub quantity: Option<String>,
    /// Every non-reserved cell keyed by its header name.
    pub cells: HashMap<String, String>,
    /// 1-based sheet row (the header is row 1).
    pub row: usize,
}

impl Record {
    /// Text of the given language column; absent columns read as empty.
    pub fn cell(&self, lang: &str) -> &str {
        self.cells.get(lang).map(String::as_str).unwrap_or("")
    }
}

/// CLDR plural category. Declaration order is the emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quantity {
    Zero,
    One,
    Two,
    Few,
    Many,
    Other,
}

impl Quantity {
    pub const ALL: [Quantity; 6] = [
        Quantity::Zero,
        Quantity::One,
        Quantity::Two,
        Quantity::Few,
        Quantity::Many,
        Quantity::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Quantity::Zero => "zero",
            Quantity::One => "one",
            Quantity::Two => "two",
            Quantity::Few => "few",
            Quantity::Many => "many",
            Quantity::Other => "other",
        }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown quantity '{0}' (expected zero, one, two, few, many or other)")]
pub struct QuantityParseError(pub String);

impl FromStr for Quantity {
    type Err = QuantityParseError;

    /// Accepts surrounding whitespace and any letter case.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let norm = s.trim().to_lowercase();
        Quantity::ALL
            .into_iter()
            .find(|q| q.as_str() == norm)
            .ok_or_else(|| QuantityParseError(s.trim().to_string()))
    }
}

/// A translation for one id in one language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalizedEntry {
    Simple {
        id: String,
        text: String,
    },
    Plural {
        id: String,
        items: BTreeMap<Quantity, String>,
    },
}

impl LocalizedEntry {
    pub fn id(&self) -> &str {
        match self {
            LocalizedEntry::Simple { id, .. } | LocalizedEntry::Plural { id, .. } => id,
        }
    }
}

/// All entries for one language, in first-appearance order of their ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceDocument {
    pub lang: String,
    pub entries: Vec<LocalizedEntry>,
}

impl ResourceDocument {
    pub fn new(lang: impl Into<String>) -> Self {
        Self {
            lang: lang.into(),
            entries: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn simple_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e, LocalizedEntry::Simple { .. }))
            .count()
    }

    pub fn plural_count(&self) -> usize {
        self.entries.len() - self.simple_count()
    }

    pub fn get(&self, id: &str) -> Option<&LocalizedEntry> {
        self.entries.iter().find(|e| e.id() == id)
    }
}

/// Why a row was skipped (or, for `KindConflict`, overridden).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "kebab-case")]
pub enum WarningKind {
    MissingId,
    MissingType,
    UnknownType(String),
    MissingQuantity,
    InvalidQuantity(String),
    KindConflict,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowWarning {
    pub row: usize,
    pub id: String,
    #[serde(flatten)]
    pub kind: WarningKind,
}

impl RowWarning {
    /// `KindConflict` keeps the row; every other kind drops it.
    pub fn skips_row(&self) -> bool {
        !matches!(self.kind, WarningKind::KindConflict)
    }
}

impl fmt::Display for RowWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {}", self.row)?;
        if !self.id.is_empty() {
            write!(f, " ({})", self.id)?;
        }
        match &self.kind {
            WarningKind::MissingId => f.write_str(": empty id, row skipped"),
            WarningKind::MissingType => f.write_str(": empty type, row skipped"),
            WarningKind::UnknownType(t) => write!(f, ": unknown type '{t}', row skipped"),
            WarningKind::MissingQuantity => f.write_str(": plural without quantity, row skipped"),
            WarningKind::InvalidQuantity(q) => write!(f, ": invalid quantity '{q}', row skipped"),
            WarningKind::KindConflict => {
                f.write_str(": id already used with another type, earlier entry replaced")
            }
        }
    }
}

/// Outcome of generating one language file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageReport {
    pub lang: String,
    pub path: String,
    pub strings: usize,
    pub plurals: usize,
    pub written: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub records: usize,
    pub skipped: usize,
    pub warnings: Vec<RowWarning>,
    pub languages: Vec<LanguageReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
}

impl RunSummary {
    pub fn failed(&self) -> impl Iterator<Item = &LanguageReport> {
        self.languages.iter().filter(|l| l.error.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantity_parses_trimmed_any_case() {
        assert_eq!(" One ".parse::<Quantity>().unwrap(), Quantity::One);
        assert_eq!("OTHER".parse::<Quantity>().unwrap(), Quantity::Other);
        assert_eq!("few\t".parse::<Quantity>().unwrap(), Quantity::Few);
    }

    #[test]
    fn quantity_rejects_unknown_buckets() {
        let err = "teen".parse::<Quantity>().unwrap_err();
        assert_eq!(err, QuantityParseError("teen".into()));
        assert!("".parse::<Quantity>().is_err());
    }

    #[test]
    fn quantity_order_follows_cldr() {
        let mut qs = vec![Quantity::Other, Quantity::Few, Quantity::Zero, Quantity::One];
        qs.sort();
        assert_eq!(
            qs,
            vec![Quantity::Zero, Quantity::One, Quantity::Few, Quantity::Other]
        );
    }

    #[test]
    fn record_cell_defaults_to_empty() {
        let mut r = Record::default();
        r.cells.insert("en".into(), "Hello".into());
        assert_eq!(r.cell("en"), "Hello");
        assert_eq!(r.cell("fr"), "");
    }

    #[test]
    fn document_counts_entry_kinds() {
        let mut doc = ResourceDocument::new("en");
        doc.entries.push(LocalizedEntry::Simple {
            id: "a".into(),
            text: "A".into(),
        });
        doc.entries.push(LocalizedEntry::Plural {
            id: "b".into(),
            items: BTreeMap::new(),
        });
        assert_eq!(doc.simple_count(), 1);
        assert_eq!(doc.plural_count(), 1);
        assert!(doc.get("b").is_some());
    }

    #[test]
    fn warning_serializes_with_kind_tag() {
        let w = RowWarning {
            row: 4,
            id: "items".into(),
            kind: WarningKind::InvalidQuantity("teen".into()),
        };
        let v = serde_json::to_value(&w).unwrap();
        assert_eq!(v["kind"], "invalid-quantity");
        assert_eq!(v["value"], "teen");
        assert_eq!(v["row"], 4);
        assert!(w.to_string().contains("invalid quantity 'teen'"));
    }
}
