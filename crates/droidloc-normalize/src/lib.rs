use droidloc_core::{LocalizedEntry, Quantity, Record, ResourceDocument, RowWarning, WarningKind};
use std::collections::{BTreeMap, HashMap};

pub const TYPE_STRING: &str = "string";
pub const TYPE_PLURAL: &str = "plural";

/// Which record(s) supply the text of one id.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Shape {
    Simple(usize),
    Plural(BTreeMap<Quantity, usize>),
}

#[derive(Debug, Clone)]
struct Slot<'a> {
    id: &'a str,
    shape: Shape,
}

/// Language-independent view of the input: every id in first-appearance order
/// together with the record indices that feed it.
#[derive(Debug, Clone)]
pub struct Classified<'a> {
    records: &'a [Record],
    slots: Vec<Slot<'a>>,
    pub warnings: Vec<RowWarning>,
}

impl<'a> Classified<'a> {
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Rows dropped during classification.
    pub fn skipped(&self) -> usize {
        self.warnings.iter().filter(|w| w.skips_row()).count()
    }

    /// Project the classified rows onto one language column.
    pub fn localize(&self, lang: &str) -> ResourceDocument {
        let entries = self
            .slots
            .iter()
            .map(|slot| match &slot.shape {
                Shape::Simple(idx) => LocalizedEntry::Simple {
                    id: slot.id.to_string(),
                    text: self.records[*idx].cell(lang).to_string(),
                },
                Shape::Plural(items) => LocalizedEntry::Plural {
                    id: slot.id.to_string(),
                    items: items
                        .iter()
                        .map(|(q, idx)| (*q, self.records[*idx].cell(lang).to_string()))
                        .collect(),
                },
            })
            .collect();
        ResourceDocument {
            lang: lang.to_string(),
            entries,
        }
    }
}

/// Result of normalizing the records for a single language.
#[derive(Debug, Clone)]
pub struct Normalized {
    pub document: ResourceDocument,
    pub warnings: Vec<RowWarning>,
}

/// Classify and project in one step.
pub fn normalize(records: &[Record], lang: &str) -> Normalized {
    let classified = classify(records);
    Normalized {
        document: classified.localize(lang),
        warnings: classified.warnings,
    }
}

/// Sort rows into simple and plural entries. Never fails: rows that cannot be
/// used are skipped and reported as warnings.
pub fn classify(records: &[Record]) -> Classified<'_> {
    let mut slots: Vec<Slot<'_>> = Vec::new();
    let mut by_id: HashMap<&str, usize> = HashMap::new();
    let mut warnings = Vec::new();

    let mut warn = |r: &Record, kind: WarningKind| {
        let w = RowWarning {
            row: r.row,
            id: r.id.clone(),
            kind,
        };
        tracing::warn!(event = "row_warning", row = w.row, id = %w.id, "{w}");
        warnings.push(w);
    };

    for (idx, r) in records.iter().enumerate() {
        if r.id.is_empty() {
            warn(r, WarningKind::MissingId);
            continue;
        }
        if r.kind.is_empty() {
            warn(r, WarningKind::MissingType);
            continue;
        }

        let shape = match r.kind.as_str() {
            TYPE_STRING => Shape::Simple(idx),
            TYPE_PLURAL => {
                let raw = r.quantity.as_deref().map(str::trim).unwrap_or("");
                if raw.is_empty() {
                    warn(r, WarningKind::MissingQuantity);
                    continue;
                }
                match raw.parse::<Quantity>() {
                    Ok(q) => Shape::Plural(BTreeMap::from([(q, idx)])),
                    Err(e) => {
                        warn(r, WarningKind::InvalidQuantity(e.0));
                        continue;
                    }
                }
            }
            other => {
                warn(r, WarningKind::UnknownType(other.to_string()));
                continue;
            }
        };

        let pos = match by_id.get(r.id.as_str()).copied() {
            Some(pos) => pos,
            None => {
                by_id.insert(r.id.as_str(), slots.len());
                slots.push(Slot {
                    id: r.id.as_str(),
                    shape,
                });
                continue;
            }
        };

        // Later rows win; the entry keeps the position of the first row.
        let slot = &mut slots[pos];
        match (&mut slot.shape, shape) {
            (Shape::Simple(prev), Shape::Simple(next)) => *prev = next,
            (Shape::Plural(items), Shape::Plural(next)) => items.extend(next),
            (current, replacement) => {
                warn(r, WarningKind::KindConflict);
                *current = replacement;
            }
        }
    }

    tracing::debug!(
        event = "classified",
        records = records.len(),
        entries = slots.len(),
        warnings = warnings.len()
    );
    Classified {
        records,
        slots,
        warnings,
    }
}
