//! Orchestration over the lower-level crates: language resolution, per-language
//! fan-out, output sinks and git bookkeeping. The CLI only talks to this layer
//! and `droidloc-source`.

use color_eyre::eyre::{bail, eyre};
use droidloc_core::{LanguageReport, Record, RunSummary};
use droidloc_normalize::Classified;
use droidloc_source::Table;
use std::path::PathBuf;

pub use droidloc_core::Result;

pub mod git;
pub mod layout;
pub mod sink;

pub use git::{GitBookkeeping, GitError};
pub use layout::OutputLayout;
pub use sink::{DryRunSink, FsSink, OutputSink, PlannedFile};

/// How languages are processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FanOut {
    /// One worker per language, all attempted, joined before returning.
    #[default]
    Parallel,
    /// One language after another, stopping at the first failure.
    Sequential,
}

/// Pick the languages to generate.
///
/// An explicit list wins and only has to be path safe. Without one, every
/// non-reserved header that reads as an Android locale qualifier is taken by
/// name; other headers (`notes`, `context`, ...) are skipped with a warning.
pub fn resolve_languages(explicit: Option<&[String]>, table: &Table) -> Result<Vec<String>> {
    let mut out: Vec<String> = Vec::new();
    match explicit {
        Some(list) if !list.is_empty() => {
            for lang in list {
                droidloc_config::validate_lang_code(lang)?;
                if out.contains(lang) {
                    continue;
                }
                if !table.has_column(lang) {
                    tracing::warn!(event = "language_column_missing", lang = %lang,
                        "no '{lang}' column in source, its file will contain empty texts");
                }
                out.push(lang.clone());
            }
        }
        _ => {
            for col in table.language_columns() {
                if !droidloc_config::is_android_locale(&col) {
                    tracing::warn!(event = "column_ignored", column = %col,
                        "column '{col}' is not an Android locale qualifier, ignored");
                    continue;
                }
                if !out.contains(&col) {
                    out.push(col);
                }
            }
            tracing::info!(event = "languages_inferred", langs = ?out);
        }
    }
    if out.is_empty() {
        bail!("no language columns to generate");
    }
    Ok(out)
}

/// Normalize `records` once, then emit one document per language through `sink`.
///
/// Per-language failures are recorded in the returned summary rather than
/// returned as errors; see [`ensure_success`].
pub fn generate(
    records: &[Record],
    languages: &[String],
    layout: &OutputLayout,
    sink: &dyn OutputSink,
    fan_out: FanOut,
) -> RunSummary {
    let classified = droidloc_normalize::classify(records);

    let reports: Vec<LanguageReport> = match fan_out {
        FanOut::Parallel => std::thread::scope(|s| {
            let handles: Vec<_> = languages
                .iter()
                .map(|lang| {
                    let classified = &classified;
                    s.spawn(move || emit_language(classified, lang, layout, sink))
                })
                .collect();
            handles
                .into_iter()
                .zip(languages)
                .map(|(h, lang)| {
                    h.join().unwrap_or_else(|_| LanguageReport {
                        lang: lang.clone(),
                        path: layout.path_for(lang).display().to_string(),
                        strings: 0,
                        plurals: 0,
                        written: false,
                        error: Some("worker panicked".to_string()),
                    })
                })
                .collect()
        }),
        FanOut::Sequential => {
            let mut reports = Vec::with_capacity(languages.len());
            for lang in languages {
                let report = emit_language(&classified, lang, layout, sink);
                let failed = report.error.is_some();
                reports.push(report);
                if failed {
                    tracing::warn!(
                        event = "run_aborted",
                        lang = %lang,
                        "stopping after first failure"
                    );
                    break;
                }
            }
            reports
        }
    };

    RunSummary {
        records: records.len(),
        skipped: classified.skipped(),
        warnings: classified.warnings.clone(),
        languages: reports,
        commit: None,
    }
}

fn emit_language(
    classified: &Classified<'_>,
    lang: &str,
    layout: &OutputLayout,
    sink: &dyn OutputSink,
) -> LanguageReport {
    let _span = tracing::info_span!("language", lang = %lang).entered();
    let doc = classified.localize(lang);
    let path = layout.path_for(lang);

    let mut report = LanguageReport {
        lang: lang.to_string(),
        path: path.display().to_string(),
        strings: doc.simple_count(),
        plurals: doc.plural_count(),
        written: false,
        error: None,
    };
    match sink.persist(&path, &doc) {
        Ok(()) => {
            report.written = !sink.is_dry_run();
            tracing::info!(event = "language_done", path = %report.path,
                strings = report.strings, plurals = report.plurals, dry_run = sink.is_dry_run());
        }
        Err(e) => {
            tracing::error!(event = "language_failed", path = %report.path, error = %e);
            report.error = Some(format!("{e:#}"));
        }
    }
    report
}

/// Files actually written during the run.
pub fn written_files(summary: &RunSummary) -> Vec<PathBuf> {
    summary
        .languages
        .iter()
        .filter(|l| l.written)
        .map(|l| PathBuf::from(&l.path))
        .collect()
}

/// Turn recorded per-language failures into a single run error.
pub fn ensure_success(summary: &RunSummary) -> Result<()> {
    let failed: Vec<String> = summary
        .failed()
        .map(|l| format!("{} ({}): {}", l.lang, l.path, l.error.as_deref().unwrap_or("")))
        .collect();
    if failed.is_empty() {
        return Ok(());
    }
    Err(eyre!(
        "{} language file(s) failed:\n  {}",
        failed.len(),
        failed.join("\n  ")
    ))
}
