use crate::Format;
use color_eyre::eyre::Result;
use droidloc_core::{LanguageReport, RunSummary};
use droidloc_services::PlannedFile;
use owo_colors::OwoColorize;
use std::path::Path;

pub fn print(
    summary: &RunSummary,
    planned: &[PlannedFile],
    format: Format,
    use_color: bool,
    quiet: bool,
) -> Result<()> {
    match format {
        Format::Json => print_json(summary, planned),
        Format::Text => {
            print_text(summary, planned, use_color, quiet);
            Ok(())
        }
    }
}

fn print_json(summary: &RunSummary, planned: &[PlannedFile]) -> Result<()> {
    let mut value = serde_json::to_value(summary)?;
    if let Some(obj) = value.as_object_mut() {
        obj.insert("dry_run".into(), serde_json::Value::Bool(!planned.is_empty()));
        let planned: Vec<_> = planned
            .iter()
            .map(|p| {
                serde_json::json!({
                    "path": p.path.display().to_string(),
                    "bytes": p.bytes,
                    "unchanged": p.unchanged,
                })
            })
            .collect();
        obj.insert("planned".into(), serde_json::Value::Array(planned));
    }
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn print_text(summary: &RunSummary, planned: &[PlannedFile], use_color: bool, quiet: bool) {
    for lang in &summary.languages {
        match &lang.error {
            Some(err) => {
                if use_color {
                    eprintln!("{} {} → {}: {}", "✖".red(), lang.lang.red(), lang.path, err);
                } else {
                    eprintln!("✖ {} → {}: {}", lang.lang, lang.path, err);
                }
            }
            None if !quiet => println!("{}", language_line(lang, planned, use_color)),
            None => {}
        }
    }

    if summary.skipped > 0 {
        let line = format!(
            "{} of {} row(s) skipped, see warnings above",
            summary.skipped, summary.records
        );
        if use_color {
            eprintln!("{} {}", "⚠".yellow(), line.yellow());
        } else {
            eprintln!("⚠ {line}");
        }
    }

    if quiet {
        return;
    }
    if let Some(hash) = &summary.commit {
        if use_color {
            println!("{} committed {}", "✔".green(), hash.cyan());
        } else {
            println!("✔ committed {hash}");
        }
    }
}

fn language_line(lang: &LanguageReport, planned: &[PlannedFile], use_color: bool) -> String {
    let counts = format!("{} strings, {} plurals", lang.strings, lang.plurals);
    let plan = planned.iter().find(|p| p.path == Path::new(&lang.path));
    match plan {
        Some(p) => {
            let state = if p.unchanged { "unchanged" } else { "would write" };
            if use_color {
                format!(
                    "DRY-RUN {} → {} ({}, {} bytes, {})",
                    lang.lang.green(),
                    lang.path.blue(),
                    counts,
                    p.bytes,
                    state.dimmed()
                )
            } else {
                format!(
                    "DRY-RUN {} → {} ({}, {} bytes, {})",
                    lang.lang, lang.path, counts, p.bytes, state
                )
            }
        }
        None if use_color => format!(
            "{} {} → {} ({})",
            "✔".green(),
            lang.lang.green(),
            lang.path.blue(),
            counts
        ),
        None => format!("✔ {} → {} ({})", lang.lang, lang.path, counts),
    }
}
