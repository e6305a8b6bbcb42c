use crate::{report, Cli};
use color_eyre::eyre::{bail, Result};
use droidloc_config::{DroidLocConfig, DEFAULT_FILE_NAME, DEFAULT_LANG, DEFAULT_RES_DIR};
use droidloc_services::{
    ensure_success, generate, git, resolve_languages, written_files, DryRunSink, FanOut, FsSink,
    GitBookkeeping, OutputLayout, OutputSink,
};
use droidloc_source::{sheet, Source, SheetOptions};
use std::path::PathBuf;

pub fn run(cli: Cli, use_color: bool) -> Result<()> {
    tracing::debug!(event = "cli_args", args = ?cli);

    // Everything that can be wrong with the setup is checked before any
    // output is produced.
    let cfg = match &cli.config {
        Some(path) => droidloc_config::load_config_from(path)?,
        None => droidloc_config::load_config()?,
    };
    let layout = build_layout(&cli, &cfg)?;
    let source = Source::resolve(&cli.source)?;
    let sheet_opts = build_sheet_options(&source, &cfg)?;
    let git = build_git(&cli, &cfg)?;

    tracing::info!(event = "source", source = %source.describe());
    let table = droidloc_source::load(&source, &sheet_opts)?;

    let explicit = if cli.langs.is_empty() {
        cfg.languages.clone().unwrap_or_default()
    } else {
        cli.langs.clone()
    };
    let languages = resolve_languages(Some(explicit.as_slice()), &table)?;
    if !languages.contains(&layout.default_lang) {
        tracing::warn!(event = "default_lang_not_generated", lang = %layout.default_lang,
            "default language '{}' is not generated, values/ stays untouched", layout.default_lang);
    }

    let fan_out = if cli.sequential || cfg.parallel == Some(false) {
        FanOut::Sequential
    } else {
        FanOut::Parallel
    };

    let dry_sink = DryRunSink::default();
    let sink: &dyn OutputSink = if cli.dry_run { &dry_sink } else { &FsSink };
    let mut summary = generate(&table.records, &languages, &layout, sink, fan_out);

    if let Some(git) = git {
        if summary.failed().next().is_none() {
            match git.commit(&written_files(&summary)) {
                Ok(hash) => summary.commit = hash,
                Err(e) => {
                    report::print(&summary, &dry_sink.planned(), cli.format, use_color, cli.quiet)?;
                    return Err(e.wrap_err("git bookkeeping failed"));
                }
            }
        }
    }

    report::print(&summary, &dry_sink.planned(), cli.format, use_color, cli.quiet)?;
    ensure_success(&summary)
}

fn build_layout(cli: &Cli, cfg: &DroidLocConfig) -> Result<OutputLayout> {
    let default_lang = cli
        .default_lang
        .clone()
        .or_else(|| cfg.default_lang.clone())
        .unwrap_or_else(|| DEFAULT_LANG.to_string());
    droidloc_config::validate_lang_code(&default_lang)?;

    let file_name = cli
        .file_name
        .clone()
        .or_else(|| cfg.file_name.clone())
        .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string());
    droidloc_config::validate_file_name(&file_name)?;

    let res_dir = cli
        .res_dir
        .clone()
        .or_else(|| cfg.res_dir.as_ref().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_RES_DIR));

    Ok(OutputLayout {
        res_dir,
        file_name,
        default_lang,
    })
}

fn build_sheet_options(source: &Source, cfg: &DroidLocConfig) -> Result<SheetOptions> {
    let sheet_cfg = cfg.sheet.clone().unwrap_or_default();
    let mut opts = SheetOptions {
        gid: sheet_cfg.gid.unwrap_or(0),
        ..SheetOptions::default()
    };
    if let Some(base) = sheet_cfg.base_url {
        opts.base_url = base;
    }
    // credentials only matter for remote sheets
    if matches!(source, Source::Sheet(_)) {
        let var = sheet_cfg
            .token_env
            .as_deref()
            .unwrap_or(sheet::DEFAULT_TOKEN_ENV);
        opts.token = droidloc_source::token_from_env(var)?;
    }
    Ok(opts)
}

fn build_git(cli: &Cli, cfg: &DroidLocConfig) -> Result<Option<GitBookkeeping>> {
    let git_cfg = cfg.git.clone().unwrap_or_default();
    if !(cli.commit || git_cfg.enabled.unwrap_or(false)) || cli.dry_run {
        return Ok(None);
    }
    let bookkeeping = GitBookkeeping::from_config(&git_cfg);
    if !git::git_available() {
        bail!("git bookkeeping requested but git is not installed");
    }
    if !git::is_work_tree(&bookkeeping.repo) {
        bail!(
            "git bookkeeping requested but {} is not a git work tree",
            bookkeeping.repo.display()
        );
    }
    Ok(Some(bookkeeping))
}
