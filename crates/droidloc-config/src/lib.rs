use regex::Regex;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub const CONFIG_FILE: &str = "droidloc.toml";
pub const DEFAULT_RES_DIR: &str = "app/src/main/res";
pub const DEFAULT_FILE_NAME: &str = "strings.xml";
pub const DEFAULT_LANG: &str = "en";
pub const DEFAULT_COMMIT_MESSAGE: &str = "Update localized strings";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DroidLocConfig {
    /// Android `res/` directory that receives `values*/` folders.
    pub res_dir: Option<String>,
    pub file_name: Option<String>,
    /// Language written to plain `values/`.
    pub default_lang: Option<String>,
    /// Language columns to generate, by header name.
    pub languages: Option<Vec<String>>,
    pub parallel: Option<bool>,
    pub sheet: Option<SheetCfg>,
    pub git: Option<GitCfg>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SheetCfg {
    pub gid: Option<u64>,
    /// Environment variable holding a bearer token.
    pub token_env: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GitCfg {
    pub enabled: Option<bool>,
    /// Repository root; defaults to the current directory.
    pub repo: Option<String>,
    pub message: Option<String>,
    pub user_name: Option<String>,
    pub user_email: Option<String>,
    pub push: Option<bool>,
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid language code '{0}'")]
    InvalidLanguage(String),
    #[error("invalid file name '{0}'")]
    InvalidFileName(String),
}

/// Load an explicitly named config file. Unlike the search path, a missing or
/// malformed file is an error here.
pub fn load_config_from(path: &Path) -> Result<DroidLocConfig, ConfigError> {
    let s = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&s, path)
}

fn parse_config(s: &str, path: &Path) -> Result<DroidLocConfig, ConfigError> {
    toml::from_str::<DroidLocConfig>(s).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Search order: CWD/droidloc.toml, then <config dir>/droidloc/droidloc.toml.
/// Earlier files win field by field. A file that exists but does not parse is
/// an error.
pub fn load_config() -> Result<DroidLocConfig, ConfigError> {
    let mut candidates = Vec::new();
    if let Ok(p) = std::env::current_dir() {
        candidates.push(p.join(CONFIG_FILE));
    }
    if let Some(base) = dirs::config_dir() {
        candidates.push(base.join("droidloc").join(CONFIG_FILE));
    }

    let mut merged = DroidLocConfig::default();
    for path in candidates {
        let Ok(s) = std::fs::read_to_string(&path) else {
            continue;
        };
        tracing::debug!(event = "config_loaded", path = %path.display());
        merged = merge(merged, parse_config(&s, &path)?);
    }
    Ok(merged)
}

pub fn merge(mut a: DroidLocConfig, b: DroidLocConfig) -> DroidLocConfig {
    if a.res_dir.is_none() {
        a.res_dir = b.res_dir;
    }
    if a.file_name.is_none() {
        a.file_name = b.file_name;
    }
    if a.default_lang.is_none() {
        a.default_lang = b.default_lang;
    }
    if a.languages.is_none() {
        a.languages = b.languages;
    }
    if a.parallel.is_none() {
        a.parallel = b.parallel;
    }
    a.sheet = merge_opt(a.sheet, b.sheet, merge_sheet);
    a.git = merge_opt(a.git, b.git, merge_git);
    a
}

fn merge_opt<T: Default>(a: Option<T>, b: Option<T>, f: fn(T, T) -> T) -> Option<T> {
    match (a, b) {
        (Some(a), Some(b)) => Some(f(a, b)),
        (None, Some(b)) => Some(b),
        (Some(a), None) => Some(a),
        (None, None) => None,
    }
}

fn merge_sheet(mut a: SheetCfg, b: SheetCfg) -> SheetCfg {
    if a.gid.is_none() {
        a.gid = b.gid;
    }
    if a.token_env.is_none() {
        a.token_env = b.token_env;
    }
    if a.base_url.is_none() {
        a.base_url = b.base_url;
    }
    a
}

fn merge_git(mut a: GitCfg, b: GitCfg) -> GitCfg {
    if a.enabled.is_none() {
        a.enabled = b.enabled;
    }
    if a.repo.is_none() {
        a.repo = b.repo;
    }
    if a.message.is_none() {
        a.message = b.message;
    }
    if a.user_name.is_none() {
        a.user_name = b.user_name;
    }
    if a.user_email.is_none() {
        a.user_email = b.user_email;
    }
    if a.push.is_none() {
        a.push = b.push;
    }
    a
}

/// Language codes become directory names (`values-<code>`), so only letters,
/// digits and `-`/`+` separators are accepted (`fr`, `pt-rBR`, `b+sr+Latn`).
pub fn validate_lang_code(code: &str) -> Result<(), ConfigError> {
    static LANG_RE: OnceLock<Regex> = OnceLock::new();
    let re = LANG_RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9]+(?:[-+][A-Za-z0-9]+)*$").unwrap());
    if re.is_match(code) {
        Ok(())
    } else {
        Err(ConfigError::InvalidLanguage(code.to_string()))
    }
}

/// Whether `code` is a locale qualifier aapt accepts after `values-`: a two
/// or three letter language with an optional `-r` region (`fr`, `pt-rBR`), or
/// the BCP 47 form (`b+sr+Latn`). Used for codes guessed from header names,
/// where `notes` or `context` must not turn into resource directories.
pub fn is_android_locale(code: &str) -> bool {
    static LOCALE_RE: OnceLock<Regex> = OnceLock::new();
    let re = LOCALE_RE.get_or_init(|| {
        Regex::new(r"^(?:[a-z]{2,3}(?:-r[A-Z]{2}|-r[0-9]{3})?|b\+[a-z]{2,3}(?:\+[A-Za-z0-9]+)*)$")
            .unwrap()
    });
    re.is_match(code)
}

pub fn validate_file_name(name: &str) -> Result<(), ConfigError> {
    let ok = !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && !name.contains('\0');
    if ok {
        Ok(())
    } else {
        Err(ConfigError::InvalidFileName(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_full_config() {
        let cfg = parse_config(
            r#"
res_dir = "android/res"
default_lang = "en"
languages = ["en", "fr", "pt-rBR"]
parallel = false

[sheet]
gid = 7
token_env = "SHEETS_TOKEN"

[git]
enabled = true
message = "i18n: sync"
user_name = "Bot"
"#,
            Path::new("inline.toml"),
        )
        .unwrap();
        assert_eq!(cfg.res_dir.as_deref(), Some("android/res"));
        assert_eq!(cfg.languages.unwrap().len(), 3);
        assert_eq!(cfg.parallel, Some(false));
        assert_eq!(cfg.sheet.unwrap().gid, Some(7));
        let git = cfg.git.unwrap();
        assert_eq!(git.enabled, Some(true));
        assert_eq!(git.push, None);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = parse_config("res_dri = \"x\"", Path::new("typo.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn merge_prefers_first_source_per_field() {
        let a = DroidLocConfig {
            res_dir: Some("a".into()),
            git: Some(GitCfg {
                message: Some("first".into()),
                ..GitCfg::default()
            }),
            ..DroidLocConfig::default()
        };
        let b = DroidLocConfig {
            res_dir: Some("b".into()),
            default_lang: Some("de".into()),
            git: Some(GitCfg {
                message: Some("second".into()),
                push: Some(true),
                ..GitCfg::default()
            }),
            ..DroidLocConfig::default()
        };
        let m = merge(a, b);
        assert_eq!(m.res_dir.as_deref(), Some("a"));
        assert_eq!(m.default_lang.as_deref(), Some("de"));
        let git = m.git.unwrap();
        assert_eq!(git.message.as_deref(), Some("first"));
        assert_eq!(git.push, Some(true));
    }

    #[test]
    fn explicit_file_errors_are_reported() {
        let missing = load_config_from(Path::new("/nonexistent/droidloc.toml")).unwrap_err();
        assert!(matches!(missing, ConfigError::Read { .. }));

        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(tmp, "languages = \"en\"").unwrap();
        let bad = load_config_from(tmp.path()).unwrap_err();
        assert!(matches!(bad, ConfigError::Parse { .. }));
    }

    #[test]
    fn language_codes_are_path_safe() {
        for ok in ["en", "fr", "pt-rBR", "b+sr+Latn", "zh-rTW"] {
            assert!(validate_lang_code(ok).is_ok(), "{ok}");
        }
        for bad in ["", "../en", "en/", "en fr", "-en", "en-"] {
            assert!(validate_lang_code(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn android_locales_follow_qualifier_grammar() {
        for ok in ["en", "fil", "pt-rBR", "es-r419", "b+sr+Latn", "b+zh+Hans+CN"] {
            assert!(is_android_locale(ok), "{ok}");
        }
        for bad in ["notes", "context", "EN", "pt-BR", "en-us", "b+", "comment"] {
            assert!(!is_android_locale(bad), "{bad}");
        }
    }

    #[test]
    fn file_names_are_single_components() {
        assert!(validate_file_name("strings.xml").is_ok());
        assert!(validate_file_name("../strings.xml").is_err());
        assert!(validate_file_name("").is_err());
    }
}
