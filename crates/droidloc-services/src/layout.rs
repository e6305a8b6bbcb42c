use droidloc_config::{DEFAULT_FILE_NAME, DEFAULT_LANG, DEFAULT_RES_DIR};
use std::path::PathBuf;

/// Where each language's document lands:
/// `<res_dir>/values/<file>` for the default language,
/// `<res_dir>/values-<lang>/<file>` for the rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    pub res_dir: PathBuf,
    pub file_name: String,
    pub default_lang: String,
}

impl Default for OutputLayout {
    fn default() -> Self {
        Self {
            res_dir: PathBuf::from(DEFAULT_RES_DIR),
            file_name: DEFAULT_FILE_NAME.to_string(),
            default_lang: DEFAULT_LANG.to_string(),
        }
    }
}

impl OutputLayout {
    pub fn values_dir_name(&self, lang: &str) -> String {
        if lang == self.default_lang {
            "values".to_string()
        } else {
            format!("values-{lang}")
        }
    }

    pub fn path_for(&self, lang: &str) -> PathBuf {
        self.res_dir
            .join(self.values_dir_name(lang))
            .join(&self.file_name)
    }
}
