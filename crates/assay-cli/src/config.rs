use std::path::{Path, PathBuf};

use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use assay_core::{CompletionConfig, ExportOptions, PipelineOptions, SearchConfig};

/// Conventional credential variables, mapped onto their settings keys.
const CREDENTIAL_VARS: [(&str, &str); 2] = [
    ("DEEPSEEK_API_KEY", "completion.api_key"),
    ("TAVILY_API_KEY", "search.api_key"),
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub search: SearchConfig,
    pub completion: CompletionConfig,
    pub query: QuerySettings,
    pub report: ReportSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuerySettings {
    /// Append the dated price-trend qualifiers to every search query
    pub time_qualified: bool,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            time_qualified: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    /// Directory the .docx is written to (supports ~; defaults to $PWD)
    pub output_dir: Option<String>,
    /// Prompt template file with `system` and `user` keys
    pub template: Option<String>,
    pub file_prefix: String,
    pub title_prefix: String,
    pub footer: String,
}

impl Default for ReportSettings {
    fn default() -> Self {
        let export = ExportOptions::default();
        Self {
            output_dir: None,
            template: None,
            file_prefix: export.file_prefix,
            title_prefix: export.title_prefix,
            footer: export.footer,
        }
    }
}

impl ReportSettings {
    pub fn export_options(&self) -> ExportOptions {
        ExportOptions {
            file_prefix: self.file_prefix.clone(),
            title_prefix: self.title_prefix.clone(),
            footer: self.footer.clone(),
        }
    }

    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .as_deref()
            .map(expand_path)
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    }
}

/// Expand a leading `~` to the home directory.
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    } else if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

impl Settings {
    /// Layered sources, lowest precedence first: defaults, config file,
    /// `ASSAY_*` variables, then the conventional credential variables.
    pub fn figment(config_path: &Path) -> Figment {
        Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("ASSAY_").split("__"))
            .merge(
                Env::raw()
                    .only(&CREDENTIAL_VARS.map(|(var, _)| var))
                    .map(|key| {
                        CREDENTIAL_VARS
                            .iter()
                            .find(|(var, _)| key.as_str().eq_ignore_ascii_case(var))
                            .map(|(_, target)| *target)
                            .unwrap_or("unused")
                            .into()
                    }),
            )
    }

    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let path = match config_path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };
        let settings = Self::figment(&path).extract()?;
        Ok(settings)
    }

    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        Ok(config_dir.join("assay"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Both credentials must be present before the shell accepts a topic.
    pub fn validate(&self) -> Result<(), assay_core::Error> {
        self.completion.require_api_key()?;
        self.search.require_api_key()?;
        Ok(())
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            max_results: self.search.max_results,
            depth: self.search.depth,
            time_qualified: self.query.time_qualified,
        }
    }

    /// A copy safe to print: credentials reduced to a short prefix.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        copy.search.api_key = copy.search.api_key.as_deref().map(redact);
        copy.completion.api_key = copy.completion.api_key.as_deref().map(redact);
        copy
    }
}

fn redact(key: &str) -> String {
    let prefix: String = key.chars().take(4).collect();
    format!("{}…", prefix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assay_core::SearchDepth;
    use figment::Jail;

    #[test]
    fn test_defaults() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            let settings: Settings = Settings::figment(Path::new("missing.toml")).extract()?;

            assert_eq!(settings.search.max_results, 5);
            assert_eq!(settings.search.depth, SearchDepth::Advanced);
            assert_eq!(settings.completion.model, "deepseek-chat");
            assert!(settings.query.time_qualified);
            assert_eq!(settings.report.file_prefix, "创业评测");
            assert!(settings.validate().is_err());
            Ok(())
        });
    }

    #[test]
    fn test_credential_variables() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            jail.set_env("DEEPSEEK_API_KEY", "sk-deep");
            jail.set_env("TAVILY_API_KEY", "tvly-key");
            let settings: Settings = Settings::figment(Path::new("missing.toml")).extract()?;

            assert_eq!(settings.completion.api_key.as_deref(), Some("sk-deep"));
            assert_eq!(settings.search.api_key.as_deref(), Some("tvly-key"));
            assert!(settings.validate().is_ok());
            Ok(())
        });
    }

    #[test]
    fn test_missing_completion_key_fails_validation() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            jail.set_env("TAVILY_API_KEY", "tvly-key");
            let settings: Settings = Settings::figment(Path::new("missing.toml")).extract()?;

            let err = settings.validate().unwrap_err();
            assert_eq!(err.stage(), assay_core::Stage::Configuration);
            assert!(err.to_string().contains("DEEPSEEK_API_KEY"));
            Ok(())
        });
    }

    #[test]
    fn test_layering() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            jail.create_file(
                "config.toml",
                r#"
                [completion]
                api_key = "sk-file"
                model = "deepseek-reasoner"

                [query]
                time_qualified = false

                [report]
                output_dir = "reports"
                file_prefix = "Assessment"
                "#,
            )?;
            jail.set_env("DEEPSEEK_API_KEY", "sk-env");
            jail.set_env("ASSAY_SEARCH__MAX_RESULTS", "3");

            let settings: Settings = Settings::figment(Path::new("config.toml")).extract()?;

            assert_eq!(settings.completion.api_key.as_deref(), Some("sk-env"));
            assert_eq!(settings.completion.model, "deepseek-reasoner");
            assert_eq!(settings.search.max_results, 3);
            assert!(!settings.query.time_qualified);
            assert_eq!(settings.report.output_dir(), PathBuf::from("reports"));
            assert_eq!(settings.report.export_options().file_prefix, "Assessment");
            assert_eq!(settings.report.export_options().footer, ExportOptions::default().footer);

            let options = settings.pipeline_options();
            assert_eq!(options.max_results, 3);
            assert!(!options.time_qualified);
            Ok(())
        });
    }

    #[test]
    fn test_redacted() {
        let mut settings = Settings::default();
        settings.completion.api_key = Some("sk-1234567890".to_string());
        let redacted = settings.redacted();
        assert_eq!(redacted.completion.api_key.as_deref(), Some("sk-1…"));
        assert_eq!(redacted.search.api_key, None);
    }

    #[test]
    fn test_expand_path() {
        assert_eq!(expand_path("/tmp/reports"), PathBuf::from("/tmp/reports"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_path("~/reports"), home.join("reports"));
        }
    }
}
