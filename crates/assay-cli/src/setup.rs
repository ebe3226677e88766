use anyhow::{Context, Result};
use std::path::Path;

use crate::config::Settings;

pub(crate) const CONFIG_TEMPLATE: &str = r#"# assay configuration
#
# API keys are read from environment variables (or a .env file) by default:
#   DEEPSEEK_API_KEY, TAVILY_API_KEY
# Any setting can also be overridden with ASSAY_<SECTION>__<KEY>,
# e.g. ASSAY_COMPLETION__MODEL=deepseek-reasoner

# ── Web search ───────────────────────────────────────────────────
[search]
# api_key = "tvly-..."            # or set TAVILY_API_KEY
base_url = "https://api.tavily.com"
max_results = 5
depth = "advanced"
timeout_secs = 30

# ── Completion (any OpenAI-compatible endpoint) ──────────────────
[completion]
# api_key = "sk-..."              # or set DEEPSEEK_API_KEY
base_url = "https://api.deepseek.com"
model = "deepseek-chat"
timeout_secs = 120

# ── Query ────────────────────────────────────────────────────────
[query]
# Append "价格走势 <date> 最新行情 近一周涨跌原因" to every search.
# Turn off for ideas that are not price-driven.
time_qualified = true

# ── Report ───────────────────────────────────────────────────────
[report]
# output_dir = "~/Documents/assay"
# template = "~/.config/assay/prompt.toml"   # keys: system, user ({topic}, {context})
file_prefix = "创业评测"
title_prefix = "🦁 雄心荟·创业评测："
footer = "(由 DeepSeek & 雄心荟 AI 参谋生成)"
"#;

pub fn run(force: bool) -> Result<()> {
    let config_path = Settings::config_path()?;
    write_template(&config_path, force)?;
    println!("Wrote {}", config_path.display());
    println!("\nSet DEEPSEEK_API_KEY and TAVILY_API_KEY, then run: assay -t \"鲜花店\"");
    Ok(())
}

fn write_template(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists. Re-run with --force to overwrite it",
            path.display()
        );
    }
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;
    }
    std::fs::write(path, CONFIG_TEMPLATE)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_parses_as_settings() {
        let settings: Settings = toml::from_str(CONFIG_TEMPLATE).unwrap();
        assert_eq!(settings.search.max_results, 5);
        assert_eq!(settings.completion.model, "deepseek-chat");
        assert!(settings.query.time_qualified);
        assert_eq!(settings.report.file_prefix, "创业评测");
        assert!(settings.completion.api_key.is_none());
    }

    #[test]
    fn test_write_template_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("assay").join("config.toml");

        write_template(&path, false).unwrap();
        assert!(write_template(&path, false).is_err());
        write_template(&path, true).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), CONFIG_TEMPLATE);
    }
}
