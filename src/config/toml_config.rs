use crate::utils::error::{EtlError, Result};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;

/// Optional run settings file. Every table and key may be omitted.
///
/// ```toml
/// [api]
/// base_url = "https://api-eu.hosted.exlibrisgroup.com/almaws/v1"
/// timeout_secs = 30
///
/// [throttle]
/// rate_limit = 25
/// period_ms = 1000
/// max_in_flight = 200
///
/// [output]
/// directory = "${EXPORT_DIR}"
/// prefix = "asu.alma.archived"
///
/// [normalize]
/// source_code = "AzTeS"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlConfig {
    pub api: Option<ApiSection>,
    pub throttle: Option<ThrottleSection>,
    pub output: Option<OutputSection>,
    pub normalize: Option<NormalizeSection>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiSection {
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThrottleSection {
    pub rate_limit: Option<usize>,
    pub period_ms: Option<u64>,
    pub max_in_flight: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputSection {
    pub directory: Option<String>,
    pub prefix: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NormalizeSection {
    pub source_code: Option<String>,
}

fn env_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid regex"))
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| EtlError::ConfigError {
            message: format!("cannot read {}: {}", path.display(), e),
        })?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = Self::substitute_env_vars(content)?;

        toml::from_str(&processed).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${EXPORT_DIR})；未設定的變數視為配置錯誤
    fn substitute_env_vars(content: &str) -> Result<String> {
        let mut missing = Vec::new();
        let result = env_var_pattern().replace_all(content, |caps: &Captures| {
            let name = &caps[1];
            std::env::var(name).unwrap_or_else(|_| {
                missing.push(name.to_string());
                String::new()
            })
        });

        if !missing.is_empty() {
            return Err(EtlError::MissingConfigError {
                field: format!("environment variable(s) {}", missing.join(", ")),
            });
        }
        Ok(result.into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_file() {
        let config = TomlConfig::from_toml_str(
            r#"
[api]
base_url = "https://api-eu.hosted.exlibrisgroup.com/almaws/v1"
timeout_secs = 10

[throttle]
rate_limit = 20
period_ms = 2000
max_in_flight = 100

[output]
directory = "./exports"
prefix = "test.alma.archived"

[normalize]
source_code = "AzU"
"#,
        )
        .unwrap();

        let throttle = config.throttle.unwrap();
        assert_eq!(throttle.rate_limit, Some(20));
        assert_eq!(throttle.period_ms, Some(2000));
        assert_eq!(config.api.unwrap().timeout_secs, Some(10));
        assert_eq!(config.normalize.unwrap().source_code.as_deref(), Some("AzU"));
    }

    #[test]
    fn test_empty_file() {
        let config = TomlConfig::from_toml_str("").unwrap();
        assert!(config.api.is_none());
        assert!(config.throttle.is_none());
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = TomlConfig::from_toml_str("[throttle]\nrate = 5\n").unwrap_err();
        assert!(matches!(err, EtlError::ConfigValidationError { .. }));
    }

    #[test]
    fn test_env_substitution() {
        std::env::set_var("HOLDINGS_ETL_TEST_DIR", "/tmp/exports");
        let config = TomlConfig::from_toml_str("[output]\ndirectory = \"${HOLDINGS_ETL_TEST_DIR}\"\n").unwrap();
        assert_eq!(config.output.unwrap().directory.as_deref(), Some("/tmp/exports"));

        let err = TomlConfig::from_toml_str("[output]\ndirectory = \"${HOLDINGS_ETL_UNSET_VAR}\"\n").unwrap_err();
        assert!(matches!(err, EtlError::MissingConfigError { .. }));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("export.toml");
        std::fs::write(&path, "[throttle]\nrate_limit = 3\n").unwrap();

        let config = TomlConfig::from_file(&path).unwrap();
        assert_eq!(config.throttle.unwrap().rate_limit, Some(3));

        assert!(TomlConfig::from_file(dir.path().join("missing.toml")).is_err());
    }
}
