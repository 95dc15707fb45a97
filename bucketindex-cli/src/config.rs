use serde::Deserialize;
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = "bucketindex.toml";

/// Optional deployment settings. Everything has a sensible default; the tool
/// runs without a config file at all. Credentials are never read from the
/// file, only from the environment.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_ignore_prefixes")]
    pub ignore_prefixes: Vec<String>,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_ignore_prefixes() -> Vec<String> {
    vec![".svn/".to_string()]
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            region: default_region(),
            endpoint: None,
            ignore_prefixes: default_ignore_prefixes(),
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
        let settings: Settings = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path.display(), e))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Resolve settings: `BUCKETINDEX_CONFIG` if set, else `bucketindex.toml`
    /// in the working directory if present, else defaults.
    pub fn discover() -> anyhow::Result<Self> {
        if let Ok(path) = std::env::var("BUCKETINDEX_CONFIG") {
            return Self::load(Path::new(&path));
        }
        let default_path = Path::new(DEFAULT_CONFIG_PATH);
        if default_path.exists() {
            Self::load(default_path)
        } else {
            Ok(Self::default())
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.region.is_empty() {
            anyhow::bail!("region must not be empty");
        }
        if let Some(ep) = &self.endpoint {
            if !ep.starts_with("http://") && !ep.starts_with("https://") {
                anyhow::bail!("endpoint must be an http(s) URL: {}", ep);
            }
        }
        for pattern in &self.ignore_prefixes {
            if pattern.is_empty() {
                anyhow::bail!("ignore_prefixes entries must not be empty");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_settings() {
        let toml_str = r#"
region = "eu-west-1"
endpoint = "https://storage.example.com"
ignore_prefixes = [".svn/", ".git/"]
"#;
        let settings: Settings = toml::from_str(toml_str).unwrap();
        settings.validate().unwrap();
        assert_eq!(settings.region, "eu-west-1");
        assert_eq!(settings.ignore_prefixes.len(), 2);
    }

    #[test]
    fn test_defaults_apply_for_empty_file() {
        let settings: Settings = toml::from_str("").unwrap();
        assert_eq!(settings.region, "us-east-1");
        assert_eq!(settings.endpoint, None);
        assert_eq!(settings.ignore_prefixes, vec![".svn/".to_string()]);
    }

    #[test]
    fn test_bad_endpoint_rejected() {
        let toml_str = r#"
endpoint = "storage.example.com"
"#;
        let settings: Settings = toml::from_str(toml_str).unwrap();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_empty_ignore_pattern_rejected() {
        let toml_str = r#"
ignore_prefixes = [""]
"#;
        let settings: Settings = toml::from_str(toml_str).unwrap();
        assert!(settings.validate().is_err());
    }
}
