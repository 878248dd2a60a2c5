//! Connection settings for the command-line tool.
//!
//! Layers, lowest precedence first: a TOML file, `GRAPHDRIVE_*`
//! environment variables, then command-line flags.

use anyhow::{bail, Context, Result};
use graphdrive_sharepoint::SharepointConfig;
use serde::Deserialize;
use std::path::Path;

/// Config file read when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "graphdrive.toml";

/// Every field optional so layers can be merged before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub site_id: Option<String>,
    pub drive_name: Option<String>,
    pub graph_base_url: Option<String>,
    pub login_base_url: Option<String>,
    pub timeout_sec: Option<u64>,
    pub max_retries: Option<u32>,
    pub upload_chunk_size: Option<u64>,
    pub simple_upload_max: Option<u64>,
}

impl FileConfig {
    /// Parse TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("invalid graphdrive configuration")
    }

    /// Load `path`, or the default file when present. A missing default
    /// file yields an empty layer; a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p, true),
            None => (Path::new(DEFAULT_CONFIG_FILE), false),
        };
        if !explicit && !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("in {}", path.display()))
    }

    /// Overlay `GRAPHDRIVE_*` variables obtained from `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let strings: [(&str, &mut Option<String>); 7] = [
            ("GRAPHDRIVE_TENANT_ID", &mut self.tenant_id),
            ("GRAPHDRIVE_CLIENT_ID", &mut self.client_id),
            ("GRAPHDRIVE_CLIENT_SECRET", &mut self.client_secret),
            ("GRAPHDRIVE_SITE_ID", &mut self.site_id),
            ("GRAPHDRIVE_DRIVE_NAME", &mut self.drive_name),
            ("GRAPHDRIVE_GRAPH_URL", &mut self.graph_base_url),
            ("GRAPHDRIVE_LOGIN_URL", &mut self.login_base_url),
        ];
        for (key, slot) in strings {
            if let Some(v) = lookup(key).filter(|v| !v.is_empty()) {
                *slot = Some(v);
            }
        }
        if let Some(v) = lookup("GRAPHDRIVE_TIMEOUT_SEC").filter(|v| !v.is_empty()) {
            self.timeout_sec = Some(
                v.parse()
                    .with_context(|| format!("GRAPHDRIVE_TIMEOUT_SEC={:?}", v))?,
            );
        }
        if let Some(v) = lookup("GRAPHDRIVE_MAX_RETRIES").filter(|v| !v.is_empty()) {
            self.max_retries = Some(
                v.parse()
                    .with_context(|| format!("GRAPHDRIVE_MAX_RETRIES={:?}", v))?,
            );
        }
        Ok(())
    }

    /// Build the adapter configuration, naming the first missing field.
    pub fn into_sharepoint(self) -> Result<SharepointConfig> {
        fn required(value: Option<String>, name: &str) -> Result<String> {
            match value {
                Some(v) if !v.trim().is_empty() => Ok(v),
                _ => bail!(
                    "missing `{}` (set it in {} or GRAPHDRIVE_{})",
                    name,
                    DEFAULT_CONFIG_FILE,
                    name.to_ascii_uppercase()
                ),
            }
        }

        let mut cfg = SharepointConfig::new(
            required(self.tenant_id, "tenant_id")?,
            required(self.client_id, "client_id")?,
            required(self.client_secret, "client_secret")?,
            required(self.site_id, "site_id")?,
        );
        cfg.drive_name = self.drive_name.filter(|d| !d.is_empty());
        if let Some(url) = self.graph_base_url {
            cfg.graph_base_url = url;
        }
        if let Some(url) = self.login_base_url {
            cfg.login_base_url = url;
        }
        if let Some(t) = self.timeout_sec {
            cfg.timeout_sec = t;
        }
        if let Some(r) = self.max_retries {
            cfg.max_retries = r;
        }
        if let Some(c) = self.upload_chunk_size {
            cfg.upload_chunk_size = c;
        }
        if let Some(m) = self.simple_upload_max {
            cfg.simple_upload_max = m;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    const SAMPLE: &str = r#"
        tenant_id = "contoso.onmicrosoft.com"
        client_id = "11111111-2222-3333-4444-555555555555"
        client_secret = "from-file"
        site_id = "contoso.sharepoint.com,abc,def"
        drive_name = "Documents"
    "#;

    #[test]
    fn test_load_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let cfg = FileConfig::load(Some(file.path())).unwrap();
        assert_eq!(cfg.drive_name.as_deref(), Some("Documents"));
        assert_eq!(cfg.timeout_sec, None);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(FileConfig::load(Some(&dir.path().join("nope.toml"))).is_err());
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!(FileConfig::from_toml("tenant = \"x\"").is_err());
    }

    #[test]
    fn test_env_overrides_file() {
        let mut cfg = FileConfig::from_toml(SAMPLE).unwrap();
        let env: HashMap<&str, &str> = [
            ("GRAPHDRIVE_CLIENT_SECRET", "from-env"),
            ("GRAPHDRIVE_DRIVE_NAME", ""),
            ("GRAPHDRIVE_MAX_RETRIES", "5"),
        ]
        .into_iter()
        .collect();
        cfg.apply_env(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(cfg.client_secret.as_deref(), Some("from-env"));
        // Empty variables do not clear file values.
        assert_eq!(cfg.drive_name.as_deref(), Some("Documents"));
        assert_eq!(cfg.max_retries, Some(5));
    }

    #[test]
    fn test_bad_numeric_env() {
        let mut cfg = FileConfig::default();
        let err = cfg
            .apply_env(|k| (k == "GRAPHDRIVE_TIMEOUT_SEC").then(|| "soon".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("GRAPHDRIVE_TIMEOUT_SEC"));
    }

    #[test]
    fn test_into_sharepoint() {
        let cfg = FileConfig::from_toml(SAMPLE).unwrap().into_sharepoint().unwrap();
        assert_eq!(cfg.site_id, "contoso.sharepoint.com,abc,def");
        assert_eq!(cfg.drive_name.as_deref(), Some("Documents"));
        assert_eq!(cfg.max_retries, 3);

        let err = FileConfig::default().into_sharepoint().unwrap_err();
        assert!(err.to_string().contains("tenant_id"));
    }

    #[test]
    fn test_upload_limits_from_file() {
        let text = format!(
            "{}\nsimple_upload_max = 327680\nupload_chunk_size = 655360\n",
            SAMPLE
        );
        let cfg = FileConfig::from_toml(&text)
            .unwrap()
            .into_sharepoint()
            .unwrap();
        assert_eq!(cfg.simple_upload_max, 327_680);
        assert_eq!(cfg.upload_chunk_size, 655_360);

        let too_big = format!("{}\nsimple_upload_max = 8388608\n", SAMPLE);
        assert!(FileConfig::from_toml(&too_big)
            .unwrap()
            .into_sharepoint()
            .is_err());
    }
}
