use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use tracing::{
  debug,
  trace
};

use crate::api::Endpoints;
use crate::error::ConfigError;

pub const DEFAULT_API_URL: &str =
  "http://localhost:8000";
pub const DEFAULT_TIMEOUT_SECS: u64 =
  15;
pub const CONFIG_ENV: &str =
  "TASKDESK_CONFIG";
pub const API_URL_ENV: &str =
  "TASKDESK_API_URL";

#[derive(
  Debug, Clone, PartialEq, Eq,
)]
pub struct ClientConfig {
  pub api_base_url: String,
  pub timeout:      Duration,
  pub data_dir:     Option<PathBuf>,
  pub loaded_file:  Option<PathBuf>
}

impl Default for ClientConfig {
  fn default() -> Self {
    Self {
      api_base_url: DEFAULT_API_URL
        .to_string(),
      timeout:      Duration::from_secs(
        DEFAULT_TIMEOUT_SECS
      ),
      data_dir:     None,
      loaded_file:  None
    }
  }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
  api:     ApiSection,
  session: SessionSection
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ApiSection {
  base_url:     Option<String>,
  timeout_secs: Option<u64>
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct SessionSection {
  data_dir: Option<PathBuf>
}

impl ClientConfig {
  pub fn from_toml_str(
    text: &str
  ) -> Result<Self, ConfigError> {
    let file: ConfigFile =
      toml::from_str(text)?;
    let mut cfg = Self::default();

    if let Some(url) = file.api.base_url
    {
      trace!(%url, "config api.base_url");
      cfg.api_base_url = url;
    }
    if let Some(secs) =
      file.api.timeout_secs
    {
      cfg.timeout =
        Duration::from_secs(secs.max(1));
    }
    cfg.data_dir = file.session.data_dir;

    Ok(cfg)
  }

  /// Flag or environment value wins over
  /// the file.
  pub fn apply_api_url_override(
    &mut self,
    url: Option<&str>
  ) {
    if let Some(url) = url
      .map(str::trim)
      .filter(|url| !url.is_empty())
    {
      debug!(%url, "api base url overridden");
      self.api_base_url = url.to_string();
    }
  }

  pub fn endpoints(
    &self
  ) -> Result<Endpoints, ConfigError> {
    Endpoints::new(&self.api_base_url)
  }
}

#[cfg(feature = "native")]
mod native {
  use std::fs;
  use std::path::{
    Path,
    PathBuf
  };

  use anyhow::{
    Context,
    anyhow
  };
  use tracing::{
    info,
    warn
  };

  use super::{
    CONFIG_ENV,
    ClientConfig
  };
  use crate::error::ConfigError;

  impl ClientConfig {
    /// An explicit path must exist; the
    /// default location may be absent.
    #[tracing::instrument]
    pub fn load(
      override_path: Option<&Path>
    ) -> Result<Self, ConfigError> {
      let Some(path) =
        resolve_config_path(
          override_path
        )
      else {
        warn!(
          "no config file found; using \
           defaults"
        );
        return Ok(Self::default());
      };

      info!(config = %path.display(), "loading config");
      let text =
        fs::read_to_string(&path)
          .map_err(|source| {
            ConfigError::ReadFile {
              path: path.clone(),
              source
            }
          })?;
      let mut cfg =
        Self::from_toml_str(&text)?;
      cfg.data_dir = cfg
        .data_dir
        .map(|dir| expand_tilde(&dir));
      cfg.loaded_file = Some(path);
      Ok(cfg)
    }
  }

  fn resolve_config_path(
    override_path: Option<&Path>
  ) -> Option<PathBuf> {
    if let Some(path) = override_path {
      return Some(expand_tilde(path));
    }

    if let Ok(env_path) =
      std::env::var(CONFIG_ENV)
    {
      if env_path == "/dev/null" {
        return None;
      }
      return Some(expand_tilde(
        Path::new(&env_path)
      ));
    }

    let candidate = dirs::config_dir()?
      .join("taskdesk")
      .join("config.toml");
    candidate
      .exists()
      .then_some(candidate)
  }

  /// Where the session file lives:
  /// flag, then config, then the
  /// platform data directory.
  #[tracing::instrument(skip(
    cfg,
    override_dir
  ))]
  pub fn resolve_data_dir(
    cfg: &ClientConfig,
    override_dir: Option<&Path>
  ) -> anyhow::Result<PathBuf> {
    let dir = if let Some(path) =
      override_dir
    {
      path.to_path_buf()
    } else if let Some(dir) =
      cfg.data_dir.as_ref()
    {
      dir.clone()
    } else {
      dirs::data_dir()
        .ok_or_else(|| {
          anyhow!(
            "cannot determine data \
             directory"
          )
        })?
        .join("taskdesk")
    };

    if !dir.exists() {
      info!(dir = %dir.display(), "creating data directory");
      fs::create_dir_all(&dir)
        .with_context(|| {
          format!(
            "failed to create {}",
            dir.display()
          )
        })?;
    }

    Ok(dir)
  }

  pub(crate) fn expand_tilde(
    path: &Path
  ) -> PathBuf {
    let text = path.to_string_lossy();
    if let Some(rest) =
      text.strip_prefix("~/")
      && let Some(home) =
        dirs::home_dir()
    {
      return home.join(rest);
    }
    path.to_path_buf()
  }
}

#[cfg(feature = "native")]
pub use native::resolve_data_dir;

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use super::*;

  #[test]
  fn empty_file_yields_defaults() {
    let cfg =
      ClientConfig::from_toml_str("")
        .unwrap();
    assert_eq!(cfg, ClientConfig::default());
    assert_eq!(
      cfg.timeout,
      Duration::from_secs(15)
    );
  }

  #[test]
  fn sections_override_defaults() {
    let cfg = ClientConfig::from_toml_str(
      r#"
[api]
base_url = "https://tasks.example.com"
timeout_secs = 0

[session]
data_dir = "/var/lib/taskdesk"
"#
    )
    .unwrap();
    assert_eq!(
      cfg.api_base_url,
      "https://tasks.example.com"
    );
    assert_eq!(
      cfg.timeout,
      Duration::from_secs(1)
    );
    assert_eq!(
      cfg.data_dir,
      Some(PathBuf::from(
        "/var/lib/taskdesk"
      ))
    );
  }

  #[test]
  fn unknown_keys_are_rejected() {
    let err = ClientConfig::from_toml_str(
      "[api]\nbase = \"x\"\n"
    )
    .unwrap_err();
    assert!(matches!(
      err,
      ConfigError::ParseToml(_)
    ));
  }

  #[test]
  fn blank_override_is_ignored() {
    let mut cfg = ClientConfig::default();
    cfg.apply_api_url_override(Some("  "));
    assert_eq!(
      cfg.api_base_url,
      DEFAULT_API_URL
    );
    cfg.apply_api_url_override(Some(
      "http://10.0.0.5:9000"
    ));
    assert!(cfg.endpoints().is_ok());
    assert_eq!(
      cfg.api_base_url,
      "http://10.0.0.5:9000"
    );
  }

  #[cfg(feature = "native")]
  #[test]
  fn explicit_missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.toml");
    let err = ClientConfig::load(Some(
      missing.as_path()
    ))
    .unwrap_err();
    assert!(matches!(
      err,
      ConfigError::ReadFile { .. }
    ));
  }

  #[cfg(feature = "native")]
  #[test]
  fn load_records_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
      &path,
      "[api]\nbase_url = \"http://example.test\"\n"
    )
    .unwrap();
    let cfg = ClientConfig::load(Some(
      path.as_path()
    ))
    .unwrap();
    assert_eq!(
      cfg.loaded_file.as_deref(),
      Some(path.as_path())
    );
    assert_eq!(
      cfg.api_base_url,
      "http://example.test"
    );
  }
}
