use anyhow::{bail, Result};
use serde::Deserialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use keg_pm::http::HttpClientConfig;

pub const CONFIG_FILE: &str = "keg.toml";
pub const PREFIX_ENV: &str = "KEG_PREFIX";
pub const DEFAULT_PREFIX: &str = "/usr/local";

/// The keg configuration file structure (keg.toml)
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct KegConfig {
    /// Installation settings
    pub install: InstallConfig,
}

/// Installation settings
#[derive(Debug, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct InstallConfig {
    /// Prefix that relative recipe destinations are joined to
    pub prefix: Option<PathBuf>,

    /// Total download timeout in seconds
    pub timeout: Option<u64>,

    /// Connect timeout in seconds
    pub connect_timeout: Option<u64>,

    /// Refuse plain http:// downloads
    pub secure_http: bool,

    /// Proxy URL for all requests
    pub proxy: Option<String>,

    /// Extra CA certificate (PEM)
    pub cafile: Option<PathBuf>,
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            prefix: None,
            timeout: None,
            connect_timeout: None,
            secure_http: true,
            proxy: None,
            cafile: None,
        }
    }
}

impl KegConfig {
    /// Load configuration from keg.toml, searching upward from the given directory
    pub fn load(start_dir: &Path) -> Result<Option<Self>> {
        let mut current = start_dir.to_path_buf();

        loop {
            let config_path = current.join(CONFIG_FILE);

            if config_path.exists() {
                log::debug!("Loading {}", config_path.display());
                let content = std::fs::read_to_string(&config_path)?;
                let config: KegConfig = toml::from_str(&content)?;
                return Ok(Some(config));
            }

            if !current.pop() {
                return Ok(None);
            }
        }
    }

    /// Load configuration by searching upward from the current working directory
    pub fn load_from_cwd() -> Result<Option<Self>> {
        let cwd = std::env::current_dir()?;
        Self::load(&cwd)
    }

    /// Pick the install prefix: CLI flag, then environment, then keg.toml, then the default.
    /// Relative paths are taken from `cwd`.
    pub fn resolve_prefix(&self, flag: Option<&Path>, env: Option<OsString>, cwd: &Path) -> Result<PathBuf> {
        let prefix = match (flag, env) {
            (Some(flag), _) => flag.to_path_buf(),
            (None, Some(env)) if !env.is_empty() => PathBuf::from(env),
            _ => self
                .install
                .prefix
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_PREFIX)),
        };

        if prefix.as_os_str().is_empty() {
            bail!("Install prefix is empty");
        }

        Ok(if prefix.is_absolute() { prefix } else { cwd.join(prefix) })
    }

    /// HTTP settings, with CLI overrides applied
    pub fn http_client_config(&self, timeout: Option<u64>, allow_insecure_http: bool) -> HttpClientConfig {
        let mut config = HttpClientConfig::new().with_secure_http(self.install.secure_http && !allow_insecure_http);

        if let Some(secs) = timeout.or(self.install.timeout) {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = self.install.connect_timeout {
            config = config.with_connect_timeout(Duration::from_secs(secs));
        }
        if let Some(proxy) = &self.install.proxy {
            config = config.with_proxy(proxy.clone());
        }
        if let Some(cafile) = &self.install.cafile {
            config = config.with_cafile(cafile.clone());
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_empty_config() {
        let config: KegConfig = toml::from_str("").unwrap();
        assert!(config.install.prefix.is_none());
        assert!(config.install.secure_http);
    }

    #[test]
    fn test_parse_install_section() {
        let toml = r#"
[install]
prefix = "/opt/keg"
timeout = 120
connect-timeout = 5
secure-http = false
proxy = "http://proxy:3128"
"#;
        let config: KegConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.install.prefix, Some(PathBuf::from("/opt/keg")));
        assert_eq!(config.install.timeout, Some(120));
        assert_eq!(config.install.connect_timeout, Some(5));
        assert!(!config.install.secure_http);

        let http = config.http_client_config(None, false);
        assert_eq!(http.timeout, Duration::from_secs(120));
        assert_eq!(http.connect_timeout, Duration::from_secs(5));
        assert_eq!(http.proxy.as_deref(), Some("http://proxy:3128"));
        assert!(!http.secure_http);
    }

    #[test]
    fn test_cli_timeout_wins() {
        let config: KegConfig = toml::from_str("[install]\ntimeout = 120\n").unwrap();
        let http = config.http_client_config(Some(7), true);
        assert_eq!(http.timeout, Duration::from_secs(7));
        assert!(!http.secure_http);
    }

    #[test]
    fn test_prefix_precedence() {
        let cwd = Path::new("/work");
        let config: KegConfig = toml::from_str("[install]\nprefix = \"/opt/keg\"\n").unwrap();

        let from_flag = config
            .resolve_prefix(Some(Path::new("/flag")), Some("/env".into()), cwd)
            .unwrap();
        assert_eq!(from_flag, PathBuf::from("/flag"));

        let from_env = config.resolve_prefix(None, Some("/env".into()), cwd).unwrap();
        assert_eq!(from_env, PathBuf::from("/env"));

        let from_file = config.resolve_prefix(None, Some("".into()), cwd).unwrap();
        assert_eq!(from_file, PathBuf::from("/opt/keg"));

        let default = KegConfig::default().resolve_prefix(None, None, cwd).unwrap();
        assert_eq!(default, PathBuf::from(DEFAULT_PREFIX));
    }

    #[test]
    fn test_relative_prefix_is_anchored() {
        let prefix = KegConfig::default()
            .resolve_prefix(Some(Path::new("local")), None, Path::new("/work"))
            .unwrap();
        assert_eq!(prefix, PathBuf::from("/work/local"));
    }

    #[test]
    fn test_load_searches_upward() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(CONFIG_FILE), "[install]\nprefix = \"/srv/tools\"\n").unwrap();
        let nested = temp.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();

        let config = KegConfig::load(&nested).unwrap().unwrap();
        assert_eq!(config.install.prefix, Some(PathBuf::from("/srv/tools")));
    }
}
