//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg`, an optional YAML
//! configuration file, and the resolved [`ClientConfig`].  Command-line
//! values win over the file; the API URL falls back to `COMPANION_API_URL`
//! and then to the built-in default.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use arrrg_derive::CommandLine;
use serde::Deserialize;

use crate::client::Companion;
use crate::error::{Error, Result};
use crate::session::FileCredentialStore;

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Command-line arguments for the companion-chat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Base URL of the companion API.
    #[arrrg(optional, "API base URL (default: $COMPANION_API_URL or http://127.0.0.1:5000)", "URL")]
    pub api_url: Option<String>,

    /// Where the session is stored between runs.
    #[arrrg(optional, "Session file (default: <config dir>/companion/session.json)", "PATH")]
    pub session_file: Option<String>,

    /// YAML configuration file.
    #[arrrg(optional, "YAML configuration file", "PATH")]
    pub config: Option<String>,

    /// Per-request timeout.
    #[arrrg(optional, "Request timeout in seconds (default: 60)", "SECS")]
    pub timeout_secs: Option<u64>,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,

    /// Log to stderr.
    #[arrrg(flag, "Log requests and session events to stderr")]
    pub verbose: bool,
}

/// The optional YAML configuration file.
///
/// ```yaml
/// api_url: https://companion.example.com
/// session_file: /home/me/.companion-session.json
/// timeout_secs: 30
/// color: false
/// ```
#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Base URL of the companion API.
    pub api_url: Option<String>,
    /// Session file location.
    pub session_file: Option<PathBuf>,
    /// Per-request timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Whether to use ANSI colors.
    pub color: Option<bool>,
}

impl FileConfig {
    /// Reads a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|err| {
            Error::io(format!("failed to read config file {}", path.display()), err)
        })?;
        Self::parse(&content)
    }

    /// Parses configuration from YAML text.  An empty document is an empty
    /// configuration.
    pub fn parse(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }
}

/// Configuration for a chat client.
///
/// This struct holds the resolved configuration values after processing
/// the configuration file and command-line arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the companion API; `None` defers to the environment and
    /// the built-in default.
    pub api_url: Option<String>,

    /// Session file location; `None` uses the per-user default.
    pub session_file: Option<PathBuf>,

    /// Per-request timeout.
    pub timeout: Duration,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,

    /// Whether to log to stderr.
    pub verbose: bool,
}

impl ClientConfig {
    /// Creates a new ClientConfig with default values.
    ///
    /// Defaults:
    /// - API URL: from the environment, else http://127.0.0.1:5000
    /// - Timeout: 60 seconds
    /// - Color: enabled
    pub fn new() -> Self {
        Self {
            api_url: None,
            session_file: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            use_color: true,
            verbose: false,
        }
    }

    /// Resolves the configuration from command-line arguments, reading the
    /// configuration file they name.
    pub fn load(args: ChatArgs) -> Result<Self> {
        let file = match &args.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Self::new().with_file(file).with_args(args).validated()
    }

    /// Checks values that merge cleanly but cannot work.  A zero timeout
    /// would fail every request before it is sent.
    pub fn validated(self) -> Result<Self> {
        if self.timeout.is_zero() {
            return Err(Error::configuration("timeout must be at least one second"));
        }
        Ok(self)
    }

    /// Applies values from a configuration file.
    pub fn with_file(mut self, file: FileConfig) -> Self {
        if let Some(api_url) = file.api_url {
            self.api_url = Some(api_url);
        }
        if let Some(session_file) = file.session_file {
            self.session_file = Some(session_file);
        }
        if let Some(secs) = file.timeout_secs {
            self.timeout = Duration::from_secs(secs);
        }
        if let Some(color) = file.color {
            self.use_color = color;
        }
        self
    }

    /// Applies command-line arguments.
    pub fn with_args(mut self, args: ChatArgs) -> Self {
        if let Some(api_url) = args.api_url {
            self.api_url = Some(api_url);
        }
        if let Some(session_file) = args.session_file {
            self.session_file = Some(PathBuf::from(session_file));
        }
        if let Some(secs) = args.timeout_secs {
            self.timeout = Duration::from_secs(secs);
        }
        if args.no_color {
            self.use_color = false;
        }
        self.verbose |= args.verbose;
        self
    }

    /// Sets the API base URL.
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = Some(api_url.into());
        self
    }

    /// Sets the session file location.
    pub fn with_session_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.session_file = Some(path.into());
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }

    /// Enables logging to stderr.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Builds the HTTP client.
    pub fn client(&self) -> Result<Companion> {
        if self.timeout.is_zero() {
            return Err(Error::configuration("timeout must be at least one second"));
        }
        Companion::with_options(self.api_url.clone(), Some(self.timeout))
    }

    /// Opens the credential store.
    pub fn credential_store(&self) -> Result<FileCredentialStore> {
        match &self.session_file {
            Some(path) => Ok(FileCredentialStore::with_path(path)),
            None => FileCredentialStore::new(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl From<ChatArgs> for ClientConfig {
    fn from(args: ChatArgs) -> Self {
        Self::new().with_args(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ClientConfig::new();
        assert!(config.api_url.is_none());
        assert!(config.session_file.is_none());
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert!(config.use_color);
        assert!(!config.verbose);
    }

    #[test]
    fn config_from_args_custom() {
        let args = ChatArgs {
            api_url: Some("http://localhost:8080".to_string()),
            session_file: Some("/tmp/session.json".to_string()),
            config: None,
            timeout_secs: Some(5),
            no_color: true,
            verbose: true,
        };
        let config = ClientConfig::from(args);
        assert_eq!(config.api_url.as_deref(), Some("http://localhost:8080"));
        assert_eq!(config.session_file, Some(PathBuf::from("/tmp/session.json")));
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert!(!config.use_color);
        assert!(config.verbose);
    }

    #[test]
    fn args_override_file() {
        let file = FileConfig::parse(
            "api_url: http://file.example.com\ntimeout_secs: 30\ncolor: false\n",
        )
        .unwrap();
        let args = ChatArgs {
            api_url: Some("http://cli.example.com".to_string()),
            ..ChatArgs::default()
        };
        let config = ClientConfig::new().with_file(file).with_args(args);
        assert_eq!(config.api_url.as_deref(), Some("http://cli.example.com"));
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(!config.use_color);
    }

    #[test]
    fn file_config_parsing() {
        assert_eq!(FileConfig::parse("").unwrap(), FileConfig::default());
        assert!(FileConfig::parse("colour: true\n").is_err());
        assert!(FileConfig::parse("timeout_secs: soon\n").is_err());
    }

    #[test]
    fn load_reads_named_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("companion.yaml");
        fs::write(&path, "session_file: /tmp/other.json\n").unwrap();
        let args = ChatArgs {
            config: Some(path.to_string_lossy().into_owned()),
            ..ChatArgs::default()
        };
        let config = ClientConfig::load(args).unwrap();
        assert_eq!(config.session_file, Some(PathBuf::from("/tmp/other.json")));

        let args = ChatArgs {
            config: Some(dir.path().join("missing.yaml").to_string_lossy().into_owned()),
            ..ChatArgs::default()
        };
        assert!(ClientConfig::load(args).is_err());
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let args = ChatArgs {
            timeout_secs: Some(0),
            ..ChatArgs::default()
        };
        assert!(matches!(
            ClientConfig::load(args),
            Err(Error::Configuration { .. })
        ));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("companion.yaml");
        fs::write(&path, "timeout_secs: 0\n").unwrap();
        let args = ChatArgs {
            config: Some(path.to_string_lossy().into_owned()),
            ..ChatArgs::default()
        };
        assert!(matches!(
            ClientConfig::load(args),
            Err(Error::Configuration { .. })
        ));

        // A command-line value replaces a zero from the file.
        let args = ChatArgs {
            config: Some(path.to_string_lossy().into_owned()),
            timeout_secs: Some(5),
            ..ChatArgs::default()
        };
        assert_eq!(
            ClientConfig::load(args).unwrap().timeout,
            Duration::from_secs(5)
        );

        let config = ClientConfig::new().with_timeout(Duration::ZERO);
        assert!(matches!(config.client(), Err(Error::Configuration { .. })));
    }

    #[test]
    fn config_builder_pattern() {
        let config = ClientConfig::new()
            .with_api_url("https://companion.example.com")
            .with_session_file("session.json")
            .with_timeout(Duration::from_secs(10))
            .without_color()
            .with_verbose(true);
        assert_eq!(
            config.api_url.as_deref(),
            Some("https://companion.example.com")
        );
        assert_eq!(config.session_file, Some(PathBuf::from("session.json")));
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert!(!config.use_color);
        assert!(config.verbose);
        assert_eq!(
            config.client().unwrap().transport().base_url().as_str(),
            "https://companion.example.com/"
        );
        assert_eq!(
            config.credential_store().unwrap().path(),
            Path::new("session.json")
        );
    }
}
