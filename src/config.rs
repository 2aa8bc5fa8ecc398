use crate::error::{ServerError, ServerResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Server configuration
///
/// Built once by the command-line collaborator and immutable for the
/// lifetime of the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    /// Directory tree to serve files from
    pub root: PathBuf,

    /// Port to listen on
    pub port: u16,

    /// Host to listen on
    pub host: String,

    /// Single-page-application mode: fall back to the root index.html
    /// for any unresolved path
    pub spa: bool,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            port: 8080,
            host: "127.0.0.1".to_string(),
            spa: false,
        }
    }
}

impl ServeConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the directory to serve files from
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// Set the port to listen on
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the host to listen on
    pub fn with_host(mut self, host: &str) -> Self {
        self.host = host.to_string();
        self
    }

    /// Enable or disable single-page-application fallback
    pub fn with_spa(mut self, spa: bool) -> Self {
        self.spa = spa;
        self
    }

    /// Get the full address string (host:port)
    pub fn socket_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Resolve the root directory to an absolute path and verify it is
    /// a directory the process can read
    pub fn canonicalize_root(&mut self) -> ServerResult<()> {
        let resolved = fs::canonicalize(&self.root).map_err(|e| {
            ServerError::Config(format!("cannot resolve folder {}: {}", self.root.display(), e))
        })?;

        if !resolved.is_dir() {
            return Err(ServerError::Config(format!(
                "{} is not a directory",
                resolved.display()
            )));
        }

        self.root = resolved;
        Ok(())
    }

    /// Load configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> ServerResult<Self> {
        let content = fs::read_to_string(path)?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save_to_json_file<P: AsRef<Path>>(&self, path: P) -> ServerResult<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}
