//! Server settings.
//!
//! ```yaml
//! listen: 127.0.0.1:8080
//! mail:
//!   from: web@afz.org
//!   to: info@afz.org
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid server config: {0}")]
    Parse(String),
    #[error("mail address `{0}` is not valid")]
    Address(String),
}

/// Sender and recipient of the notification mails.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MailConfig {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
    pub mail: MailConfig,
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

impl ServerConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, ServerConfigError> {
        let config: Self =
            serde_saphyr::from_str(yaml).map_err(|e| ServerConfigError::Parse(e.to_string()))?;
        for address in [&config.mail.from, &config.mail.to] {
            if !crate::api::is_email(address) {
                return Err(ServerConfigError::Address(address.clone()));
            }
        }
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ServerConfigError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| ServerConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&yaml)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_listen_defaults_to_localhost() {
        let config = ServerConfig::from_yaml(
            r#"
mail:
  from: web@afz.org
  to: info@afz.org
"#,
        )
        .unwrap();

        assert_eq!(config.listen, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(config.mail.to, "info@afz.org");
    }

    #[test]
    fn test_bad_mail_address_is_rejected() {
        let error = ServerConfig::from_yaml(
            r#"
listen: 0.0.0.0:3000
mail:
  from: web@afz.org
  to: nobody
"#,
        )
        .unwrap_err();

        assert!(matches!(error, ServerConfigError::Address(a) if a == "nobody"));
    }

    #[test]
    fn test_missing_mail_section() {
        assert!(matches!(
            ServerConfig::from_yaml("listen: 0.0.0.0:3000\n"),
            Err(ServerConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.yaml");
        std::fs::write(&path, "mail:\n  from: a@afz.org\n  to: b@afz.org\n").unwrap();

        let config = ServerConfig::from_file(&path).unwrap();
        assert_eq!(config.mail.from, "a@afz.org");

        assert!(matches!(
            ServerConfig::from_file(dir.path().join("missing.yaml")),
            Err(ServerConfigError::Io { .. })
        ));
    }
}
