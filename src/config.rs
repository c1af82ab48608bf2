use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;

#[derive(Deserialize)]
pub struct Config {
    pub listen: ListenConfig,
    pub backend: BackendConfig,
}

#[derive(Deserialize)]
pub struct ListenConfig {
    pub ip: String,
    pub port: u16,
    pub tls: Option<TlsConfig>,
}

#[derive(Deserialize)]
pub struct TlsConfig {
    pub cert_file: String,
    pub key_file: String,
}

#[derive(Deserialize)]
pub struct BackendConfig {
    pub host: String,
    pub port: u16,
}

impl ListenConfig {
    #[must_use]
    pub fn addr(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }
}

impl BackendConfig {
    #[must_use]
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

pub fn load_config() -> Result<Config> {
    let content = fs::read_to_string("config.toml").context("Failed to read config.toml file")?;
    toml::from_str(&content).context("Failed to parse config.toml as valid TOML")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_listener_config() {
        let config: Config = toml::from_str(
            r#"
            [listen]
            ip = "127.0.0.1"
            port = 63790

            [backend]
            host = "127.0.0.1"
            port = 6379
            "#,
        )
        .unwrap();

        assert_eq!(config.listen.addr(), "127.0.0.1:63790");
        assert_eq!(config.backend.addr(), "127.0.0.1:6379");
        assert!(config.listen.tls.is_none());
    }

    #[test]
    fn parses_tls_listener_config() {
        let config: Config = toml::from_str(
            r#"
            [listen]
            ip = "0.0.0.0"
            port = 443

            [listen.tls]
            cert_file = "cert.pem"
            key_file = "key.pem"

            [backend]
            host = "10.0.0.5"
            port = 6379
            "#,
        )
        .unwrap();

        let tls = config.listen.tls.expect("tls section should be present");
        assert_eq!(tls.cert_file, "cert.pem");
        assert_eq!(tls.key_file, "key.pem");
    }

    #[test]
    fn rejects_config_without_backend() {
        let result: Result<Config, _> = toml::from_str(
            r#"
            [listen]
            ip = "127.0.0.1"
            port = 63790
            "#,
        );

        assert!(result.is_err());
    }
}
