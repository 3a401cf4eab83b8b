use std::{net::SocketAddr, time::Duration};

use serde::{Deserialize, Serialize};

use cwquery_client::TransportConfig;
use cwquery_core::Environment;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Client certificate material for mutual TLS
    #[serde(default)]
    pub tls: TlsConfig,
    /// Upstream constants: timeout, organization identity
    #[serde(default)]
    pub upstream: UpstreamConfig,
    /// Per-environment base URLs and allowed hostnames
    #[serde(default)]
    pub environments: EnvironmentsConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("server.port must be > 0".into());
        }
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        if self.upstream.timeout_ms == 0 {
            return Err("upstream.timeout_ms must be > 0".into());
        }
        if self.upstream.org_oid.is_empty() {
            return Err("upstream.org_oid must not be empty".into());
        }
        for (name, env) in [
            ("integration", &self.environments.integration),
            ("production", &self.environments.production),
        ] {
            for (field, value) in [
                ("query_base_url", &env.query_base_url),
                ("api_base_url", &env.api_base_url),
            ] {
                url::Url::parse(value).map_err(|e| {
                    format!("environments.{name}.{field} is not a valid URL: {e}")
                })?;
            }
            if env.allowed_host.is_empty() {
                return Err(format!("environments.{name}.allowed_host must not be empty"));
            }
        }
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        use std::net::{IpAddr, Ipv4Addr};
        let host: IpAddr = self
            .server
            .host
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));
        SocketAddr::from((host, self.server.port))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.upstream.timeout_ms)
    }

    /// Resolves the endpoint set for an environment tag.
    pub fn environment(&self, env: Environment) -> &EnvironmentConfig {
        match env {
            Environment::Integration => &self.environments.integration,
            Environment::Production => &self.environments.production,
        }
    }

    /// The transport view of the TLS section.
    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            cert_path: self.tls.cert_path.clone(),
            key_path: self.tls.key_path.clone(),
            ca_path: self.tls.ca_path.clone(),
            skip_verify: self.tls.skip_verify,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TlsConfig {
    #[serde(default = "default_cert_path")]
    pub cert_path: String,
    #[serde(default = "default_key_path")]
    pub key_path: String,
    #[serde(default = "default_ca_path")]
    pub ca_path: Option<String>,
    /// Disables peer verification. Test-only; never enable by default.
    #[serde(default)]
    pub skip_verify: bool,
}

fn default_cert_path() -> String {
    "./certs/client-cert.pem".into()
}
fn default_key_path() -> String {
    "./certs/client-key.pem".into()
}
fn default_ca_path() -> Option<String> {
    Some("./certs/ca-cert.pem".into())
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            cert_path: default_cert_path(),
            key_path: default_key_path(),
            ca_path: default_ca_path(),
            skip_verify: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Hard ceiling for one upstream attempt, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Organization OID used as assertion issuer/subject.
    #[serde(default = "default_org_oid")]
    pub org_oid: String,
    /// Organization display name.
    #[serde(default = "default_org_name")]
    pub org_name: String,
    /// OID of the identity-token issuer (system of the externally issued
    /// patient identifier).
    #[serde(default = "default_identity_issuer_oid")]
    pub identity_issuer_oid: String,
}

fn default_timeout_ms() -> u64 {
    55_000
}
fn default_org_oid() -> String {
    "2.16.840.1.113883.3.5958.1000.300".into()
}
fn default_org_name() -> String {
    "CVS Health".into()
}
fn default_identity_issuer_oid() -> String {
    "2.16.840.1.113883.3.5958.1000.300.1".into()
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            org_oid: default_org_oid(),
            org_name: default_org_name(),
            identity_issuer_oid: default_identity_issuer_oid(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentsConfig {
    #[serde(default = "EnvironmentConfig::integration_defaults")]
    pub integration: EnvironmentConfig,
    #[serde(default = "EnvironmentConfig::production_defaults")]
    pub production: EnvironmentConfig,
}

impl Default for EnvironmentsConfig {
    fn default() -> Self {
        Self {
            integration: EnvironmentConfig::integration_defaults(),
            production: EnvironmentConfig::production_defaults(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    /// DocumentReference search endpoint.
    pub query_base_url: String,
    /// FHIR API base (trailing slash), used for patient registration.
    pub api_base_url: String,
    /// The single hostname retrieval URLs may target.
    pub allowed_host: String,
}

impl EnvironmentConfig {
    fn integration_defaults() -> Self {
        Self {
            query_base_url:
                "https://api.integration.commonwellalliance.lkopera.com/v2/R4/DocumentReference"
                    .into(),
            api_base_url: "https://api.integration.commonwellalliance.lkopera.com/v2/R4/".into(),
            allowed_host: "api.integration.commonwellalliance.lkopera.com".into(),
        }
    }

    fn production_defaults() -> Self {
        Self {
            query_base_url:
                "https://api.commonwellalliance.lkopera.com/v2/R4/DocumentReference".into(),
            api_base_url: "https://api.commonwellalliance.lkopera.com/v2/R4/".into(),
            allowed_host: "api.commonwellalliance.lkopera.com".into(),
        }
    }

    /// The patient registration endpoint for the given organization.
    pub fn patient_url(&self, org_oid: &str) -> String {
        format!("{}org/{}/Patient", self.api_base_url, org_oid)
    }
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        match path {
            Some(p) => {
                let pathbuf = PathBuf::from(p);
                if pathbuf.exists() {
                    builder = builder.add_source(File::from(pathbuf));
                }
            }
            None => {
                let default_path = PathBuf::from("cwquery.toml");
                if default_path.exists() {
                    builder = builder.add_source(File::from(default_path));
                }
            }
        }
        // Environment variable overrides, e.g., CWQUERY__SERVER__PORT=9090
        builder = builder.add_source(
            Environment::with_prefix("CWQUERY")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let cfg = AppConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.upstream.timeout_ms, 55_000);
        assert_eq!(
            cfg.environments.integration.allowed_host,
            "api.integration.commonwellalliance.lkopera.com"
        );
        assert!(!cfg.tls.skip_verify);
    }

    #[test]
    fn test_patient_url_composition() {
        let cfg = AppConfig::default();
        let url = cfg
            .environment(Environment::Integration)
            .patient_url(&cfg.upstream.org_oid);
        assert_eq!(
            url,
            "https://api.integration.commonwellalliance.lkopera.com/v2/R4/org/2.16.840.1.113883.3.5958.1000.300/Patient"
        );
    }

    #[test]
    fn test_toml_sections_override_defaults() {
        let toml_content = r#"
            [server]
            port = 5000

            [upstream]
            timeout_ms = 1000

            [environments.integration]
            query_base_url = "https://upstream.test/DocumentReference"
            api_base_url = "https://upstream.test/"
            allowed_host = "upstream.test"
        "#;
        let cfg: AppConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(cfg.server.port, 5000);
        assert_eq!(cfg.upstream.timeout_ms, 1000);
        assert_eq!(cfg.environments.integration.allowed_host, "upstream.test");
        // Untouched sections keep their defaults.
        assert_eq!(cfg.upstream.org_name, "CVS Health");
        assert!(
            cfg.environments
                .production
                .query_base_url
                .contains("api.commonwellalliance")
        );
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut cfg = AppConfig::default();
        cfg.upstream.timeout_ms = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.logging.level = "loud".into();
        assert!(cfg.validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.environments.production.query_base_url = "not a url".into();
        assert!(cfg.validate().is_err());
    }
}
