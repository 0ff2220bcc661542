// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration surface: CLI flags via `clap`, an optional layered YAML
//! document via `serde_yaml`, CLI always winning over the file. The config
//! surface is nested (`server`/`logging`/`security`) rather than flat.
//!
//! Every CLI field is `Option<T>` (no `default_value`) so "not passed on
//! the command line" is distinguishable from "explicitly set to the
//! default" — [`ResolvedConfig::build`] applies CLI, then file, then a
//! hardcoded default, in that order, per field.

use std::path::PathBuf;

use serde::Deserialize;

/// CLI/env layer. Every field left `None` falls through to the file layer
/// and then to a hardcoded default in [`ResolvedConfig::build`].
#[derive(Debug, Clone, Default, clap::Parser)]
#[command(name = "sentry-server", about = "Log inspection and streaming service")]
pub struct CliConfig {
    /// Path to a YAML config file.
    #[arg(long, env = "SENTRY_CONFIG_FILE")]
    pub config_file: Option<PathBuf>,

    #[arg(long, env = "SENTRY_HOST")]
    pub host: Option<String>,

    #[arg(long, env = "SENTRY_PORT")]
    pub port: Option<u16>,

    /// Directories to scan and watch. Repeatable or comma-separated.
    #[arg(long = "log-path", env = "SENTRY_LOG_PATHS", value_delimiter = ',')]
    pub log_paths: Vec<PathBuf>,

    #[arg(long, env = "SENTRY_MAX_FILE_SIZE")]
    pub max_file_size: Option<u64>,

    #[arg(long, env = "SENTRY_CACHE_SIZE")]
    pub cache_size: Option<usize>,

    #[arg(long, env = "SENTRY_LOG_LEVEL")]
    pub log_level: Option<String>,

    #[arg(long, env = "SENTRY_LOG_FORMAT")]
    pub log_format: Option<String>,

    #[arg(long, env = "SENTRY_LOG_OUTPUT")]
    pub log_output_path: Option<PathBuf>,

    #[arg(long, env = "SENTRY_ENABLE_AUTH")]
    pub enable_auth: Option<bool>,

    #[arg(long, env = "SENTRY_USERNAME")]
    pub username: Option<String>,

    #[arg(long, env = "SENTRY_PASSWORD")]
    pub password: Option<String>,

    /// Exact IPs or CIDR ranges permitted to connect. Empty = allow all.
    #[arg(long, env = "SENTRY_ALLOWED_IPS", value_delimiter = ',')]
    pub allowed_ips: Vec<String>,

    #[arg(long, env = "SENTRY_TLS_ENABLED")]
    pub tls_enabled: Option<bool>,

    #[arg(long, env = "SENTRY_TLS_CERT_FILE")]
    pub tls_cert_file: Option<PathBuf>,

    #[arg(long, env = "SENTRY_TLS_KEY_FILE")]
    pub tls_key_file: Option<PathBuf>,

    #[arg(long, env = "SENTRY_TLS_AUTO_CERT")]
    pub tls_auto_cert: Option<bool>,

    /// Detach the process on POSIX (fork, setsid, redirect stdio to null,
    /// write a pid file). Out of scope for this service; parsed and
    /// validated but has no OS-level effect.
    #[arg(long, env = "SENTRY_DAEMON")]
    pub daemon: bool,
}

/// The nested `server`/`logging`/`security` config file document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub server: ServerSection,
    pub logging: LoggingSection,
    pub security: SecuritySection,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSection {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub log_paths: Vec<PathBuf>,
    pub max_file_size: Option<u64>,
    pub cache_size: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSection {
    pub level: Option<String>,
    pub format: Option<String>,
    pub output_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SecuritySection {
    pub enable_auth: Option<bool>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub allowed_ips: Vec<String>,
    pub tls: TlsSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TlsSection {
    pub enabled: Option<bool>,
    pub cert_file: Option<PathBuf>,
    pub key_file: Option<PathBuf>,
    pub auto_cert: Option<bool>,
}

impl FileConfig {
    pub fn from_yaml(path: &std::path::Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&contents)?)
    }
}

/// Effective configuration after applying CLI > file > default precedence.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub host: String,
    pub port: u16,
    pub log_paths: Vec<PathBuf>,
    pub max_file_size: u64,
    pub cache_size: usize,
    pub log_level: String,
    pub log_format: String,
    pub log_output_path: Option<PathBuf>,
    pub enable_auth: bool,
    pub username: Option<String>,
    pub password: Option<String>,
    pub allowed_ips: Vec<String>,
    pub tls_enabled: bool,
    pub tls_cert_file: Option<PathBuf>,
    pub tls_key_file: Option<PathBuf>,
    pub tls_auto_cert: bool,
    pub daemon: bool,
}

/// Bytes assumed per cached page entry when converting the configured
/// entry-count `cacheSize` into `sentry_core::manager::LogManagerConfig`'s
/// `cache_memory_cap_bytes` budget. `CacheLayer`'s page cache has no entry
/// cap of its own; this is the resolved config's own approximation, not a
/// change to `CacheLayer`, and is recorded as an Open Question decision in
/// DESIGN.md.
const ASSUMED_BYTES_PER_CACHE_ENTRY: u64 = 8 * 1024;

impl ResolvedConfig {
    pub fn build(cli: &CliConfig, file: Option<&FileConfig>) -> Self {
        let server = file.map(|f| &f.server);
        let logging = file.map(|f| &f.logging);
        let security = file.map(|f| &f.security);
        let tls = security.map(|s| &s.tls);

        let log_paths = if !cli.log_paths.is_empty() {
            cli.log_paths.clone()
        } else if let Some(s) = server {
            if !s.log_paths.is_empty() {
                s.log_paths.clone()
            } else {
                vec![PathBuf::from(".")]
            }
        } else {
            vec![PathBuf::from(".")]
        };

        Self {
            host: cli
                .host
                .clone()
                .or_else(|| server.and_then(|s| s.host.clone()))
                .unwrap_or_else(|| "127.0.0.1".to_owned()),
            port: cli.port.or_else(|| server.and_then(|s| s.port)).unwrap_or(8080),
            log_paths,
            max_file_size: cli
                .max_file_size
                .or_else(|| server.and_then(|s| s.max_file_size))
                .unwrap_or(100 * 1024 * 1024),
            cache_size: cli
                .cache_size
                .or_else(|| server.and_then(|s| s.cache_size))
                .unwrap_or(1000),
            log_level: cli
                .log_level
                .clone()
                .or_else(|| logging.and_then(|l| l.level.clone()))
                .unwrap_or_else(|| "info".to_owned()),
            log_format: cli
                .log_format
                .clone()
                .or_else(|| logging.and_then(|l| l.format.clone()))
                .unwrap_or_else(|| "text".to_owned()),
            log_output_path: cli
                .log_output_path
                .clone()
                .or_else(|| logging.and_then(|l| l.output_path.clone())),
            enable_auth: cli
                .enable_auth
                .or_else(|| security.and_then(|s| s.enable_auth))
                .unwrap_or(false),
            username: cli.username.clone().or_else(|| security.and_then(|s| s.username.clone())),
            password: cli.password.clone().or_else(|| security.and_then(|s| s.password.clone())),
            allowed_ips: if !cli.allowed_ips.is_empty() {
                cli.allowed_ips.clone()
            } else {
                security.map(|s| s.allowed_ips.clone()).unwrap_or_default()
            },
            tls_enabled: cli.tls_enabled.or_else(|| tls.and_then(|t| t.enabled)).unwrap_or(false),
            tls_cert_file: cli
                .tls_cert_file
                .clone()
                .or_else(|| tls.and_then(|t| t.cert_file.clone())),
            tls_key_file: cli.tls_key_file.clone().or_else(|| tls.and_then(|t| t.key_file.clone())),
            tls_auto_cert: cli
                .tls_auto_cert
                .or_else(|| tls.and_then(|t| t.auto_cert))
                .unwrap_or(false),
            daemon: cli.daemon,
        }
    }

    /// `password (>= 6 chars)`, checked only when auth is enabled.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.enable_auth {
            let password = self
                .password
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("security.enableAuth is set but no password was configured"))?;
            if password.len() < 6 {
                anyhow::bail!("security.password must be at least 6 characters");
            }
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn cache_memory_cap_bytes(&self) -> u64 {
        self.cache_size as u64 * ASSUMED_BYTES_PER_CACHE_ENTRY
    }

    pub fn env_filter(&self) -> tracing_subscriber::EnvFilter {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(self.log_level.clone()))
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
