use std::env;
use std::ffi::OsString;
use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::LevelFilter;
use serde::Deserialize;

use crate::logs;

mod defaults;

pub const ENV_GRPC_PORT: &str = "EXT_AUTHZ_GRPC_PORT";
pub const ENV_HOST: &str = "EXT_AUTHZ_HOST";
pub const ENV_LOG_LEVEL: &str = "EXT_AUTHZ_LOG_LEVEL";

/// Envoy ext_authz gRPC server for demo purposes. Requests carrying the
/// `tested-header` header are allowed, all others are denied.
#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
pub struct Arg {
    /// gRPC server port [default: 9000]
    #[arg(long)]
    pub grpc: Option<String>,

    /// Host address to bind the gRPC server [default: 0.0.0.0]
    #[arg(long)]
    pub host: Option<String>,

    /// Log level, one of: error, warn, info, debug [default: info]
    #[arg(short, long)]
    pub level: Option<String>,

    /// Path of an optional TOML config file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Settings read from the TOML config file. Every key may be omitted.
#[derive(Debug, Deserialize, PartialEq, Eq)]
pub struct FileConfig {
    #[serde(default = "defaults::grpc_port")]
    pub grpc_port: u16,

    #[serde(default = "defaults::host")]
    pub host: String,

    #[serde(default = "defaults::log_level")]
    pub log_level: String,
}

/// The resolved configuration the server runs with.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind: SocketAddr,

    pub level: LevelFilter,
}

impl FileConfig {
    pub fn load<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => return Ok(Self::default()),
        };
        let path = path.as_ref();

        let data = fs::read(path)
            .with_context(|| format!("read config file '{}'", path.display()))?;
        let toml_str = String::from_utf8(data)
            .with_context(|| format!("decode config file '{}' into utf-8", path.display()))?;

        Self::parse(&toml_str)
            .with_context(|| format!("parse config file '{}' toml", path.display()))
    }

    pub fn parse(toml_str: &str) -> Result<Self> {
        let cfg: FileConfig = toml::from_str(toml_str)?;
        Ok(cfg)
    }
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            grpc_port: defaults::grpc_port(),
            host: defaults::host(),
            log_level: defaults::log_level(),
        }
    }
}

impl Arg {
    pub fn normalize(&self) -> Result<Config> {
        self.normalize_with(|key| env::var_os(key))
    }

    /// Resolves the final config. Precedence: command line flag, then
    /// environment variable, then config file, then built-in default.
    pub fn normalize_with<F>(&self, getenv: F) -> Result<Config>
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let file = FileConfig::load(self.config.as_ref()).context("load config file")?;

        let port = match Self::pick(&self.grpc, ENV_GRPC_PORT, &getenv)? {
            Some(port) => parse_port(&port)?,
            None => file.grpc_port,
        };

        let host = Self::pick(&self.host, ENV_HOST, &getenv)?.unwrap_or(file.host);
        if host.is_empty() {
            bail!("Host address could not be empty");
        }
        let ip: IpAddr = host
            .parse()
            .with_context(|| format!(r#"Invalid host address "{host}""#))?;

        let level = Self::pick(&self.level, ENV_LOG_LEVEL, &getenv)?.unwrap_or(file.log_level);
        let level = logs::parse_level(&level)?;

        Ok(Config {
            bind: SocketAddr::new(ip, port),
            level,
        })
    }

    fn pick<F>(flag: &Option<String>, key: &str, getenv: &F) -> Result<Option<String>>
    where
        F: Fn(&str) -> Option<OsString>,
    {
        if let Some(value) = flag {
            return Ok(Some(value.clone()));
        }
        match getenv(key) {
            Some(value) => Ok(Some(
                parse_osstr(value).with_context(|| format!("read env {key}"))?,
            )),
            None => Ok(None),
        }
    }
}

pub fn parse_port(s: &str) -> Result<u16> {
    if s.is_empty() {
        bail!("gRPC port could not be empty");
    }
    s.parse()
        .with_context(|| format!(r#"Invalid gRPC port "{s}", expect a number in [0,65535]"#))
}

pub fn parse_osstr(s: OsString) -> Result<String> {
    match s.to_str() {
        Some(s) => Ok(s.to_string()),
        None => bail!("Parse string failed, please check your config"),
    }
}
