use clap::Parser;
use dbgcon::Config;
use std::fs::{self, OpenOptions};
use std::io;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Parser, Debug, Clone, Default)]
pub struct ConsoleOpts {
    /// Address the console listens on (default 127.0.0.1)
    #[arg(short = 'b', long = "bind", help = "Listen address")]
    pub bind: Option<IpAddr>,

    /// UDP port the console listens on (default 12345)
    #[arg(short = 'p', long = "port", help = "UDP port")]
    pub port: Option<u16>,

    /// YAML file with `bind` and `port` keys. Flags take precedence.
    #[arg(short = 'c', long = "config", help = "YAML config file")]
    pub config: Option<PathBuf>,

    /// Append log output to this file
    #[arg(long = "log-file", help = "Write logs to this file")]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

impl ConsoleOpts {
    /// Defaults, overridden by the config file, overridden by flags.
    pub fn resolve_config(&self) -> Result<Config, ConfigError> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => Config::default(),
        };
        if let Some(bind) = self.bind {
            config.bind = bind;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        Ok(config)
    }
}

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_config(text: &str) -> Result<Config, serde_yaml::Error> {
    if text.trim().is_empty() {
        return Ok(Config::default());
    }
    serde_yaml::from_str(text)
}

/// Sets up `env_logger` (`RUST_LOG`, default `info`). Logs go to `log_file`
/// when given, else to stderr if `stderr` is set, else nowhere.
pub fn init_logging(log_file: Option<&Path>, stderr: bool) -> io::Result<()> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    builder.format_timestamp_millis();
    match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }
        None if stderr => {
            builder.target(env_logger::Target::Stderr);
        }
        None => return Ok(()),
    }
    // A logger may already be installed (tests); keep it.
    let _ = builder.try_init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn flags_override_file() {
        let dir = std::env::temp_dir().join(format!("dbgcon-cfg-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("console.yaml");
        fs::write(&path, "bind: 0.0.0.0\nport: 4000\n").unwrap();

        let opts = ConsoleOpts::parse_from(["dbg-console", "-c", path.to_str().unwrap(), "-p", "5000"]);
        let cfg = opts.resolve_config().unwrap();
        assert_eq!(cfg.bind, IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        assert_eq!(cfg.port, 5000);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn defaults_without_flags() {
        let opts = ConsoleOpts::parse_from(["dbg-console"]);
        assert_eq!(opts.resolve_config().unwrap(), Config::default());
    }

    #[test]
    fn partial_and_empty_files() {
        assert_eq!(parse_config("port: 9999").unwrap().port, 9999);
        assert_eq!(parse_config("port: 9999").unwrap().bind, Config::default().bind);
        assert_eq!(parse_config("  \n").unwrap(), Config::default());
        assert!(parse_config("colour: red").is_err());
    }

    #[test]
    fn missing_file_is_reported() {
        let err = load_config(Path::new("/nonexistent/dbgcon.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
