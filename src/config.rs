use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use crate::logging::LogSettings;
use crate::taste::EngineConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Memory,
    Sqlite,
}

impl StoreKind {
    fn from_env() -> Self {
        match std::env::var("TASTE_STORE")
            .map(|v| v.trim().to_ascii_lowercase())
            .as_deref()
        {
            Ok("sqlite") => StoreKind::Sqlite,
            Ok("memory") | Err(_) => StoreKind::Memory,
            Ok(other) => {
                tracing::warn!(value = other, "unknown TASTE_STORE, using memory");
                StoreKind::Memory
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub logging: LogSettings,
    pub store: StoreKind,
    pub sqlite_path: PathBuf,
    pub catalog_path: Option<PathBuf>,
    pub engine: EngineConfig,
}

impl Config {
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(3000);

        let host = std::env::var("HOST")
            .ok()
            .and_then(|value| value.parse::<IpAddr>().ok())
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));

        let sqlite_path = std::env::var("TASTE_SQLITE_PATH")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_sqlite_path);

        let catalog_path = std::env::var("TASTE_CATALOG_PATH")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        Self {
            host,
            port,
            logging: LogSettings::from_env(),
            store: StoreKind::from_env(),
            sqlite_path,
            catalog_path,
            engine: EngineConfig::from_env(),
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

pub fn default_sqlite_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("taste-discovery")
        .join("taste.db")
}
