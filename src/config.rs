use std::{
    env,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
};

const DEFAULT_PORT: u16 = 5000;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen_addr: SocketAddr,
    pub model_path: PathBuf,
    /// `None` allows any origin.
    pub cors_allowed_origins: Option<Vec<String>>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let listen_addr = env::var("SERVER_ADDR")
            .unwrap_or_else(|_| format!("0.0.0.0:{DEFAULT_PORT}"))
            .parse()
            .unwrap_or_else(|_| default_listen_addr());

        let model_path =
            PathBuf::from(env::var("MODEL_PATH").unwrap_or_else(|_| "models/model.json".to_string()));

        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .ok()
            .map(|raw| parse_origins(&raw))
            .filter(|origins| !origins.is_empty());

        Ok(Self {
            listen_addr,
            model_path,
            cors_allowed_origins,
        })
    }

    pub fn with_model_path(model_path: impl Into<PathBuf>) -> Self {
        Self {
            listen_addr: default_listen_addr(),
            model_path: model_path.into(),
            cors_allowed_origins: None,
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT)
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origins_are_trimmed_and_blank_entries_dropped() {
        let origins = parse_origins(" http://localhost:3000, ,http://127.0.0.1:5000 ");
        assert_eq!(
            origins,
            vec!["http://localhost:3000", "http://127.0.0.1:5000"]
        );
    }

    #[test]
    fn explicit_model_path_uses_default_listener() {
        let config = AppConfig::with_model_path("/tmp/model.json");
        assert_eq!(config.listen_addr.port(), DEFAULT_PORT);
        assert_eq!(config.model_path, PathBuf::from("/tmp/model.json"));
        assert!(config.cors_allowed_origins.is_none());
    }
}
