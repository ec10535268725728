use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Parser, Debug, Default)]
#[command(name = "campus-feed", about = "A campus photo feed server")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Path to data directory
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Base URL of the storage service
    #[arg(long, env = "CAMPUS_FEED_STORAGE_URL")]
    pub storage_url: Option<String>,

    /// Public (anon) storage key
    #[arg(long, env = "CAMPUS_FEED_STORAGE_ANON_KEY", hide_env_values = true)]
    pub storage_anon_key: Option<String>,

    /// Service-role storage key; bypasses access policies when set
    #[arg(long, env = "CAMPUS_FEED_STORAGE_SERVICE_KEY", hide_env_values = true)]
    pub storage_service_key: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Insert demo users and posts
    Seed,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub url: String,
    pub anon_key: String,
    pub service_role_key: Option<String>,
    pub max_upload_bytes: usize,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AuthConfig {
    pub cookie_name: String,
    pub session_hours: u64,
    pub bcrypt_cost: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:54321".to_string(),
            anon_key: String::new(),
            service_role_key: None,
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            cookie_name: "campus_session".to_string(),
            session_hours: 24 * 7,
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl Config {
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let data_dir = Self::data_dir(cli)?;
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| data_dir.join("config.toml"));

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Config::default()
        };

        // CLI and environment overrides
        if let Some(ref host) = cli.host {
            config.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            config.server.port = port;
        }
        if let Some(ref url) = cli.storage_url {
            config.storage.url = url.clone();
        }
        if let Some(ref key) = cli.storage_anon_key {
            config.storage.anon_key = key.clone();
        }
        if let Some(ref key) = cli.storage_service_key {
            config.storage.service_role_key = Some(key.clone());
        }

        url::Url::parse(&config.storage.url)
            .map_err(|e| anyhow::anyhow!("invalid storage url {:?}: {}", config.storage.url, e))?;

        if config.database.path.is_none() {
            config.database.path = Some(data_dir.join("campus-feed.db"));
        }

        Ok(config)
    }

    pub fn data_dir(cli: &Cli) -> anyhow::Result<PathBuf> {
        match &cli.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => dirs::home_dir()
                .map(|home| home.join(".campus-feed"))
                .ok_or_else(|| anyhow::anyhow!("Could not determine home directory")),
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from("campus-feed.db"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli_in(dir: &std::path::Path) -> Cli {
        Cli {
            data_dir: Some(dir.to_path_buf()),
            ..Default::default()
        }
    }

    #[test]
    fn default_config_has_expected_values() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.auth.cookie_name, "campus_session");
        assert_eq!(config.auth.session_hours, 168);
        assert_eq!(config.auth.bcrypt_cost, bcrypt::DEFAULT_COST);
        assert_eq!(config.storage.url, "http://127.0.0.1:54321");
        assert!(config.storage.service_role_key.is_none());
        assert_eq!(config.storage.max_upload_bytes, 10 * 1024 * 1024);
        assert!(config.database.path.is_none());
    }

    #[test]
    fn data_dir_uses_cli_override() {
        let cli = cli_in(std::path::Path::new("/tmp/test-campus-feed"));
        assert_eq!(
            Config::data_dir(&cli).unwrap(),
            PathBuf::from("/tmp/test-campus-feed")
        );
    }

    #[test]
    fn data_dir_defaults_to_home_dot_campus_feed() {
        let dir = Config::data_dir(&Cli::default()).unwrap();
        assert!(dir.ends_with(".campus-feed"));
    }

    #[test]
    fn load_with_no_config_file_uses_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::load(&cli_in(tmp.path())).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.db_path(), tmp.path().join("campus-feed.db"));
    }

    #[test]
    fn load_reads_toml_file() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(
            &config_path,
            r#"
[server]
host = "192.168.1.1"
port = 9000

[storage]
url = "https://storage.campus.example"
anon_key = "anon"
service_role_key = "service"
max_upload_bytes = 1024

[auth]
cookie_name = "my_cookie"
session_hours = 24
"#,
        )
        .unwrap();

        let cli = Cli {
            config: Some(config_path),
            ..cli_in(tmp.path())
        };
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.server.host, "192.168.1.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.storage.url, "https://storage.campus.example");
        assert_eq!(config.storage.anon_key, "anon");
        assert_eq!(config.storage.service_role_key.as_deref(), Some("service"));
        assert_eq!(config.storage.max_upload_bytes, 1024);
        assert_eq!(config.auth.cookie_name, "my_cookie");
        assert_eq!(config.auth.session_hours, 24);
    }

    #[test]
    fn cli_overrides_beat_toml_values() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(
            &config_path,
            r#"
[server]
host = "192.168.1.1"
port = 9000

[storage]
anon_key = "from-file"
"#,
        )
        .unwrap();

        let cli = Cli {
            config: Some(config_path),
            host: Some("10.0.0.1".to_string()),
            port: Some(4000),
            storage_anon_key: Some("from-cli".to_string()),
            storage_service_key: Some("service".to_string()),
            ..cli_in(tmp.path())
        };
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.server.host, "10.0.0.1");
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.storage.anon_key, "from-cli");
        assert_eq!(config.storage.service_role_key.as_deref(), Some("service"));
    }

    #[test]
    fn load_rejects_invalid_storage_url() {
        let tmp = tempfile::tempdir().unwrap();
        let cli = Cli {
            storage_url: Some("not a url".to_string()),
            ..cli_in(tmp.path())
        };
        assert!(Config::load(&cli).is_err());
    }

    #[test]
    fn seed_subcommand_parses() {
        let cli = Cli::try_parse_from(["campus-feed", "--port", "8080", "seed"]).unwrap();
        assert_eq!(cli.command, Some(Command::Seed));
        assert_eq!(cli.port, Some(8080));
    }
}
