use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::warn;

/// Secrets that must not survive into a real deployment.
const PLACEHOLDER_SECRETS: &[&str] = &["dev-secret-change-me", "change-me-to-a-random-string"];

#[derive(Debug, Clone)]
pub struct Config {
    pub app_dir: PathBuf,
    pub database_file: PathBuf,
    pub jwt_secret: String,
    pub host: String,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let app_dir = match get("CAMP_APP_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => executable_dir()?,
        };
        let port = get("CAMP_PORT")
            .unwrap_or_else(|| "5000".into())
            .parse()
            .context("CAMP_PORT must be a port number")?;

        Ok(Self {
            app_dir,
            database_file: get("DATABASE_FILE")
                .unwrap_or_else(|| "sample_db.sqlite".into())
                .into(),
            jwt_secret: get("CAMP_JWT_SECRET").unwrap_or_else(|| "dev-secret-change-me".into()),
            host: get("CAMP_HOST").unwrap_or_else(|| "127.0.0.1".into()),
            port,
        })
    }

    /// `DATABASE_FILE` resolved against the application directory.
    pub fn database_path(&self) -> PathBuf {
        resolve(&self.app_dir, &self.database_file)
    }

    pub fn warn_if_insecure(&self) {
        if PLACEHOLDER_SECRETS.contains(&self.jwt_secret.as_str()) {
            warn!("CAMP_JWT_SECRET is unset or a placeholder; sessions can be forged");
        }
    }
}

/// Directory holding the running binary.
fn executable_dir() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("cannot locate the running executable")?;
    exe.parent()
        .map(Path::to_path_buf)
        .context("executable path has no parent directory")
}

fn resolve(base: &Path, file: &Path) -> PathBuf {
    if file.is_absolute() {
        file.to_path_buf()
    } else {
        base.join(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|k| vars.get(k).cloned())
    }

    #[test]
    fn database_file_is_relative_to_app_dir() {
        let cfg = config(&[("CAMP_APP_DIR", "/srv/camp"), ("DATABASE_FILE", "camp.sqlite")]).unwrap();
        assert_eq!(cfg.database_path(), PathBuf::from("/srv/camp/camp.sqlite"));
    }

    #[test]
    fn absolute_database_file_is_kept() {
        let cfg = config(&[("CAMP_APP_DIR", "/srv/camp"), ("DATABASE_FILE", "/var/lib/camp.db")]).unwrap();
        assert_eq!(cfg.database_path(), PathBuf::from("/var/lib/camp.db"));
    }

    #[test]
    fn defaults_apply() {
        let cfg = config(&[("CAMP_APP_DIR", "/srv/camp")]).unwrap();
        assert_eq!(cfg.database_path(), PathBuf::from("/srv/camp/sample_db.sqlite"));
        assert_eq!(cfg.port, 5000);
        assert_eq!(cfg.host, "127.0.0.1");
    }

    #[test]
    fn app_dir_defaults_to_executable_dir() {
        let cfg = config(&[]).unwrap();
        let exe = std::env::current_exe().unwrap();
        assert_eq!(cfg.app_dir, exe.parent().unwrap());
        assert_eq!(
            cfg.database_path(),
            exe.parent().unwrap().join("sample_db.sqlite")
        );
    }

    #[test]
    fn bad_port_is_an_error() {
        assert!(config(&[("CAMP_PORT", "http")]).is_err());
    }
}
