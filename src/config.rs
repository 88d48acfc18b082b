use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::annotation::{DEFAULT_FONT_SIZE, DEFAULT_LINE_WIDTH, PALETTE};

pub const DEFAULT_API_URL: &str = "http://localhost:5001/api";
pub const DEFAULT_UPLOADS_URL: &str = "http://localhost:3000/uploads";

/// Desktop client for annotating and viewing site survey photos.
#[derive(Debug, Parser)]
#[command(name = "sitemark", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Base URL of the record store API.
    #[arg(long, env = "SITEMARK_API_URL", default_value = DEFAULT_API_URL, global = true)]
    pub api_url: String,

    /// Base URL photo files are served from.
    #[arg(long, env = "SITEMARK_UPLOADS_URL", default_value = DEFAULT_UPLOADS_URL, global = true)]
    pub uploads_url: String,

    /// Session cookie value attached to every request.
    #[arg(long, env = "SITEMARK_SESSION", global = true, hide_env_values = true)]
    pub session: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Open the annotation editor for a photo.
    Edit { photo_id: String },
    /// Show a photo with its saved annotations.
    View { photo_id: String },
    /// Show a shared project by its public token.
    Share { token: String },
}

#[derive(Clone, Debug)]
pub struct StoreConfig {
    pub api_url: String,
    pub uploads_url: String,
    pub session: Option<String>,
}

impl Cli {
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            api_url: self.api_url.trim_end_matches('/').to_owned(),
            uploads_url: self.uploads_url.trim_end_matches('/').to_owned(),
            session: self.session.clone().filter(|value| !value.is_empty()),
        }
    }
}

/// Tool styling remembered between runs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSettings {
    pub last_color: String,
    pub last_font_size: f64,
    pub last_line_width: f64,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            last_color: PALETTE[0].to_owned(),
            last_font_size: DEFAULT_FONT_SIZE,
            last_line_width: DEFAULT_LINE_WIDTH,
        }
    }
}

impl UserSettings {
    fn file_path() -> Option<PathBuf> {
        let dirs = ProjectDirs::from("com", "sitemark", "sitemark")?;
        let config_dir = dirs.config_dir();
        std::fs::create_dir_all(config_dir).ok()?;
        Some(config_dir.join("settings.json"))
    }

    pub fn load() -> Result<Self> {
        let path = Self::file_path().context("cannot resolve settings path")?;
        Self::load_from(&path)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::file_path().context("cannot resolve settings path")?;
        self.save_to(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)
            .with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Cli, Command, UserSettings, DEFAULT_API_URL};

    #[test]
    fn settings_round_trip_through_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("settings.json");
        let settings = UserSettings {
            last_color: "#00FFFF".to_owned(),
            last_font_size: 48.0,
            last_line_width: 12.0,
        };
        settings.save_to(&path).expect("save");
        assert_eq!(UserSettings::load_from(&path).expect("load"), settings);
    }

    #[test]
    fn partial_settings_fill_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r##"{"last_color":"#FF0000"}"##).expect("write");
        let loaded = UserSettings::load_from(&path).expect("load");
        assert_eq!(loaded.last_color, "#FF0000");
        assert_eq!(loaded.last_font_size, 24.0);
        assert_eq!(loaded.last_line_width, 5.0);
    }

    #[test]
    fn missing_settings_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(UserSettings::load_from(&dir.path().join("nope.json")).is_err());
    }

    #[test]
    fn cli_parses_subcommands_and_trims_urls() {
        let cli = Cli::try_parse_from([
            "sitemark",
            "edit",
            "42",
            "--api-url",
            "https://survey.example/api/",
        ])
        .expect("parse");
        assert_eq!(
            cli.command,
            Command::Edit {
                photo_id: "42".to_owned()
            }
        );
        assert_eq!(cli.store_config().api_url, "https://survey.example/api");

        let cli = Cli::try_parse_from(["sitemark", "share", "abc123"]).expect("parse");
        assert_eq!(
            cli.command,
            Command::Share {
                token: "abc123".to_owned()
            }
        );
        if std::env::var_os("SITEMARK_API_URL").is_none() {
            assert_eq!(cli.api_url, DEFAULT_API_URL);
        }
    }
}
