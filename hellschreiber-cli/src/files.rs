use std::path::{
    Path,
    PathBuf,
};

use color_eyre::eyre::eyre;
use directories::ProjectDirs;
use hellschreiber::{
    FontSet,
    FontTable,
    HellConfig,
};
use serde::{
    Deserialize,
    Serialize,
};

use crate::{
    Error,
    args::FontArgs,
};

#[derive(Debug)]
pub struct AppFiles {
    project_dirs: ProjectDirs,
}

impl AppFiles {
    pub fn new() -> Result<Self, Error> {
        let project_dirs = ProjectDirs::from("", "hellschreiber", "hellschreiber-cli")
            .ok_or_else(|| eyre!("Could not determine project directories"))?;
        let this = Self { project_dirs };

        std::fs::create_dir_all(this.config_dir())?;
        std::fs::create_dir_all(this.project_dirs.data_local_dir())?;

        Ok(this)
    }

    fn config_dir(&self) -> &Path {
        self.project_dirs.config_dir()
    }

    /// Loads the settings from `path`, or from `config.toml` in the config
    /// directory. A missing default file is created with the default settings.
    pub fn settings(&self, path: Option<&Path>) -> Result<Settings, Error> {
        let settings = if let Some(path) = path {
            Settings::from_path(path)?
        }
        else {
            let path = self.config_dir().join("config.toml");
            if path.exists() {
                Settings::from_path(path)?
            }
            else {
                tracing::debug!(path = %path.display(), "Writing default settings to file");
                let settings = Settings::default();
                settings.to_path(path)?;
                settings
            }
        };

        settings.hell.validate()?;
        Ok(settings)
    }

    pub fn log_file(&self) -> PathBuf {
        self.project_dirs
            .data_local_dir()
            .join("hellschreiber-cli.log")
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub fonts: FontPaths,
    #[serde(flatten)]
    pub hell: HellConfig,
}

impl Settings {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, Error> {
        tracing::debug!(path = %path.as_ref().display(), "Loading settings from file");
        Ok(toml::from_str(&std::fs::read_to_string(path)?)?)
    }

    pub fn to_path(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Loads the font tables, normalized to the configured glyph width.
    /// Without a primary table only the space is known.
    pub fn font_set(&self, overrides: &FontArgs) -> Result<FontSet, Error> {
        let width = self.hell.modem.glyph_width;
        let primary_path = overrides.primary_font.as_ref().or(self.fonts.primary.as_ref());
        let secondary_path = overrides
            .secondary_font
            .as_ref()
            .or(self.fonts.secondary.as_ref());

        let primary = match primary_path {
            Some(path) => FontTable::from_path(path, Some(width))?,
            None => {
                tracing::info!("No primary font table configured, sending spaces only");
                FontTable::space_only(width)?
            }
        };

        let mut fonts = FontSet::new(width)?.with_primary(primary)?;
        if let Some(path) = secondary_path {
            fonts = fonts.with_secondary(FontTable::from_path(path, Some(width))?)?;
        }
        Ok(fonts)
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FontPaths {
    pub primary: Option<PathBuf>,
    pub secondary: Option<PathBuf>,
}
