use std::{
    fs::{create_dir_all, File},
    io::{BufReader, Write},
    path::{Path, PathBuf},
};

use home::home_dir;
use serde::{Deserialize, Serialize};
use text2beep::AudioParams;

use crate::AppError;

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    amplitude: Option<f32>,
}

impl Config {
    // folder placed in $HOME directory
    const FOLDER: &'static str = ".text2beep";

    pub fn amplitude(&self) -> Option<f32> {
        self.amplitude
    }

    /// Audio parameters with the local overrides applied
    pub fn audio_params(&self) -> AudioParams {
        let params = AudioParams::default();
        match self.amplitude {
            Some(amplitude) if amplitude.is_finite() && amplitude > 0.0 && amplitude <= 1.0 => {
                params.with_amplitude(amplitude)
            }
            Some(amplitude) => {
                log::warn!("Ignoring configured amplitude {amplitude}, expected a value in (0, 1]");
                params
            }
            None => params,
        }
    }

    fn get_base_path() -> Result<PathBuf, AppError> {
        let home = home_dir()
            .ok_or_else(|| AppError::ConfigError("Could not find home directory".to_string()))?;
        Ok(home.join(Self::FOLDER))
    }

    /// Creates config if it does not exist
    pub fn read_config() -> Result<Self, AppError> {
        let base_path = Self::get_base_path()?;
        if !base_path.exists() {
            create_dir_all(&base_path)?;
        }
        Self::read_from(&base_path.join("config.json"))
    }

    fn read_from(config_path: &Path) -> Result<Self, AppError> {
        if !config_path.exists() {
            // create empty config
            Self::default().save_to(config_path)?;
        }
        let file = File::open(config_path)?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader).map_err(|err| {
            AppError::ConfigError(format!("Could not read local configuration {err}"))
        })
    }

    fn save_to(&self, config_path: &Path) -> Result<(), AppError> {
        let json = serde_json::to_string_pretty(self).map_err(|err| {
            AppError::ConfigError(format!("Could not save local configuration {err}"))
        })?;
        let mut file = File::create(config_path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn temp_config_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("text2beep-{name}-{}", std::process::id()));
        create_dir_all(&dir).unwrap();
        dir.join("config.json")
    }

    #[test]
    fn test_missing_config_created_empty() {
        let path = temp_config_path("missing");
        let _ = fs::remove_file(&path);
        let config = Config::read_from(&path).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(fs::read_to_string(&path).unwrap(), "{}");
    }

    #[test]
    fn test_amplitude_override() {
        let path = temp_config_path("amplitude");
        fs::write(&path, r#"{"amplitude": 0.2}"#).unwrap();
        let config = Config::read_from(&path).unwrap();
        assert_eq!(config.amplitude(), Some(0.2));
        assert_eq!(config.audio_params().amplitude(), 0.2);
    }

    #[test]
    fn test_invalid_amplitude_ignored() {
        let config = Config {
            amplitude: Some(3.0),
        };
        assert_eq!(config.audio_params(), AudioParams::default());
    }

    #[test]
    fn test_unreadable_config() {
        let path = temp_config_path("broken");
        fs::write(&path, "not json").unwrap();
        assert!(Config::read_from(&path).is_err());
    }
}
