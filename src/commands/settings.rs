use crate::adapters::parse_backend;
use crate::cli::ConfigCommands;
use crate::commands::output::print_one;
use crate::error::{LitError, Result};
use crate::models::Settings;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const APP_DIR: &str = "litfinder";
const SETTINGS_FILE: &str = "settings.json";

/// Default settings location: `<config dir>/litfinder/settings.json`
pub fn default_settings_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| LitError::Config("could not find a config directory".to_string()))?;
    Ok(config_dir.join(APP_DIR).join(SETTINGS_FILE))
}

/// Resolve the settings path from an explicit override or the default
pub fn settings_path(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => default_settings_path(),
    }
}

/// Directory for rolling log files
pub fn log_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join(APP_DIR).join("logs"))
}

/// Read settings from `path`; a missing file means defaults
pub fn read_settings(path: &Path) -> Result<Settings> {
    if !path.exists() {
        debug!("No settings file at {}, using defaults", path.display());
        return Ok(Settings::default());
    }

    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| {
        LitError::Config(format!("failed to parse {}: {}", path.display(), e))
    })
}

/// Write settings as pretty JSON, creating the directory
pub fn save_settings(path: &Path, settings: &Settings) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(settings)?;
    fs::write(path, content)?;
    info!("Saved settings to {}", path.display());
    Ok(())
}

/// Overlay `LITFINDER_*` environment variables
pub fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(backend) = get("LITFINDER_BACKEND") {
        settings.backend = parse_backend(&backend)?;
    }
    if let Some(mailto) = get("LITFINDER_MAILTO") {
        settings.mailto = Some(mailto.trim().to_string());
    }
    if let Some(model) = get("LITFINDER_GEMINI_MODEL") {
        settings.gemini_model = model.trim().to_string();
    }
    if let Some(model) = get("LITFINDER_OLLAMA_MODEL") {
        settings.ollama_model = model.trim().to_string();
    }
    Ok(())
}

/// Defaults, then the settings file, then the environment
pub fn load_settings(explicit: Option<&Path>) -> Result<Settings> {
    let path = settings_path(explicit)?;
    let mut settings = match read_settings(&path) {
        Ok(s) => s,
        Err(e) if explicit.is_none() => {
            // A broken default file shouldn't make the tool unusable
            warn!("Ignoring settings file: {}", e);
            Settings::default()
        }
        Err(e) => return Err(e),
    };
    apply_env(&mut settings, |name| std::env::var(name).ok())?;
    Ok(settings)
}

/// `litfinder config …`
pub fn run_config(command: &ConfigCommands, explicit: Option<&Path>, settings: &Settings, json: bool) -> Result<()> {
    let path = settings_path(explicit)?;

    match command {
        ConfigCommands::Path => {
            print_one(json, path.display().to_string(), |p| p.clone())?;
        }
        ConfigCommands::Show => {
            let mut shown = settings.clone();
            // Never echo a secret
            if shown.gemini_api_key.is_some() {
                shown.gemini_api_key = Some("********".to_string());
            }
            print_one(json, shown, |s| {
                serde_json::to_string_pretty(s).unwrap_or_default()
            })?;
        }
        ConfigCommands::Init { force } => {
            if path.exists() && !force {
                return Err(LitError::Config(format!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                )));
            }
            save_settings(&path, &Settings::default())?;
            print_one(json, path.display().to_string(), |p| format!("wrote {}", p))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Backend;
    use std::collections::HashMap;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = read_settings(&dir.path().join("nope.json")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_save_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let settings = Settings {
            backend: Backend::Claude,
            mailto: Some("me@example.org".to_string()),
            ..Settings::default()
        };
        save_settings(&path, &settings).unwrap();
        assert_eq!(read_settings(&path).unwrap(), settings);
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();

        let err = read_settings(&path).unwrap_err();
        assert!(matches!(err, LitError::Config(_)));
        assert!(load_settings(Some(&path)).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("LITFINDER_BACKEND", "ollama"),
            ("LITFINDER_MAILTO", " me@example.org "),
            ("LITFINDER_GEMINI_MODEL", ""),
        ]
        .into_iter()
        .collect();

        let mut settings = Settings::default();
        apply_env(&mut settings, |name| env.get(name).map(|v| v.to_string())).unwrap();

        assert_eq!(settings.backend, Backend::Ollama);
        assert_eq!(settings.mailto.as_deref(), Some("me@example.org"));
        assert_eq!(settings.gemini_model, Settings::default().gemini_model);
    }

    #[test]
    fn test_bad_backend_env() {
        let mut settings = Settings::default();
        let result = apply_env(&mut settings, |name| {
            (name == "LITFINDER_BACKEND").then(|| "gpt".to_string())
        });
        assert!(matches!(result, Err(LitError::Config(_))));
    }
}
