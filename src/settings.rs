use log::debug;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Options of an editing session.
///
/// Fields:
/// - `read_plural_activities`: When set, import also reads the plural `activities` list of an
///   activity context. Off by default, in which case only `activity` is read.
/// - `export_dir`: Directory exported files are written to. `None` means the user's download
///   directory, or the current directory when there is none.
/// - `pretty`: Pretty-print exported JSON.
///
/// Example usage:
/// ```
/// use curriculum_schema::Settings;
///
/// let settings = Settings {
///     read_plural_activities: true,
///     ..Default::default()
/// };
/// assert!(settings.pretty);
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub read_plural_activities: bool,
    pub export_dir: Option<PathBuf>,
    pub pretty: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            read_plural_activities: false,
            export_dir: None,
            pretty: true,
        }
    }
}

#[cfg(feature = "use_env_settings")]
const READ_PLURAL_KEY: &str = "CURRICULUM_READ_PLURAL_ACTIVITIES";
#[cfg(feature = "use_env_settings")]
const EXPORT_DIR_KEY: &str = "CURRICULUM_EXPORT_DIR";
#[cfg(feature = "use_env_settings")]
const PRETTY_KEY: &str = "CURRICULUM_PRETTY_EXPORT";

impl Settings {
    /// Loads settings from environment variables.
    ///
    /// Only available with the `use_env_settings` feature. Variables that are not set keep
    /// their default value, but at least one of them must be present.
    ///
    /// Returns:
    /// - `Ok(Settings)`: Settings read from the environment.
    /// - `Err(String)`: The feature is disabled, no variable is set, or a flag is not a boolean.
    pub fn load_from_env() -> Result<Settings, String> {
        #[cfg(not(feature = "use_env_settings"))]
        {
            return Err("Feature not enabled".to_string());
        }

        #[cfg(feature = "use_env_settings")]
        {
            let mut settings = Settings::default();
            let mut found = false;
            if let Ok(value) = std::env::var(READ_PLURAL_KEY) {
                settings.read_plural_activities = parse_flag(READ_PLURAL_KEY, &value)?;
                found = true;
            }
            if let Ok(dir) = std::env::var(EXPORT_DIR_KEY) {
                if !dir.trim().is_empty() {
                    settings.export_dir = Some(PathBuf::from(dir));
                }
                found = true;
            }
            if let Ok(value) = std::env::var(PRETTY_KEY) {
                settings.pretty = parse_flag(PRETTY_KEY, &value)?;
                found = true;
            }
            if found {
                debug!("Settings loaded from environment: {:?}", settings);
                Ok(settings)
            } else {
                Err("No settings found in environment".to_string())
            }
        }
    }

    /// Loads settings from the environment when possible, falling back to the defaults.
    pub fn load() -> Settings {
        match Self::load_from_env() {
            Ok(settings) => settings,
            Err(e) => {
                debug!("Using default settings ({})", e);
                Settings::default()
            }
        }
    }

    /// Directory exported files are written to.
    pub fn export_directory(&self) -> PathBuf {
        match &self.export_dir {
            Some(dir) => dir.clone(),
            None => dirs::download_dir()
                .or_else(|| std::env::current_dir().ok())
                .unwrap_or_else(|| PathBuf::from(".")),
        }
    }
}

#[cfg(feature = "use_env_settings")]
fn parse_flag(key: &str, value: &str) -> Result<bool, String> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(format!("{} must be a boolean, found {:?}", key, other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_defaults() {
        let settings = Settings::default();
        assert!(!settings.read_plural_activities);
        assert!(settings.pretty);
        assert_eq!(settings.export_dir, None);
    }

    #[test]
    fn test_explicit_export_directory() {
        let settings = Settings {
            export_dir: Some(PathBuf::from("/tmp/exports")),
            ..Default::default()
        };
        assert_eq!(settings.export_directory(), PathBuf::from("/tmp/exports"));
    }

    #[test]
    #[cfg(not(feature = "use_env_settings"))]
    fn test_env_loading_disabled_without_feature() {
        assert!(Settings::load_from_env().is_err());
        assert_eq!(Settings::load(), Settings::default());
    }

    #[test]
    #[cfg(feature = "use_env_settings")]
    fn test_load_settings_from_env() {
        use std::collections::HashMap;
        use std::env;

        let mut map: HashMap<String, String> = HashMap::new();
        fn set_new_key(map: &mut HashMap<String, String>, key: &str, value: &str) {
            if let Ok(value) = env::var(key) {
                map.insert(key.to_string(), value);
            }
            env::set_var(key, value);
        }

        fn restore_key(map: &HashMap<String, String>, key: &str) {
            if let Some(value) = map.get(key) {
                env::set_var(key, value);
            } else {
                env::remove_var(key);
            }
        }

        set_new_key(&mut map, READ_PLURAL_KEY, "true");
        set_new_key(&mut map, EXPORT_DIR_KEY, "/tmp/exports");
        set_new_key(&mut map, PRETTY_KEY, "0");

        // All variables set
        let all = Settings::load_from_env();

        // Invalid flag
        env::set_var(PRETTY_KEY, "sometimes");
        let invalid = Settings::load_from_env();

        // No variables set
        env::remove_var(READ_PLURAL_KEY);
        env::remove_var(EXPORT_DIR_KEY);
        env::remove_var(PRETTY_KEY);
        let none = Settings::load_from_env();

        restore_key(&map, READ_PLURAL_KEY);
        restore_key(&map, EXPORT_DIR_KEY);
        restore_key(&map, PRETTY_KEY);

        let all = all.unwrap();
        assert!(all.read_plural_activities);
        assert!(!all.pretty);
        assert_eq!(all.export_dir, Some(PathBuf::from("/tmp/exports")));
        assert!(invalid.is_err());
        assert!(none.is_err());
    }
}
