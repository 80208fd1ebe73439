use std::path::Path;

use config::Config;
use config::ConfigError as ExternalConfigError;
use config::File;
use config::FileFormat;
use directories::ProjectDirs;
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration build/deserialize error")]
    Config(#[from] ExternalConfigError),
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    pub debug: bool,
    /// Extra names treated as always defined, on top of the built-ins.
    pub globals: Vec<String>,
}

impl Settings {
    /// Load settings for a project rooted at `project_root`.
    ///
    /// Sources, from lowest to highest priority: the user's `tplvars.toml`,
    /// then `.tplvars.toml` and `tplvars.toml` in the project root.
    pub fn new(project_root: &Path) -> Result<Self, ConfigError> {
        let user_config_file = ProjectDirs::from("com.github", "tplvars", "tplvars")
            .map(|proj_dirs| proj_dirs.config_dir().join("tplvars.toml"));

        Self::load_from_paths(project_root, user_config_file.as_deref())
    }

    fn load_from_paths(
        project_root: &Path,
        user_config_path: Option<&Path>,
    ) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        if let Some(path) = user_config_path {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(false));
        }

        for name in [".tplvars.toml", "tplvars.toml"] {
            builder = builder.add_source(
                File::from(project_root.join(name))
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        let settings: Settings = builder.build()?.try_deserialize()?;
        tracing::debug!(
            root = %project_root.display(),
            debug = settings.debug,
            globals = settings.globals.len(),
            "loaded settings"
        );
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    fn debug(debug: bool) -> Settings {
        Settings {
            debug,
            ..Settings::default()
        }
    }

    mod defaults {
        use super::*;

        #[test]
        fn test_load_no_files() {
            let dir = tempdir().unwrap();
            let settings = Settings::load_from_paths(dir.path(), None).unwrap();
            assert_eq!(settings, Settings::default());
            assert!(settings.globals.is_empty());
        }
    }

    mod project_files {
        use super::*;

        #[test]
        fn test_load_tplvars_toml_only() {
            let dir = tempdir().unwrap();
            fs::write(dir.path().join("tplvars.toml"), "debug = true").unwrap();
            let settings = Settings::load_from_paths(dir.path(), None).unwrap();
            assert_eq!(settings, debug(true));
        }

        #[test]
        fn test_load_dot_tplvars_toml_only() {
            let dir = tempdir().unwrap();
            fs::write(dir.path().join(".tplvars.toml"), "debug = true").unwrap();
            let settings = Settings::load_from_paths(dir.path(), None).unwrap();
            assert_eq!(settings, debug(true));
        }

        #[test]
        fn test_load_globals() {
            let dir = tempdir().unwrap();
            fs::write(
                dir.path().join("tplvars.toml"),
                "globals = [\"site\", \"request\"]\n",
            )
            .unwrap();
            let settings = Settings::load_from_paths(dir.path(), None).unwrap();
            assert_eq!(settings.globals, ["site", "request"]);
            assert!(!settings.debug);
        }
    }

    mod priority {
        use super::*;

        #[test]
        fn test_tplvars_overrides_dot_tplvars() {
            let dir = tempdir().unwrap();
            fs::write(dir.path().join(".tplvars.toml"), "debug = false").unwrap();
            fs::write(dir.path().join("tplvars.toml"), "debug = true").unwrap();
            let settings = Settings::load_from_paths(dir.path(), None).unwrap();
            assert_eq!(settings, debug(true));
        }

        #[test]
        fn test_project_overrides_user() {
            let user_dir = tempdir().unwrap();
            let project_dir = tempdir().unwrap();
            let user_conf_path = user_dir.path().join("tplvars.toml");
            fs::write(&user_conf_path, "debug = true").unwrap();
            fs::write(project_dir.path().join(".tplvars.toml"), "debug = false").unwrap();

            let settings =
                Settings::load_from_paths(project_dir.path(), Some(&user_conf_path)).unwrap();
            assert_eq!(settings, debug(false));
        }

        #[test]
        fn test_fields_merge_across_files() {
            let user_dir = tempdir().unwrap();
            let project_dir = tempdir().unwrap();
            let user_conf_path = user_dir.path().join("tplvars.toml");
            fs::write(&user_conf_path, "globals = [\"site\"]").unwrap();
            fs::write(project_dir.path().join("tplvars.toml"), "debug = true").unwrap();

            let settings =
                Settings::load_from_paths(project_dir.path(), Some(&user_conf_path)).unwrap();
            assert!(settings.debug);
            assert_eq!(settings.globals, ["site"]);
        }
    }

    mod user_config {
        use super::*;

        #[test]
        fn test_load_user_config_only() {
            let user_dir = tempdir().unwrap();
            let project_dir = tempdir().unwrap();
            let user_conf_path = user_dir.path().join("tplvars.toml");
            fs::write(&user_conf_path, "debug = true").unwrap();

            let settings =
                Settings::load_from_paths(project_dir.path(), Some(&user_conf_path)).unwrap();
            assert_eq!(settings, debug(true));
        }

        #[test]
        fn test_missing_user_config_file() {
            let user_dir = tempdir().unwrap();
            let project_dir = tempdir().unwrap();
            let user_conf_path = user_dir.path().join("tplvars.toml");
            fs::write(project_dir.path().join("tplvars.toml"), "debug = true").unwrap();

            let settings =
                Settings::load_from_paths(project_dir.path(), Some(&user_conf_path)).unwrap();
            assert_eq!(settings, debug(true));
        }
    }

    mod errors {
        use super::*;

        #[test]
        fn test_invalid_toml_content() {
            let dir = tempdir().unwrap();
            fs::write(dir.path().join("tplvars.toml"), "debug = not_a_boolean").unwrap();
            let result = Settings::load_from_paths(dir.path(), None);
            assert!(matches!(result.unwrap_err(), ConfigError::Config(_)));
        }
    }
}
