//! Clap-free settings for the update, plan and apply pipelines.

use camino::Utf8PathBuf;

/// Where downloaded schemas are cached.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CacheSettings {
    /// The per-user cache directory, if one can be found.
    #[default]
    Default,
    Dir(Utf8PathBuf),
    Disabled,
}

/// Settings for `run_update`.
#[derive(Debug, Clone)]
pub struct UpdateSettings {
    pub config_dir: Utf8PathBuf,
    pub cache: CacheSettings,
}

impl Default for UpdateSettings {
    fn default() -> Self {
        Self {
            config_dir: Utf8PathBuf::from("."),
            cache: CacheSettings::default(),
        }
    }
}

/// Settings for `run_plan` and `run_apply`.
#[derive(Debug, Clone)]
pub struct ApplySettings {
    pub config_dir: Utf8PathBuf,
    pub cache: CacheSettings,

    /// Record every change as skipped without calling the repository.
    pub dry_run: bool,
}

impl Default for ApplySettings {
    fn default() -> Self {
        Self {
            config_dir: Utf8PathBuf::from("."),
            cache: CacheSettings::default(),
            dry_run: false,
        }
    }
}

/// How to reach the repository.
#[derive(Debug, Clone, Default)]
pub struct RemoteSettings {
    pub endpoint: String,
    pub token: Option<String>,
}
