use std::collections::{BTreeMap, HashMap, HashSet};
use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::SmartError;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_PROFILE: &str = "default";

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Profile used when `--profile` is not given.
    pub default_profile: Option<String>,
    #[serde(default)]
    pub profiles: BTreeMap<String, ProfileConfig>,
    #[serde(default)]
    pub prompt: PromptConfig,
    #[serde(default)]
    pub shell: ShellConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub preference: PreferenceConfig,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct ProfileConfig {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    /// Another profile that fills in whatever this one leaves unset.
    pub base: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PromptConfig {
    /// Per-mode template overrides, keyed by subcommand name.
    #[serde(default)]
    pub templates: HashMap<String, String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ShellConfig {
    /// Shell executable path. If not set, `$SHELL` is used.
    pub path: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct StorageConfig {
    pub transcript: Option<PathBuf>,
    pub documents_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PreferenceConfig {
    pub language: Option<String>,
}

/// A profile with its base chain and fallbacks applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub name: String,
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

#[derive(Debug)]
pub struct SystemInfo {
    pub os: String,
    pub arch: String,
    pub shell: String,
    pub lang: String,
    pub user: String,
    pub cwd: String,
}

impl SystemInfo {
    pub fn collect(preference_lang: Option<&str>) -> Self {
        Self {
            os: Self::detect_os(),
            arch: env::consts::ARCH.to_string(),
            shell: Self::detect_shell(),
            lang: Self::detect_lang(preference_lang),
            user: env::var("USER")
                .or_else(|_| env::var("USERNAME"))
                .unwrap_or_else(|_| "unknown".to_string()),
            cwd: env::current_dir()
                .map(|dir| dir.display().to_string())
                .unwrap_or_else(|_| ".".to_string()),
        }
    }

    fn detect_os() -> String {
        if cfg!(target_os = "windows") {
            "Windows".to_string()
        } else if cfg!(target_os = "macos") {
            "macOS".to_string()
        } else if cfg!(target_os = "linux") {
            "Linux".to_string()
        } else {
            env::consts::OS.to_string()
        }
    }

    fn detect_shell() -> String {
        if let Ok(shell_path) = env::var("SHELL") {
            if let Some(name) = shell_path.rsplit('/').next() {
                return name.to_string();
            }
        }
        "unknown".to_string()
    }

    fn detect_lang(preference: Option<&str>) -> String {
        if let Some(lang) = preference {
            return lang.to_string();
        }
        // "zh_CN.UTF-8" -> "zh-CN"
        if let Ok(lang) = env::var("LANG") {
            let lang_code = lang.split('.').next().unwrap_or(&lang);
            return lang_code.replace('_', "-");
        }
        "en-US".to_string()
    }

    pub fn to_vars(&self) -> HashMap<&str, &str> {
        let mut vars = HashMap::new();
        vars.insert("os", self.os.as_str());
        vars.insert("arch", self.arch.as_str());
        vars.insert("shell", self.shell.as_str());
        vars.insert("lang", self.lang.as_str());
        vars.insert("user", self.user.as_str());
        vars.insert("cwd", self.cwd.as_str());
        vars
    }
}

/// `~/.smart`, home of the transcript, HTML export and knowledge bases.
pub fn state_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".smart")
}

impl Config {
    pub fn load() -> Result<Self> {
        if let Ok(path) = env::var("SMART_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }

        let path = state_dir().join("config.toml");
        if path.exists() {
            return Self::load_from_file(&path);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let path = config_dir.join("smart").join("config.toml");
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }

        Ok(Self::default())
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Name of the profile to start with: explicit choice, then the
    /// configured default, then the implicit `default` profile.
    pub fn startup_profile<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        requested
            .or(self.default_profile.as_deref())
            .unwrap_or(DEFAULT_PROFILE)
    }

    pub fn resolve_profile(&self, name: &str) -> Result<Profile, SmartError> {
        self.resolve_profile_with(name, |key| env::var(key).ok())
    }

    /// Walks `name` and its `base` chain, each profile applied once; fields
    /// closer to `name` win. Gaps are filled from `lookup_env`, then defaults.
    pub fn resolve_profile_with(
        &self,
        name: &str,
        lookup_env: impl Fn(&str) -> Option<String>,
    ) -> Result<Profile, SmartError> {
        let mut api_key = None;
        let mut model = None;
        let mut base_url = None;
        let mut visited = HashSet::new();
        let mut next = Some(name.to_string());

        while let Some(current) = next.take() {
            if !visited.insert(current.clone()) {
                tracing::debug!(profile = %current, "profile chain revisits a profile, stopping");
                break;
            }
            let profile = match self.profiles.get(&current) {
                Some(profile) => profile,
                None if current == DEFAULT_PROFILE => break,
                None => return Err(SmartError::ProfileNotFound(current)),
            };
            api_key = api_key.or_else(|| profile.api_key.clone());
            model = model.or_else(|| profile.model.clone());
            base_url = base_url.or_else(|| profile.base_url.clone());
            next = profile.base.clone();
        }

        Ok(Profile {
            name: name.to_string(),
            api_key: api_key.or_else(|| lookup_env("OPENAI_API_KEY")),
            model: model
                .or_else(|| lookup_env("OPENAI_MODEL"))
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: base_url
                .or_else(|| lookup_env("OPENAI_BASE_URL"))
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        })
    }
}

pub fn render_prompt(template: &str, vars: &HashMap<&str, &str>) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        let placeholder = format!("{{{}}}", key);
        result = result.replace(&placeholder, value);
    }
    result
}
