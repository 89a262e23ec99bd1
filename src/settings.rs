//! Runtime settings backed by a `.env` style key/value file.
//!
//! Values are resolved from the file first and the process environment
//! second. Updates made through the API are written back to the file and
//! take effect immediately: publishers and media clients read a fresh
//! [`Settings`] snapshot every time they run.

use crate::error::{Result, SakegramError};
use crate::store::write_atomic;
use indexmap::IndexMap;
use sakegram_graph::GraphCredentials;
use sakegram_media::CloudinaryCredentials;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

pub const ACCESS_TOKEN: &str = "ACCESS_TOKEN";
pub const INSTAGRAM_USER_ID: &str = "INSTAGRAM_USER_ID";
pub const BASE_URL: &str = "BASE_URL";
pub const PUBLIC_URL: &str = "PUBLIC_URL";
pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const REMOVE_BG_API_KEY: &str = "REMOVE_BG_API_KEY";
pub const CLOUDINARY_CLOUD_NAME: &str = "CLOUDINARY_CLOUD_NAME";
pub const CLOUDINARY_API_KEY: &str = "CLOUDINARY_API_KEY";
pub const CLOUDINARY_API_SECRET: &str = "CLOUDINARY_API_SECRET";
pub const APP_PASSWORD: &str = "APP_PASSWORD";

pub const KNOWN_KEYS: [&str; 10] = [
    ACCESS_TOKEN,
    INSTAGRAM_USER_ID,
    BASE_URL,
    PUBLIC_URL,
    OPENAI_API_KEY,
    REMOVE_BG_API_KEY,
    CLOUDINARY_CLOUD_NAME,
    CLOUDINARY_API_KEY,
    CLOUDINARY_API_SECRET,
    APP_PASSWORD,
];

/// Snapshot of every setting the service reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    pub access_token: Option<String>,
    pub instagram_user_id: Option<String>,
    pub base_url: Option<String>,
    pub public_url: Option<String>,
    pub openai_api_key: Option<String>,
    pub remove_bg_api_key: Option<String>,
    pub cloudinary_cloud_name: Option<String>,
    pub cloudinary_api_key: Option<String>,
    pub cloudinary_api_secret: Option<String>,
    pub app_password: Option<String>,
}

impl Settings {
    /// File values win over `lookup` (normally the process environment).
    pub fn resolve(
        file: &IndexMap<String, String>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let mut settings = Settings::default();
        for key in KNOWN_KEYS {
            let value = file
                .get(key)
                .cloned()
                .filter(|v| !v.is_empty())
                .or_else(|| lookup(key).filter(|v| !v.is_empty()));
            settings.set(key, value);
        }
        settings
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        let slot = match key {
            ACCESS_TOKEN => &self.access_token,
            INSTAGRAM_USER_ID => &self.instagram_user_id,
            BASE_URL => &self.base_url,
            PUBLIC_URL => &self.public_url,
            OPENAI_API_KEY => &self.openai_api_key,
            REMOVE_BG_API_KEY => &self.remove_bg_api_key,
            CLOUDINARY_CLOUD_NAME => &self.cloudinary_cloud_name,
            CLOUDINARY_API_KEY => &self.cloudinary_api_key,
            CLOUDINARY_API_SECRET => &self.cloudinary_api_secret,
            APP_PASSWORD => &self.app_password,
            _ => return None,
        };
        slot.as_deref()
    }

    /// Unknown keys are ignored. Empty strings clear the value.
    pub fn set(&mut self, key: &str, value: Option<String>) {
        let slot = match key {
            ACCESS_TOKEN => &mut self.access_token,
            INSTAGRAM_USER_ID => &mut self.instagram_user_id,
            BASE_URL => &mut self.base_url,
            PUBLIC_URL => &mut self.public_url,
            OPENAI_API_KEY => &mut self.openai_api_key,
            REMOVE_BG_API_KEY => &mut self.remove_bg_api_key,
            CLOUDINARY_CLOUD_NAME => &mut self.cloudinary_cloud_name,
            CLOUDINARY_API_KEY => &mut self.cloudinary_api_key,
            CLOUDINARY_API_SECRET => &mut self.cloudinary_api_secret,
            APP_PASSWORD => &mut self.app_password,
            _ => return,
        };
        *slot = value.filter(|v| !v.is_empty());
    }

    /// `PUBLIC_URL` if set, else `BASE_URL`.
    pub fn public_base_url(&self) -> Option<&str> {
        self.public_url.as_deref().or(self.base_url.as_deref())
    }

    pub fn graph_credentials(&self) -> GraphCredentials {
        GraphCredentials {
            access_token: self.access_token.clone(),
            instagram_user_id: self.instagram_user_id.clone(),
            public_base_url: self.public_base_url().map(String::from),
        }
    }

    pub fn cloudinary(&self) -> Option<CloudinaryCredentials> {
        CloudinaryCredentials::from_parts(
            self.cloudinary_cloud_name.as_deref(),
            self.cloudinary_api_key.as_deref(),
            self.cloudinary_api_secret.as_deref(),
        )
    }

    pub fn view(&self) -> SettingsView {
        let s = |v: &Option<String>| v.clone().unwrap_or_default();
        SettingsView {
            has_config: self.access_token.is_some(),
            access_token: s(&self.access_token),
            instagram_id: s(&self.instagram_user_id),
            public_url: s(&self.base_url),
            open_ai_key: s(&self.openai_api_key),
            remove_bg_key: s(&self.remove_bg_api_key),
        }
    }
}

/// Body of `GET /api/config`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SettingsView {
    pub has_config: bool,
    pub access_token: String,
    pub instagram_id: String,
    pub public_url: String,
    pub open_ai_key: String,
    pub remove_bg_key: String,
}

/// Body of `POST /api/config`. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SettingsUpdate {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub instagram_id: Option<String>,
    #[serde(default)]
    pub public_url: Option<String>,
    #[serde(default)]
    pub open_ai_key: Option<String>,
    #[serde(default)]
    pub remove_bg_key: Option<String>,
}

impl SettingsUpdate {
    /// `(settings key, new value)` for every provided field.
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        [
            (ACCESS_TOKEN, &self.access_token),
            (INSTAGRAM_USER_ID, &self.instagram_id),
            (BASE_URL, &self.public_url),
            (OPENAI_API_KEY, &self.open_ai_key),
            (REMOVE_BG_API_KEY, &self.remove_bg_key),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.as_ref().map(|v| (key, v.trim().to_string())))
        .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum EnvLine {
    Pair {
        key: String,
        value: String,
        /// Original text, written back as long as the value is unchanged.
        source: Option<String>,
    },
    /// Comments, blank lines and lines that do not parse.
    Raw(String),
}

/// A `KEY=VALUE` settings file.
///
/// Unquoted values are taken literally (everything after the first `=`,
/// trimmed). Quoted values go through the dotenv parser for escapes. Lines
/// neither can read are kept and written back verbatim, so saving never
/// drops something it did not understand.
#[derive(Debug, Clone, Default)]
pub struct EnvFile {
    lines: Vec<EnvLine>,
}

impl EnvFile {
    /// Missing file reads as empty.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .map_err(|e| SakegramError::Config(format!("{}: {}", path.display(), e)))?;
        Ok(Self::parse(&contents))
    }

    pub fn parse(contents: &str) -> Self {
        Self {
            lines: contents.lines().map(parse_line).collect(),
        }
    }

    /// Key/value pairs in file order; a repeated key keeps its last value.
    pub fn values(&self) -> IndexMap<String, String> {
        let mut map = IndexMap::new();
        for line in &self.lines {
            if let EnvLine::Pair { key, value, .. } = line {
                map.insert(key.clone(), value.clone());
            }
        }
        map
    }

    pub fn read(path: &Path) -> Result<IndexMap<String, String>> {
        Ok(Self::load(path)?.values())
    }

    /// Replace the last occurrence of `key`, or append it.
    pub fn set(&mut self, key: &str, value: &str) {
        let existing = self.lines.iter_mut().rev().find_map(|line| match line {
            EnvLine::Pair {
                key: k,
                value: v,
                source,
            } if k == key => Some((v, source)),
            _ => None,
        });
        match existing {
            Some((v, _)) if *v == value => {}
            Some((v, source)) => {
                *v = value.to_string();
                *source = None;
            }
            None => self.lines.push(EnvLine::Pair {
                key: key.to_string(),
                value: value.to_string(),
                source: None,
            }),
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            match line {
                EnvLine::Pair {
                    source: Some(text), ..
                } => out.push_str(text),
                EnvLine::Pair { key, value, .. } => {
                    out.push_str(key);
                    out.push('=');
                    out.push_str(&quote_value(value));
                }
                EnvLine::Raw(text) => out.push_str(text),
            }
            out.push('\n');
        }
        out
    }

    /// Atomic replace of `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        write_atomic(path, self.render().as_bytes())
    }
}

fn parse_line(line: &str) -> EnvLine {
    let raw = || EnvLine::Raw(line.to_string());
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return raw();
    }
    let Some((key, value)) = trimmed.split_once('=') else {
        return raw();
    };
    let key = key.trim();
    let key = key.strip_prefix("export ").map(str::trim).unwrap_or(key);
    if key.is_empty()
        || !key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
    {
        return raw();
    }

    let value = value.trim();
    if !(value.starts_with('"') || value.starts_with('\'')) {
        return EnvLine::Pair {
            key: key.to_string(),
            value: value.to_string(),
            source: Some(line.to_string()),
        };
    }

    match dotenv::from_read_iter(trimmed.as_bytes()).next() {
        Some(Ok((key, value))) => EnvLine::Pair {
            key,
            value,
            source: Some(line.to_string()),
        },
        _ => {
            tracing::warn!("Keeping unparseable settings line for {} as-is", key);
            raw()
        }
    }
}

/// Quote values that would not read back literally.
fn quote_value(value: &str) -> String {
    let plain = value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "-_.:/@+=%,~?&$".contains(c))
        && !value.starts_with(['"', '\'']);
    if plain {
        value.to_string()
    } else if !value.contains('\'') {
        format!("'{}'", value)
    } else {
        let escaped = value
            .replace('\\', "\\\\")
            .replace('"', "\\\"")
            .replace('$', "\\$");
        format!("\"{}\"", escaped)
    }
}

/// Shared, updatable settings.
pub struct SettingsStore {
    file_path: PathBuf,
    current: RwLock<Settings>,
}

impl SettingsStore {
    /// Resolve settings from `file_path` and the process environment.
    pub fn load(file_path: impl Into<PathBuf>) -> Result<Self> {
        let file_path = file_path.into();
        let file = EnvFile::read(&file_path)?;
        let settings = Settings::resolve(&file, |k| std::env::var(k).ok());
        Ok(Self::with_settings(file_path, settings))
    }

    pub fn with_settings(file_path: impl Into<PathBuf>, settings: Settings) -> Self {
        Self {
            file_path: file_path.into(),
            current: RwLock::new(settings),
        }
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    pub fn snapshot(&self) -> Settings {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Merge the update into the settings file (other keys are preserved)
    /// and into the live snapshot.
    pub fn update(&self, update: &SettingsUpdate) -> Result<Settings> {
        let entries = update.entries();
        let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());

        let mut file = EnvFile::load(&self.file_path)?;
        for (key, value) in &entries {
            file.set(key, value);
        }
        file.save(&self.file_path)?;

        let count = entries.len();
        for (key, value) in entries {
            current.set(key, Some(value));
        }
        tracing::info!(
            "Settings updated ({} keys) in {}",
            count,
            self.file_path.display()
        );
        Ok(current.clone())
    }
}
