/// ユーザー設定モジュール
///
/// 実行時にユーザーディレクトリから読み込まれるアップロード制約の上書き設定を管理します。
/// Windows: C:\Users\<User>\AppData\Roaming\upsim\config.toml
/// macOS:   /Users/<User>/Library/Application Support/upsim/config.toml
/// Linux:   /home/<user>/.config/upsim/config.toml
///
/// 初回起動時にデフォルトテンプレートから自動的にconfig.tomlを作成します。
use crate::config::app::{UploadConfig, validate_upload};
use crate::config::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// アップロード制約の上書き値
///
/// 未指定のフィールドはビルド時設定の値がそのまま使われます。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UploadOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_files: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_file_size: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_types: Option<Vec<String>>,
}

/// ユーザー設定
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(default)]
    pub upload: UploadOverrides,
}

impl UserConfig {
    /// ユーザー設定ファイルのパスを取得
    ///
    /// # Errors
    /// 設定ディレクトリが取得できない場合に ConfigError::DirectoryNotFound を返します。
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .ok_or_else(|| ConfigError::directory_not_found("Failed to get user config directory"))
            .map(|config_dir| config_dir.join("upsim").join("config.toml"))
    }

    /// 既定の場所からユーザー設定を読み込む
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path()?)
    }

    /// 指定パスからユーザー設定を読み込む
    ///
    /// ファイルが存在しない場合はデフォルトテンプレートから作成します。
    pub fn load_from(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            Self::create_default_config(config_path)?;
        }

        let content = fs::read_to_string(config_path).map_err(|e| {
            ConfigError::file_system(
                format!("Failed to read config file: {}", config_path.display()),
                e,
            )
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| {
            ConfigError::parse_error(
                format!("Failed to parse config file ({})", config_path.display()),
                e,
            )
        })?;

        Ok(config)
    }

    /// デフォルト設定ファイルを作成
    fn create_default_config(config_path: &Path) -> Result<(), ConfigError> {
        ensure_parent_dir(config_path)?;
        fs::write(config_path, Self::default_toml_content()).map_err(|e| {
            ConfigError::file_system(
                format!(
                    "Failed to create default config file: {}",
                    config_path.display()
                ),
                e,
            )
        })
    }

    fn default_toml_content() -> &'static str {
        r#"# upsim - User Configuration
# Values set here override the built-in upload constraints.
# Use 'upsim config set <key> <value>' to change them.

[upload]
# max_files = 10
# max_file_size = 10485760
# allowed_types = ["image/png", "image/jpeg"]
"#
    }

    /// 指定パスへ保存する
    pub fn save_to(&self, config_path: &Path) -> Result<(), ConfigError> {
        ensure_parent_dir(config_path)?;

        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::serialize_error("Failed to serialize config", e))?;

        fs::write(config_path, content).map_err(|e| {
            ConfigError::file_system(
                format!("Failed to write config file: {}", config_path.display()),
                e,
            )
        })
    }

    /// 上書き値をビルド時設定にマージし、結果を検証して返す
    pub fn apply_to(&self, base: &UploadConfig) -> Result<UploadConfig, ConfigError> {
        let merged = UploadConfig {
            max_files: self.upload.max_files.unwrap_or(base.max_files),
            max_file_size: self.upload.max_file_size.unwrap_or(base.max_file_size),
            allowed_types: self
                .upload
                .allowed_types
                .clone()
                .unwrap_or_else(|| base.allowed_types.clone()),
        };
        validate_upload(&merged)?;
        Ok(merged)
    }

    /// CLI 形式のキーで上書き値を設定
    ///
    /// `allowed-types` はカンマ区切り。空文字列を与えると制限なしになります。
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "max-files" => {
                self.upload.max_files = Some(parse_number(key, value)?);
            }
            "max-file-size" => {
                self.upload.max_file_size = Some(parse_number(key, value)?);
            }
            "allowed-types" => {
                let types = value
                    .split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect();
                self.upload.allowed_types = Some(types);
            }
            _ => {
                return Err(ConfigError::UnknownKey {
                    key: key.to_string(),
                });
            }
        }
        Ok(())
    }

    /// 上書き値をすべて削除
    pub fn reset(&mut self) {
        self.upload = UploadOverrides::default();
    }

    pub fn has_overrides(&self) -> bool {
        self.upload != UploadOverrides::default()
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| {
        ConfigError::validation_error(format!(
            "Invalid value '{}' for {}: expected a non-negative integer",
            value, key
        ))
    })
}

fn ensure_parent_dir(config_path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            ConfigError::file_system(
                format!("Failed to create config directory: {}", parent.display()),
                e,
            )
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn base_upload() -> UploadConfig {
        UploadConfig {
            max_files: 10,
            max_file_size: 1000,
            allowed_types: vec!["image/png".to_string()],
        }
    }

    #[test]
    fn test_load_creates_default_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("nested").join("config.toml");

        let config = UserConfig::load_from(&path).expect("default config should load");

        assert!(path.exists());
        assert!(!config.has_overrides());
    }

    #[test]
    fn test_save_and_reload() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("config.toml");

        let mut config = UserConfig::default();
        config.set("max-files", "3").expect("valid key");
        config
            .set("allowed-types", "image/png, image/gif")
            .expect("valid key");
        config.save_to(&path).expect("Failed to save config");

        let reloaded = UserConfig::load_from(&path).expect("Failed to reload config");
        assert_eq!(reloaded, config);
        assert_eq!(reloaded.upload.max_files, Some(3));
        assert_eq!(
            reloaded.upload.allowed_types,
            Some(vec!["image/png".to_string(), "image/gif".to_string()])
        );
    }

    #[test]
    fn test_apply_to_merges_shallowly() {
        let mut config = UserConfig::default();
        config.set("max-file-size", "2048").expect("valid key");

        let merged = config.apply_to(&base_upload()).expect("merge should succeed");
        assert_eq!(merged.max_files, 10);
        assert_eq!(merged.max_file_size, 2048);
        assert_eq!(merged.allowed_types, vec!["image/png".to_string()]);
    }

    #[test]
    fn test_empty_allowed_types_lifts_restriction() {
        let mut config = UserConfig::default();
        config.set("allowed-types", "").expect("valid key");

        let merged = config.apply_to(&base_upload()).expect("merge should succeed");
        assert!(merged.allowed_types.is_empty());
        assert!(merged.allows_type("application/zip"));
    }

    #[test]
    fn test_apply_to_rejects_zero_max_files() {
        let mut config = UserConfig::default();
        config.set("max-files", "0").expect("valid key");
        assert!(config.apply_to(&base_upload()).is_err());
    }

    #[test]
    fn test_set_unknown_key() {
        let mut config = UserConfig::default();
        let err = config.set("colour", "blue").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownKey { .. }));
    }

    #[test]
    fn test_set_invalid_number() {
        let mut config = UserConfig::default();
        assert!(config.set("max-files", "many").is_err());
        assert!(config.set("max-file-size", "-1").is_err());
    }

    #[test]
    fn test_reset_clears_overrides() {
        let mut config = UserConfig::default();
        config.set("max-files", "2").expect("valid key");
        assert!(config.has_overrides());

        config.reset();
        assert!(!config.has_overrides());
    }

    #[test]
    fn test_corrupted_file_is_parse_error() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[upload\nmax_files = ").expect("write");

        let err = UserConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }
}
