use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub silence: SilenceConfig,
    #[serde(default)]
    pub whisper: WhisperConfig,
    #[serde(default)]
    pub restore: RestoreConfig,
    #[serde(default)]
    pub themes: ThemesConfig,
    #[serde(default)]
    pub vault: VaultConfig,
    #[serde(default)]
    pub voice_memos: VoiceMemosConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// オーディオ入力設定
///
/// # デフォルト値
///
/// - `device_name`: "default" (システムのデフォルト入力デバイス)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AudioConfig {
    /// 入力デバイス名。"default" 以外を指定した場合は名前の完全一致で
    /// デバイスを検索し、見つからなければエラーになる
    #[serde(default = "default_device_name")]
    pub device_name: String,
}

/// 無音検出設定
///
/// 録音の自動停止条件を決める。
///
/// # デフォルト値
///
/// - `threshold_db`: -40.0 dB
/// - `min_silence_secs`: 6.0 秒 (この時間連続で無音なら停止)
/// - `max_duration_secs`: 300 秒 (無音に関係なく最長録音時間)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SilenceConfig {
    #[serde(default = "default_threshold_db")]
    pub threshold_db: f32,
    #[serde(default = "default_min_silence_secs")]
    pub min_silence_secs: f64,
    #[serde(default = "default_max_duration_secs")]
    pub max_duration_secs: f64,
}

/// OpenAI Whisper API 設定
///
/// # デフォルト値
///
/// - `model`: "whisper-1"
/// - `language`: 未指定 (自動判定)
///
/// `api_key` は環境変数 `OPENAI_API_KEY` で上書きできる。
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WhisperConfig {
    /// OpenAI API Key
    #[serde(default)]
    pub api_key: String,
    /// Whisper モデル名（通常 "whisper-1"）
    #[serde(default = "default_whisper_model")]
    pub model: String,
    /// 言語コード（"ja", "en" など）。省略時はAPI側で自動判定
    pub language: Option<String>,
}

/// 句読点復元設定
///
/// 文字起こし結果に句読点と段落区切りを補う後処理。
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RestoreConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_chat_model")]
    pub model: String,
}

/// テーマ抽出設定
///
/// 整形済みテキストからハッシュタグ形式のテーマを抽出する。
///
/// # デフォルト値
///
/// - `enabled`: true
/// - `model`: "gpt-4o"
/// - `count`: 3 個
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ThemesConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_chat_model")]
    pub model: String,
    #[serde(default = "default_theme_count")]
    pub count: usize,
}

/// Vault設定
///
/// `root` は環境変数 `OBSIDIAN_VAULT_PATH` で上書きできる。
/// Vault内のサブフォルダ構成 (Translate / Translated / SpeechToText)
/// は固定で、`vault` モジュールが管理する。
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VaultConfig {
    /// Vaultのルートディレクトリ
    #[serde(default)]
    pub root: String,
}

/// 外部ボイスメモ設定
///
/// iPhone/Macのボイスメモアプリが書き出す録音を取り込む場合の
/// 監視ディレクトリ。環境変数 `VOICE_MEMOS_DIR` で上書きできる。
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct VoiceMemosConfig {
    pub dir: Option<String>,
}

/// 出力設定
///
/// # デフォルト値
///
/// - `log_level`: "info"
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// Default functions
fn default_device_name() -> String {
    "default".to_string()
}

fn default_threshold_db() -> f32 {
    -40.0
}

fn default_min_silence_secs() -> f64 {
    6.0
}

fn default_max_duration_secs() -> f64 {
    300.0
}

fn default_whisper_model() -> String {
    "whisper-1".to_string()
}

fn default_chat_model() -> String {
    "gpt-4o".to_string()
}

fn default_theme_count() -> usize {
    3
}

fn default_enabled() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            audio: AudioConfig::default(),
            silence: SilenceConfig::default(),
            whisper: WhisperConfig::default(),
            restore: RestoreConfig::default(),
            themes: ThemesConfig::default(),
            vault: VaultConfig::default(),
            voice_memos: VoiceMemosConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device_name: default_device_name(),
        }
    }
}

impl Default for SilenceConfig {
    fn default() -> Self {
        Self {
            threshold_db: default_threshold_db(),
            min_silence_secs: default_min_silence_secs(),
            max_duration_secs: default_max_duration_secs(),
        }
    }
}

impl Default for WhisperConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_whisper_model(),
            language: None,
        }
    }
}

impl Default for RestoreConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            model: default_chat_model(),
        }
    }
}

impl Default for ThemesConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            model: default_chat_model(),
            count: default_theme_count(),
        }
    }
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            root: String::new(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// 設定ファイルから読み込み
    ///
    /// TOML形式の設定ファイルをパースしてConfig構造体を生成する。
    ///
    /// # Arguments
    ///
    /// * `path` - 設定ファイルのパス
    ///
    /// # Errors
    ///
    /// ファイルの読み込みまたはパースに失敗した場合にエラーを返す。
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use vault_transcribe::config::Config;
    /// let config = Config::from_file("config.toml").unwrap();
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("設定ファイルの読み込みに失敗: {:?}", path.as_ref()))?;
        let config: Config =
            toml::from_str(&content).with_context(|| "設定ファイルのパースに失敗")?;
        Ok(config)
    }

    /// デフォルト設定をファイルに書き出し
    ///
    /// デフォルト値を持つ設定ファイルを生成する。
    /// 既存のファイルは上書きされる。
    ///
    /// # Arguments
    ///
    /// * `path` - 出力先のパス
    ///
    /// # Errors
    ///
    /// ファイルの書き込みに失敗した場合にエラーを返す。
    pub fn write_default<P: AsRef<Path>>(path: P) -> Result<()> {
        let config = Config::default();
        let content =
            toml::to_string_pretty(&config).with_context(|| "設定のシリアライズに失敗")?;
        fs::write(path.as_ref(), content)
            .with_context(|| format!("設定ファイルの書き込みに失敗: {:?}", path.as_ref()))?;
        Ok(())
    }

    /// 設定ファイルがあれば読み込み、なければデフォルトを使用
    ///
    /// # Errors
    ///
    /// ファイルが存在するがパースに失敗した場合にエラーを返す。
    /// ファイルが存在しない場合はエラーにならず、デフォルト設定を返す。
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            log::warn!(
                "設定ファイルが見つかりません。デフォルト設定を使用します: {:?}",
                path.as_ref()
            );
            Ok(Config::default())
        }
    }

    /// 環境変数による上書きを適用
    ///
    /// 設定ファイルよりも環境変数を優先する。認識する変数:
    ///
    /// - `OPENAI_API_KEY` → `whisper.api_key`
    /// - `OBSIDIAN_VAULT_PATH` → `vault.root`
    /// - `MICROPHONE_NAME` → `audio.device_name`
    /// - `VOICE_MEMOS_DIR` → `voice_memos.dir`
    pub fn apply_env_overrides(&mut self) {
        self.apply_env_overrides_from(|name| std::env::var(name).ok());
    }

    /// 環境変数取得関数を差し替え可能にした上書き処理の本体
    pub fn apply_env_overrides_from<F>(&mut self, get: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = get("OPENAI_API_KEY") {
            if !key.is_empty() {
                self.whisper.api_key = key;
            }
        }
        if let Some(root) = get("OBSIDIAN_VAULT_PATH") {
            if !root.is_empty() {
                self.vault.root = root;
            }
        }
        if let Some(name) = get("MICROPHONE_NAME") {
            if !name.is_empty() {
                self.audio.device_name = name;
            }
        }
        if let Some(dir) = get("VOICE_MEMOS_DIR") {
            if !dir.is_empty() {
                self.voice_memos.dir = Some(dir);
            }
        }
    }

    /// 起動時の検証
    ///
    /// API呼び出しとVault書き込みに必須の設定が揃っているかを確認する。
    ///
    /// # Errors
    ///
    /// `vault.root` または `whisper.api_key` が空の場合にエラーを返す。
    pub fn validate(&self) -> Result<()> {
        if self.vault.root.is_empty() {
            anyhow::bail!(
                "Vaultルートが未設定です。config.toml の [vault] root または環境変数 OBSIDIAN_VAULT_PATH を設定してください"
            );
        }
        if self.whisper.api_key.is_empty() {
            anyhow::bail!(
                "APIキーが未設定です。config.toml の [whisper] api_key または環境変数 OPENAI_API_KEY を設定してください"
            );
        }
        Ok(())
    }
}
