//! vault-transcribe - 音声ノートの文字起こしとVault整理
//!
//! このクレートは、マイクから録音した音声（または既存の録音
//! ファイル）をOpenAIのAPIで文字起こしし、Markdownノートとして
//! Obsidian VaultへファイリングするCLIツールを提供します。
//!
//! # 主な機能
//!
//! - **無音検出付き録音**: 一定時間の連続無音または最大録音時間で自動停止
//! - **Whisper API連携**: 保存済み音声ファイルの文字起こし
//! - **テキスト整形**: 句読点・段落の復元とテーマ抽出（ハッシュタグ）
//! - **Vault整理**: 年/月/日のフォルダ構成でノートと処理済み音声を振り分け
//! - **ボイスメモ取り込み**: 外部アプリが書き出した最新録音の処理
//! - **音声分割**: APIのサイズ上限を超えるWAVの分割
//!
//! # アーキテクチャ
//!
//! ```text
//! [Microphone] → [Recorder] → [AudioClip] → [clip_store]
//!                                                ↓
//!                         [Vault: Audios/Translate (inbox)]
//!                                                ↓
//!       [WhisperClient] → [GrammarRestorer] → [ThemeExtractor]
//!                                                ↓
//!                                          [VaultWriter]
//!                                    ↓                    ↓
//!                      [Audios/SpeechToText]    [Audios/Translated]
//! ```
//!
//! # 使用例
//!
//! ```no_run
//! use vault_transcribe::config::Config;
//!
//! // 設定ファイルを読み込み
//! let config = Config::load_or_default("config.toml").unwrap();
//!
//! // またはデフォルト設定を生成
//! Config::write_default("config.toml").unwrap();
//! ```

pub mod chat_api;
pub mod clip_store;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod recorder;
pub mod restore;
pub mod silence;
pub mod splitter;
pub mod themes;
pub mod transcribe_backend;
pub mod types;
pub mod vault;
pub mod voice_memos;
pub mod whisper_api;
