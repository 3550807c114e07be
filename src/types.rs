/// 16ビット整数型のオーディオサンプル
///
/// PCM形式の音声データを表現するための型エイリアス。
/// -32768 から 32767 の範囲の値を取る。
pub type SampleI16 = i16;

/// オーディオフォーマット情報
///
/// 音声データのサンプリングレートとチャンネル数を保持する。
///
/// # Examples
///
/// ```
/// # use vault_transcribe::types::AudioFormat;
/// let format = AudioFormat {
///     sample_rate: 48000,  // 48kHz
///     channels: 1,          // モノラル
/// };
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AudioFormat {
    /// サンプリングレート (Hz)
    ///
    /// 典型的な値: 16000, 44100, 48000
    pub sample_rate: u32,

    /// チャンネル数
    ///
    /// 録音セッションは常にモノラル (1) に変換して保持する
    pub channels: u16,
}

/// 録音クリップ
///
/// 1回の録音セッションが生成する完結した音声データ。
/// 生成後は変更されず、文字起こしまたはWAV書き出しに
/// そのまま引き渡される。
///
/// # Examples
///
/// ```
/// # use vault_transcribe::types::{AudioClip, AudioFormat};
/// let clip = AudioClip {
///     samples: vec![0i16; 16000], // 1秒分 @ 16kHz
///     format: AudioFormat { sample_rate: 16000, channels: 1 },
/// };
/// assert_eq!(clip.duration_seconds(), 1.0);
/// ```
#[derive(Clone, Debug)]
pub struct AudioClip {
    /// PCM音声サンプルの配列
    pub samples: Vec<SampleI16>,

    /// オーディオフォーマット情報
    pub format: AudioFormat,
}

impl AudioClip {
    /// クリップの長さ（秒）
    ///
    /// サンプル数から算出する。壁時計には依存しない。
    pub fn duration_seconds(&self) -> f64 {
        if self.format.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64
            / (self.format.sample_rate as f64 * self.format.channels as f64)
    }

    /// サンプルが1つも無いかどうか
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// 文字起こし結果
///
/// 1クリップにつき1つ生成される。`themes` はハッシュタグ形式の
/// テーマ文字列（例: `#買い物メモ`）。テーマ抽出を無効化している
/// 場合や抽出に失敗した場合は空になる。
#[derive(Clone, Debug)]
pub struct Transcript {
    /// 整形済みの本文
    pub text: String,

    /// 抽出されたテーマ（ハッシュタグ形式）
    pub themes: Vec<String>,
}

impl Transcript {
    /// テーマ無しの文字起こし結果を作成
    pub fn plain(text: String) -> Self {
        Self {
            text,
            themes: Vec::new(),
        }
    }
}

/// 無音追跡の状態
///
/// 録音セッション中の連続無音時間を追跡する。
/// 音が検出されると蓄積された無音時間はリセットされる。
///
/// # Examples
///
/// ```
/// # use vault_transcribe::types::SilenceState;
/// // 音が鳴っている状態
/// let state = SilenceState::Sounding;
///
/// // 無音状態（最初の無音ウィンドウから1500ms経過）
/// let state = SilenceState::Silent { elapsed_ms: 1500 };
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SilenceState {
    /// 音が検出されている状態
    Sounding,

    /// 無音状態
    ///
    /// 最初の無音ウィンドウからの経過時間（ミリ秒）を保持する。
    /// サンプル数から算出するため決定的。
    Silent {
        /// 連続無音の経過時間（ミリ秒）
        elapsed_ms: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_format_creation() {
        let format = AudioFormat {
            sample_rate: 48000,
            channels: 1,
        };
        assert_eq!(format.sample_rate, 48000);
        assert_eq!(format.channels, 1);
    }

    #[test]
    fn test_clip_duration() {
        let clip = AudioClip {
            samples: vec![0i16; 32000],
            format: AudioFormat {
                sample_rate: 16000,
                channels: 1,
            },
        };
        assert_eq!(clip.duration_seconds(), 2.0);
        assert!(!clip.is_empty());
    }

    #[test]
    fn test_empty_clip() {
        let clip = AudioClip {
            samples: Vec::new(),
            format: AudioFormat {
                sample_rate: 16000,
                channels: 1,
            },
        };
        assert!(clip.is_empty());
        assert_eq!(clip.duration_seconds(), 0.0);
    }

    #[test]
    fn test_silence_state_equality() {
        assert_eq!(SilenceState::Sounding, SilenceState::Sounding);
        assert_eq!(
            SilenceState::Silent { elapsed_ms: 1500 },
            SilenceState::Silent { elapsed_ms: 1500 }
        );
        assert_ne!(
            SilenceState::Sounding,
            SilenceState::Silent { elapsed_ms: 0 }
        );
    }

    #[test]
    fn test_transcript_plain() {
        let transcript = Transcript::plain("こんにちは".to_string());
        assert_eq!(transcript.text, "こんにちは");
        assert!(transcript.themes.is_empty());
    }
}
