use crate::config::SilenceConfig;
use crate::types::{SampleI16, SilenceState};

/// 無音検出器
///
/// RMS (Root Mean Square) ベースのシンプルな無音判定。
/// ウィンドウ単位の音声パワーを閾値と比較し、閾値未満なら無音と
/// みなす。録音の自動停止判定に使う。
///
/// # アルゴリズム
///
/// 1. 各サンプルを正規化 (-1.0 ~ 1.0)
/// 2. RMS (二乗平均平方根) を計算
/// 3. デシベル (dB) に変換: `20 * log10(rms)`
/// 4. 閾値と比較して無音/有音を判定
///
/// # 境界の扱い
///
/// `dB < threshold_db` のときのみ無音。閾値ちょうどのウィンドウは
/// 有音として扱う。空のウィンドウは慣例として無音。
///
/// # Examples
///
/// ```
/// # use vault_transcribe::silence::SilenceDetector;
/// # use vault_transcribe::config::SilenceConfig;
/// let config = SilenceConfig {
///     threshold_db: -40.0,
///     min_silence_secs: 6.0,
///     max_duration_secs: 300.0,
/// };
/// let detector = SilenceDetector::new(&config);
///
/// // 無音ウィンドウ
/// let silence = vec![0i16; 1600];
/// assert!(detector.is_silent(&silence));
///
/// // 有音ウィンドウ
/// let voice: Vec<i16> = (0..1600)
///     .map(|i| ((i as f32 * 0.1).sin() * 10000.0) as i16)
///     .collect();
/// assert!(!detector.is_silent(&voice));
/// ```
pub struct SilenceDetector {
    /// 無音判定の閾値 (dB)
    ///
    /// この値未満のRMSを持つウィンドウを無音とみなす
    threshold_db: f32,
}

impl SilenceDetector {
    pub fn new(config: &SilenceConfig) -> Self {
        Self {
            threshold_db: config.threshold_db,
        }
    }

    /// ウィンドウが無音かどうかを判定
    ///
    /// 純粋関数。入力と設定済み閾値のみに依存し、副作用を持たない。
    ///
    /// # Arguments
    /// * `samples` - 音声サンプル配列（1ウィンドウ分）
    ///
    /// # Returns
    /// * `true` - 無音（空のウィンドウを含む）
    /// * `false` - 有音
    pub fn is_silent(&self, samples: &[SampleI16]) -> bool {
        if samples.is_empty() {
            return true;
        }

        let rms = Self::calculate_rms(samples);
        let db = Self::rms_to_db(rms);

        db < self.threshold_db
    }

    /// RMS (Root Mean Square) を計算
    fn calculate_rms(samples: &[SampleI16]) -> f32 {
        if samples.is_empty() {
            return 0.0;
        }

        let sum_of_squares: f64 = samples
            .iter()
            .map(|&s| {
                let normalized = s as f64 / i16::MAX as f64;
                normalized * normalized
            })
            .sum();

        let mean_square = sum_of_squares / samples.len() as f64;
        mean_square.sqrt() as f32
    }

    /// RMSをデシベル (dB) に変換
    fn rms_to_db(rms: f32) -> f32 {
        if rms <= 0.0 {
            return -100.0; // 無音の場合の最小値
        }
        20.0 * rms.log10()
    }
}

/// 連続無音の追跡器
///
/// ウィンドウ単位の無音判定を積み上げ、連続無音時間が
/// `min_silence_secs` に達したかどうかを報告する。
/// 経過時間はサンプル数から算出するため壁時計に依存せず決定的。
///
/// 有音ウィンドウを観測すると蓄積された無音時間はリセットされる。
pub struct SilenceTracker {
    detector: SilenceDetector,

    /// 停止と判定する連続無音時間 (ミリ秒)
    required_ms: u32,

    /// サンプリングレート (Hz)
    ///
    /// ウィンドウ長から経過時間を算出するのに使用
    sample_rate: u32,

    /// 現在の状態
    state: SilenceState,
}

impl SilenceTracker {
    pub fn new(config: &SilenceConfig, sample_rate: u32) -> Self {
        Self {
            detector: SilenceDetector::new(config),
            required_ms: (config.min_silence_secs * 1000.0) as u32,
            sample_rate,
            state: SilenceState::Sounding,
        }
    }

    /// ウィンドウを観測して連続無音が規定時間に達したかを返す
    ///
    /// # Arguments
    /// * `samples` - 音声サンプル配列（1ウィンドウ分、モノラル）
    ///
    /// # Returns
    /// * `true` - 連続無音が `min_silence_secs` に達した
    /// * `false` - まだ達していない
    pub fn observe(&mut self, samples: &[SampleI16]) -> bool {
        // サンプル数から経過時間を計算（ミリ秒）
        let duration_ms = (samples.len() as f64 / self.sample_rate as f64 * 1000.0) as u32;

        if self.detector.is_silent(samples) {
            let elapsed_ms = match self.state {
                SilenceState::Sounding => {
                    log::debug!("無音区間の開始を検出");
                    duration_ms
                }
                SilenceState::Silent { elapsed_ms } => elapsed_ms + duration_ms,
            };
            self.state = SilenceState::Silent { elapsed_ms };
            elapsed_ms >= self.required_ms
        } else {
            self.state = SilenceState::Sounding;
            false
        }
    }

    /// 現在の状態を取得
    pub fn state(&self) -> SilenceState {
        self.state
    }

    /// 追跡状態を初期化
    ///
    /// 新しい録音セッションを始める前に呼ぶ。
    pub fn reset(&mut self) {
        self.state = SilenceState::Sounding;
    }
}
