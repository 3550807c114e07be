use crate::config::{AudioConfig, SilenceConfig};
use crate::error::PipelineError;
use crate::silence::SilenceTracker;
use crate::types::{AudioClip, AudioFormat, SampleI16};
use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Sample, SizedSample};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// キャプチャスレッドから録音ループへ渡すイベント
pub enum CaptureEvent {
    /// モノラル変換済みのサンプルウィンドウ
    Frames(Vec<SampleI16>),

    /// ストリームエラー。セッションは中断され部分バッファは破棄される
    Error(String),
}

/// マイク入力からの録音セッション
///
/// 1回の `record()` 呼び出しが1セッション。デバイスを開き、
/// cpalコールバックからチャンネル経由でウィンドウを受け取り、
/// 以下のいずれかで確定する:
///
/// - 連続無音が `min_silence_secs` に達した
/// - 録音時間が `max_duration_secs` に達した
/// - 停止フラグ (Ctrl+C) が立った
///
/// 確定したクリップは末尾の無音を含む全バッファを保持する。
/// セッション中のストリームエラーは部分バッファを破棄して
/// `RecordingFailed` になる。デバイスはセッション終了時に必ず
/// 解放される。
pub struct Recorder {
    device_name: String,
    silence: SilenceConfig,
    stop_flag: Arc<AtomicBool>,
}

impl Recorder {
    pub fn new(audio: &AudioConfig, silence: &SilenceConfig, stop_flag: Arc<AtomicBool>) -> Self {
        Self {
            device_name: audio.device_name.clone(),
            silence: silence.clone(),
            stop_flag,
        }
    }

    /// 録音セッションを実行して完成したクリップを返す
    ///
    /// 呼び出しスレッドをブロックする。ネットワーク処理とは
    /// 重ならない前提の逐次フロー。
    ///
    /// # Errors
    ///
    /// - `DeviceUnavailable` - デバイスが開けない
    /// - `RecordingFailed` - セッション中のI/Oエラー、または
    ///   サンプルが1つも録れなかった場合
    pub fn record(&self) -> Result<AudioClip> {
        let device = self.open_device()?;
        let device_name = device.name().unwrap_or_else(|_| "(不明)".to_string());

        let default_config = device.default_input_config().map_err(|e| {
            PipelineError::DeviceUnavailable(format!("{}: 入力設定が取得できません: {}", device_name, e))
        })?;

        let sample_rate = default_config.sample_rate().0;
        let channels = default_config.channels();

        log::info!(
            "入力デバイス: {} ({}Hz, {}ch)",
            device_name,
            sample_rate,
            channels
        );

        let (tx, rx) = bounded::<CaptureEvent>(1024);

        let stream_config: cpal::StreamConfig = default_config.config();
        let stream = match default_config.sample_format() {
            cpal::SampleFormat::F32 => {
                Self::build_stream::<f32>(&device, &stream_config, channels, tx)?
            }
            cpal::SampleFormat::I16 => {
                Self::build_stream::<i16>(&device, &stream_config, channels, tx)?
            }
            cpal::SampleFormat::U16 => {
                Self::build_stream::<u16>(&device, &stream_config, channels, tx)?
            }
            cpal::SampleFormat::I32 => {
                Self::build_stream::<i32>(&device, &stream_config, channels, tx)?
            }
            other => {
                return Err(PipelineError::DeviceUnavailable(format!(
                    "サポートされていないサンプルフォーマット: {:?}",
                    other
                ))
                .into())
            }
        };

        stream.play().map_err(|e| {
            PipelineError::DeviceUnavailable(format!("ストリームの開始に失敗: {}", e))
        })?;

        // 前セッションの停止フラグを引き継がない
        self.stop_flag.store(false, Ordering::SeqCst);

        log::info!("録音を開始しました (無音で自動停止、Ctrl+C で手動停止)");

        let mut tracker = SilenceTracker::new(&self.silence, sample_rate);
        let max_duration_ms = (self.silence.max_duration_secs * 1000.0) as u64;

        let result = collect_samples(&rx, &mut tracker, sample_rate, max_duration_ms, &self.stop_flag);

        // ストリームを破棄してデバイスを解放
        drop(stream);

        let samples = result?;

        if samples.is_empty() {
            return Err(PipelineError::RecordingFailed("録音データが空です".to_string()).into());
        }

        let clip = AudioClip {
            samples,
            format: AudioFormat {
                sample_rate,
                channels: 1,
            },
        };

        log::info!("録音を終了しました ({:.1}秒)", clip.duration_seconds());

        Ok(clip)
    }

    /// 設定されたデバイスを開く
    ///
    /// "default" はシステムのデフォルト入力デバイス。それ以外は
    /// 名前の完全一致で検索し、見つからなければ `DeviceUnavailable`。
    fn open_device(&self) -> Result<cpal::Device> {
        let host = cpal::default_host();

        if self.device_name == "default" {
            match host.default_input_device() {
                Some(device) => Ok(device),
                None => Err(PipelineError::DeviceUnavailable(
                    "デフォルト入力デバイスが見つかりません".to_string(),
                )
                .into()),
            }
        } else {
            let found = host
                .input_devices()
                .context("入力デバイス一覧の取得に失敗")?
                .find(|d| d.name().ok().as_deref() == Some(&self.device_name));

            match found {
                Some(device) => Ok(device),
                None => Err(PipelineError::DeviceUnavailable(format!(
                    "デバイスが見つかりません: {}",
                    self.device_name
                ))
                .into()),
            }
        }
    }

    /// ストリームを構築
    ///
    /// インターリーブされた入力をチャンネル平均でモノラルに変換し、
    /// i16サンプルのウィンドウとして送出する。
    fn build_stream<T>(
        device: &cpal::Device,
        config: &cpal::StreamConfig,
        num_channels: u16,
        tx: Sender<CaptureEvent>,
    ) -> Result<cpal::Stream>
    where
        T: SizedSample + Sample + Send + 'static,
        <T as Sample>::Float: Into<f32>,
    {
        let err_tx = tx.clone();
        let frame_width = (num_channels as usize).max(1);

        let data_callback = move |data: &[T], _info: &cpal::InputCallbackInfo| {
            let mut mono = Vec::with_capacity(data.len() / frame_width);

            for frame in data.chunks(frame_width) {
                let mut sum = 0.0f32;
                for sample in frame {
                    let f: f32 = sample.to_float_sample().into();
                    sum += f;
                }
                let avg = sum / frame.len() as f32;
                let clamped = avg.clamp(-1.0, 1.0);
                mono.push((clamped * i16::MAX as f32) as i16);
            }

            if tx.try_send(CaptureEvent::Frames(mono)).is_err() {
                log::warn!("録音バッファが満杯のためウィンドウを破棄しました");
            }
        };

        let error_callback = move |err: cpal::StreamError| {
            log::error!("ストリームエラー: {}", err);
            let _ = err_tx.try_send(CaptureEvent::Error(err.to_string()));
        };

        let stream = device
            .build_input_stream(config, data_callback, error_callback, None)
            .context("入力ストリームの構築に失敗")?;

        Ok(stream)
    }

    /// デバイス一覧を表示
    pub fn list_devices() -> Result<()> {
        let host = cpal::default_host();
        let default_name = host
            .default_input_device()
            .and_then(|d| d.name().ok());

        println!("利用可能な入力デバイス:");
        println!();

        for (idx, device) in host
            .input_devices()
            .context("入力デバイス一覧の取得に失敗")?
            .enumerate()
        {
            let name = device.name()?;
            let marker = if Some(&name) == default_name.as_ref() {
                " (デフォルト)"
            } else {
                ""
            };
            println!("  [{}] {}{}", idx, name, marker);

            device.supported_input_configs()?.for_each(|config_range| {
                println!(
                    "      フォーマット: {:?}, {}-{}Hz, {}ch",
                    config_range.sample_format(),
                    config_range.min_sample_rate().0,
                    config_range.max_sample_rate().0,
                    config_range.channels()
                );
            });
            println!();
        }

        Ok(())
    }
}

/// 録音ループの本体
///
/// チャンネルからウィンドウを受信してバッファに積み、停止条件を
/// 判定する。経過時間はサンプル数から算出する。
///
/// エラーイベントまたはチャンネル切断は `RecordingFailed` として
/// 返し、それまでのバッファは破棄される。
fn collect_samples(
    rx: &Receiver<CaptureEvent>,
    tracker: &mut SilenceTracker,
    sample_rate: u32,
    max_duration_ms: u64,
    stop_flag: &AtomicBool,
) -> Result<Vec<SampleI16>> {
    let mut recording: Vec<SampleI16> = Vec::new();
    let mut elapsed_ms = 0u64;

    loop {
        if stop_flag.load(Ordering::SeqCst) {
            log::info!("停止要求により録音を終了します");
            break;
        }

        match rx.recv_timeout(Duration::from_millis(100)) {
            Ok(CaptureEvent::Frames(frames)) => {
                elapsed_ms += (frames.len() as f64 / sample_rate as f64 * 1000.0) as u64;

                // 末尾の無音も含めて全ウィンドウを保持する
                recording.extend_from_slice(&frames);

                if tracker.observe(&frames) {
                    log::info!("連続無音を検出したため録音を終了します");
                    break;
                }

                if elapsed_ms >= max_duration_ms {
                    log::info!("最大録音時間に達したため録音を終了します");
                    break;
                }
            }
            Ok(CaptureEvent::Error(msg)) => {
                return Err(PipelineError::RecordingFailed(msg).into());
            }
            Err(RecvTimeoutError::Timeout) => {
                // ウィンドウ未着。停止フラグの確認に戻る
                continue;
            }
            Err(RecvTimeoutError::Disconnected) => {
                return Err(PipelineError::RecordingFailed(
                    "音声ストリームが切断されました".to_string(),
                )
                .into());
            }
        }
    }

    Ok(recording)
}
