use crate::error::PipelineError;
use crate::types::AudioClip;
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};

/// 録音直後のクリップをVaultの取り込みフォルダへWAVとして保存する
///
/// 保存先は `<inbox>/<年>/<月>/<日>/recording_<タイムスタンプ>.wav`。
/// タイムスタンプは後段のファイル移動で日付抽出に使われる形式
/// (`%Y_%m_%d__%H_%M_%S`) で埋め込む。
///
/// # Errors
///
/// ディレクトリ作成または書き込みに失敗した場合は
/// `DestinationUnwritable` を返す。
pub fn save_clip<P: AsRef<Path>>(clip: &AudioClip, inbox_dir: P) -> Result<PathBuf> {
    save_clip_at(clip, inbox_dir, &Local::now())
}

/// タイムスタンプを注入できる保存処理の本体
pub fn save_clip_at<P: AsRef<Path>>(
    clip: &AudioClip,
    inbox_dir: P,
    now: &DateTime<Local>,
) -> Result<PathBuf> {
    let date_dir = inbox_dir
        .as_ref()
        .join(now.format("%Y").to_string())
        .join(now.format("%m").to_string())
        .join(now.format("%d").to_string());

    fs::create_dir_all(&date_dir).map_err(|e| {
        PipelineError::DestinationUnwritable(format!("{:?}: {}", date_dir, e))
    })?;

    let filename = format!("recording_{}.wav", now.format("%Y_%m_%d__%H_%M_%S"));
    let filepath = date_dir.join(&filename);

    let spec = hound::WavSpec {
        channels: clip.format.channels,
        sample_rate: clip.format.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(&filepath, spec).map_err(|e| {
        PipelineError::DestinationUnwritable(format!("{:?}: {}", filepath, e))
    })?;

    for &sample in &clip.samples {
        writer
            .write_sample(sample)
            .with_context(|| "WAVファイルへのサンプル書き込みに失敗")?;
    }

    writer
        .finalize()
        .with_context(|| "WAVファイルのファイナライズに失敗")?;

    log::info!(
        "録音を保存しました: {:?} ({:.1}秒)",
        filepath,
        clip.duration_seconds()
    );

    Ok(filepath)
}
