use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// 文字起こしAPIが受け付けるファイルサイズの上限
pub const MAX_CHUNK_BYTES: u64 = 25 * 1024 * 1024; // 25 MB

/// ファイルが分割対象 (上限超過) かどうか
pub fn needs_split(path: &Path, max_bytes: u64) -> Result<bool> {
    let size = fs::metadata(path)
        .with_context(|| format!("ファイル情報の取得に失敗: {:?}", path))?
        .len();
    Ok(size > max_bytes)
}

/// WAVファイルかどうか (拡張子判定)
pub fn is_wav(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("wav"))
        .unwrap_or(false)
}

/// 上限を超えたWAVファイルを複数のパートに分割する
///
/// チャンク長は60秒から始め、上限に収まるまで10秒ずつ短くする。
/// 10秒まで縮めても収まらない場合はエラー。パートは元ファイルと
/// 同じディレクトリに `<元の名前>_p<連番>.wav` として書き出し、
/// 全パートの書き出しに成功したら元ファイルを削除する。
///
/// # Returns
///
/// 書き出したパートのパス一覧。
pub fn split_wav_file(path: &Path, max_bytes: u64) -> Result<Vec<PathBuf>> {
    let mut reader =
        hound::WavReader::open(path).with_context(|| format!("WAVファイルを開けません: {:?}", path))?;
    let spec = reader.spec();

    if spec.bits_per_sample != 16 || spec.sample_format != hound::SampleFormat::Int {
        anyhow::bail!(
            "サポートされていないWAVフォーマットです ({}bit {:?}): {:?}",
            spec.bits_per_sample,
            spec.sample_format,
            path
        );
    }

    let bytes_per_sec = spec.sample_rate as u64 * spec.channels as u64 * 2;

    // 60秒から始めて上限に収まるまで10秒ずつ短くする
    let mut chunk_secs = 60u64;
    while chunk_secs * bytes_per_sec > max_bytes && chunk_secs > 10 {
        chunk_secs -= 10;
    }
    if chunk_secs * bytes_per_sec > max_bytes {
        anyhow::bail!("チャンクを十分小さくできません: {:?}", path);
    }

    let chunk_samples = (chunk_secs * spec.sample_rate as u64) as usize * spec.channels as usize;

    let samples: Vec<i16> = reader
        .samples::<i16>()
        .collect::<std::result::Result<_, _>>()
        .with_context(|| format!("WAVサンプルの読み込みに失敗: {:?}", path))?;

    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "audio".to_string());

    let mut parts = Vec::new();

    for (index, chunk) in samples.chunks(chunk_samples).enumerate() {
        let part_path = parent.join(format!("{}_p{}.wav", stem, index + 1));

        let mut writer = hound::WavWriter::create(&part_path, spec)
            .with_context(|| format!("パートの作成に失敗: {:?}", part_path))?;
        for &sample in chunk {
            writer
                .write_sample(sample)
                .with_context(|| "パートへのサンプル書き込みに失敗")?;
        }
        writer
            .finalize()
            .with_context(|| "パートのファイナライズに失敗")?;

        log::info!("パートを保存しました: {:?}", part_path);
        parts.push(part_path);
    }

    fs::remove_file(path).with_context(|| format!("分割元の削除に失敗: {:?}", path))?;

    Ok(parts)
}
