use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use std::fs;
use std::path::{Path, PathBuf};

/// これより小さいファイルは録音途中や空録音とみなして無視する
const MIN_FILE_SIZE: u64 = 10 * 1024; // 10KB

/// ボイスメモアプリの書き出すファイル名から録音日時を取り出す
///
/// 想定形式: `YYYYMMDD HHMMSS-<ID>.m4a`
fn parse_date_from_filename(filename: &str) -> Option<NaiveDateTime> {
    let mut parts = filename.split(' ');
    let date_str = parts.next()?;
    let time_str = parts.next()?.split('-').next()?;

    NaiveDateTime::parse_from_str(&format!("{} {}", date_str, time_str), "%Y%m%d %H%M%S").ok()
}

/// 監視ディレクトリから最新のボイスメモを探す
///
/// `.m4a` かつ 10KB 以上のファイルのうち、ファイル名の録音日時が
/// 最も新しいものを返す。有効なメモが1つも無ければ `None`。
///
/// # Errors
///
/// ディレクトリが存在しない、または読み取れない場合にエラーを返す。
pub fn find_latest_recording<P: AsRef<Path>>(dir: P) -> Result<Option<PathBuf>> {
    let dir = dir.as_ref();

    if !dir.is_dir() {
        anyhow::bail!(
            "ボイスメモディレクトリが見つかりません: {:?} (環境変数 VOICE_MEMOS_DIR で指定できます)",
            dir
        );
    }

    let mut latest: Option<(NaiveDateTime, PathBuf)> = None;

    for entry in fs::read_dir(dir)
        .with_context(|| format!("ボイスメモディレクトリの読み取りに失敗: {:?}", dir))?
    {
        let entry = entry?;
        let path = entry.path();

        let is_m4a = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("m4a"))
            .unwrap_or(false);
        if !is_m4a {
            continue;
        }

        let size = entry.metadata()?.len();
        if size < MIN_FILE_SIZE {
            log::debug!("サイズが小さいためスキップ: {:?} ({} バイト)", path, size);
            continue;
        }

        let filename = entry.file_name().to_string_lossy().into_owned();
        if let Some(recorded_at) = parse_date_from_filename(&filename) {
            let is_newer = latest
                .as_ref()
                .map(|(latest_at, _)| recorded_at > *latest_at)
                .unwrap_or(true);
            if is_newer {
                latest = Some((recorded_at, path));
            }
        }
    }

    Ok(latest.map(|(_, path)| path))
}
