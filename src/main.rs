use anyhow::{Context, Result};
use env_logger::Env;
use std::io::{self, Write};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use vault_transcribe::config::Config;
use vault_transcribe::pipeline::{Pipeline, ProcessedNote};
use vault_transcribe::recorder::Recorder;
use vault_transcribe::restore::GrammarRestorer;
use vault_transcribe::themes::ThemeExtractor;
use vault_transcribe::vault::VaultWriter;
use vault_transcribe::whisper_api::WhisperClient;
use vault_transcribe::{clip_store, splitter, voice_memos};

#[tokio::main]
async fn main() -> Result<()> {
    // コマンドライン引数をパース
    let args: Vec<String> = std::env::args().collect();

    // デバイス一覧表示モード
    if args.len() > 1 && args[1] == "--show-interfaces" {
        Recorder::list_devices()?;
        return Ok(());
    }

    // 設定ファイル生成モード
    if args.len() > 1 && args[1] == "--generate-config" {
        let config_path = if args.len() > 2 {
            &args[2]
        } else {
            "config.toml"
        };
        Config::write_default(config_path)?;
        println!("設定ファイルを生成しました: {}", config_path);
        return Ok(());
    }

    // 設定ファイルのパス
    let config_path = if args.len() > 1 && !args[1].starts_with("--") {
        &args[1]
    } else {
        "config.toml"
    };

    // 設定を読み込み、環境変数で上書き
    let mut config = Config::load_or_default(config_path)?;
    config.apply_env_overrides();

    // ロガーを初期化
    env_logger::Builder::from_env(Env::default().default_filter_or(config.output.log_level.as_str()))
        .format_timestamp(None)
        .init();

    log::info!("vault-transcribe を起動します");
    log::info!("設定ファイル: {}", config_path);

    config.validate()?;

    // Ctrl+C は録音セッションの停止フラグとして使う
    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop_clone = stop_flag.clone();
    ctrlc::set_handler(move || {
        log::info!("停止シグナルを受信しました...");
        stop_clone.store(true, Ordering::SeqCst);
    })?;

    // 各コンポーネントを初期化
    let recorder = Recorder::new(&config.audio, &config.silence, stop_flag);

    let vault = VaultWriter::new(&config.vault.root)?;
    let transcriber = WhisperClient::new(&config.whisper)?;
    let restorer = if config.restore.enabled {
        Some(GrammarRestorer::new(&config.whisper.api_key, &config.restore)?)
    } else {
        None
    };
    let themes = if config.themes.enabled {
        Some(ThemeExtractor::new(&config.whisper.api_key, &config.themes)?)
    } else {
        None
    };
    let pipeline = Pipeline::new(Box::new(transcriber), restorer, themes, vault);

    println!();
    println!("=== 音声ノート変換 ===");
    println!("録音した音声を文字起こしして Vault に保存します。");

    loop {
        let command = read_menu_command()?;

        match command.as_str() {
            "1" => {
                if let Err(e) = record_and_process(&recorder, &pipeline).await {
                    log::error!("録音の処理に失敗: {}", e);
                    println!("\nエラー: {}", e);
                }
            }
            "2" => {
                log::info!("終了が要求されました");
                println!("さようなら!");
                break;
            }
            "3" => {
                println!("\n取り込みフォルダの音声を処理します...");
                if let Err(e) = process_existing_files(&pipeline).await {
                    log::error!("一括処理に失敗: {}", e);
                    println!("\nエラー: {}", e);
                }
            }
            "4" => {
                println!("\n最新のボイスメモを処理します...");
                if let Err(e) = process_voice_memo(&pipeline, &config).await {
                    log::error!("ボイスメモの処理に失敗: {}", e);
                    println!("\nエラー: {}", e);
                }
            }
            "5" => {
                println!("\n取り込みフォルダのWAVファイルを分割します...");
                if let Err(e) = split_inbox_files(&pipeline) {
                    log::error!("分割処理に失敗: {}", e);
                    println!("\nエラー: {}", e);
                }
            }
            _ => {
                println!("\n無効なコマンドです。1〜5 を入力してください。");
            }
        }
    }

    log::info!("vault-transcribe を終了しました");

    Ok(())
}

/// メニューを表示してコマンドを読み取る
///
/// 標準入力がEOFに達した場合は終了コマンドとして扱う。
fn read_menu_command() -> Result<String> {
    println!();
    println!("コマンド一覧:");
    println!("1: 新しく録音する");
    println!("2: 終了する");
    println!("3: 取り込みフォルダ (Translate) の音声を文字起こしする");
    println!("4: ボイスメモアプリの最新録音を文字起こしする");
    println!("5: 取り込みフォルダの音声を分割する (サイズ上限対策)");
    print!("\nコマンドを入力 (1-5): ");
    io::stdout().flush()?;

    let mut line = String::new();
    let bytes_read = io::stdin()
        .read_line(&mut line)
        .context("標準入力の読み取りに失敗")?;

    if bytes_read == 0 {
        return Ok("2".to_string());
    }

    Ok(line.trim().to_string())
}

/// 録音から保存までを1セッション実行する
async fn record_and_process(recorder: &Recorder, pipeline: &Pipeline) -> Result<()> {
    log::info!("新しい録音セッションを開始します");
    let clip = recorder.record()?;

    let clip_path = clip_store::save_clip(&clip, pipeline.vault().audio_input_dir())?;

    let note = pipeline.process_file(&clip_path).await?;
    print_note(&note);

    Ok(())
}

/// 取り込みフォルダ内の全音声ファイルを処理する
///
/// 1ファイルの失敗は記録して次のファイルへ進む。
async fn process_existing_files(pipeline: &Pipeline) -> Result<()> {
    let audio_files = pipeline.vault().find_audio_files()?;

    if audio_files.is_empty() {
        println!("\n取り込みフォルダに音声ファイルがありません。");
        return Ok(());
    }

    println!("\n{}件の音声ファイルを処理します。", audio_files.len());

    for audio_file in audio_files {
        println!("\n処理中: {}", audio_file.display());

        match pipeline.process_file(&audio_file).await {
            Ok(note) => {
                print_note(&note);
                println!("✓ 処理が完了しました");
            }
            Err(e) => {
                log::error!("処理に失敗 {:?}: {}", audio_file, e);
                println!("✗ 処理に失敗しました: {}", e);
                continue;
            }
        }
    }

    Ok(())
}

/// ボイスメモアプリの最新録音を処理する
async fn process_voice_memo(pipeline: &Pipeline, config: &Config) -> Result<()> {
    let dir = config.voice_memos.dir.as_deref().context(
        "ボイスメモディレクトリが未設定です。config.toml の [voice_memos] dir または環境変数 VOICE_MEMOS_DIR を設定してください",
    )?;

    let Some(memo) = voice_memos::find_latest_recording(dir)? else {
        println!("\n有効なボイスメモが見つかりません。");
        return Ok(());
    };

    println!("\n最新のボイスメモを処理します: {}", memo.display());

    let note = pipeline.process_file(&memo).await?;
    print_note(&note);
    println!("✓ ボイスメモの処理が完了しました");

    Ok(())
}

/// 取り込みフォルダ内のサイズ上限を超えたWAVを分割する
fn split_inbox_files(pipeline: &Pipeline) -> Result<()> {
    let audio_files = pipeline.vault().find_audio_files()?;

    if audio_files.is_empty() {
        println!("\n取り込みフォルダに音声ファイルがありません。");
        return Ok(());
    }

    for audio_file in audio_files {
        let name = audio_file.display();

        if !splitter::is_wav(&audio_file) {
            println!("✗ WAV以外は分割できないためスキップ: {}", name);
            continue;
        }

        match splitter::needs_split(&audio_file, splitter::MAX_CHUNK_BYTES) {
            Ok(false) => {
                log::debug!("分割不要: {:?}", audio_file);
                continue;
            }
            Ok(true) => {}
            Err(e) => {
                println!("✗ サイズの確認に失敗 {}: {}", name, e);
                continue;
            }
        }

        println!("\n分割中: {}", name);
        match splitter::split_wav_file(&audio_file, splitter::MAX_CHUNK_BYTES) {
            Ok(parts) => {
                println!("✓ {}個のパートに分割しました", parts.len());
            }
            Err(e) => {
                log::error!("分割に失敗 {:?}: {}", audio_file, e);
                println!("✗ 分割に失敗しました: {}", e);
                continue;
            }
        }
    }

    println!("\n分割処理が完了しました。");

    Ok(())
}

/// 処理結果を表示する
fn print_note(note: &ProcessedNote) {
    println!("\n文字起こし: {}", note.transcript.text);
    if !note.transcript.themes.is_empty() {
        println!("テーマ: {}", note.transcript.themes.join(" "));
    }
    println!("✓ ノート: {}", note.transcript_path.display());
    println!("  音声: {}", note.audio_path.display());
}
