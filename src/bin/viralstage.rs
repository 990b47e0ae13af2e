use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use std::future::Future;
use std::io::BufRead;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use viralstage::config::{AppConfig, ConfigManager};
use viralstage::logging;
use viralstage::session::disclaimer::DisclaimerOverlay;
use viralstage::session::{LiveSession, SessionEvent, WATERMARK_TEXT};
use viralstage::settings::{
    theme_for, Platform, RecordingLibrary, SettingsStore, SkinSelection, RECORDING_DURATION_SECS,
};
use viralstage::simulator::{CommentMode, SimulatorConfig, ViewerTier};
use viralstage::sources::TextGenerationSource;
use viralstage::storage::JsonFileStore;

#[derive(Parser, Debug)]
#[command(name = "viralstage")]
#[command(about = "Fake livestream simulator: synthetic viewers, comments and reactions")]
struct Cli {
    /// 設定ファイル（省略時はXDG設定ディレクトリのconfig.toml）
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// キー・バリューストアのファイル
    #[arg(long, global = true)]
    storage: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// フェイク配信を実行してイベントを表示する
    Live {
        /// 配信時間（秒）
        #[arg(long, default_value_t = 30)]
        duration: u64,
        /// 視聴者レベル (LOW / MEDIUM / HIGH)
        #[arg(long)]
        tier: Option<String>,
        /// コメントモード (fanboy / troll / romantic / multilingual)
        #[arg(long)]
        mode: Option<String>,
        /// スキン (tiktok / instagram / youtube / snapchat / facebook)
        #[arg(long)]
        skin: Option<String>,
        /// 乱数シード
        #[arg(long)]
        seed: Option<u64>,
        /// 録画して一覧に追加する
        #[arg(long, default_value_t = false)]
        record: bool,
        /// 自動開始の設定に関わらずすぐに配信を始める
        #[arg(long, default_value_t = false)]
        now: bool,
    },
    /// ユーザー設定
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// プラットフォームスキン
    Skins {
        #[command(subcommand)]
        action: SkinsAction,
    },
    /// 録画一覧
    Recordings {
        #[command(subcommand)]
        action: RecordingsAction,
    },
    /// 視聴者レベルの一覧
    Tiers,
    /// 実行環境の設定ファイル
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// 読み込まれた設定をTOMLで表示
    Show,
    /// 既定値で設定ファイルを書き出す
    Init {
        /// 既存のファイルを上書きする
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// 設定ファイルを削除して既定値に戻す
    Reset,
}

#[derive(Subcommand, Debug)]
enum SettingsAction {
    Show,
    Set {
        #[arg(long)]
        tier: Option<String>,
        #[arg(long)]
        mode: Option<String>,
        #[arg(long)]
        watermark: Option<bool>,
        #[arg(long)]
        auto_start: Option<bool>,
        #[arg(long)]
        sound: Option<bool>,
    },
    Reset,
}

#[derive(Subcommand, Debug)]
enum SkinsAction {
    List,
    Select { name: String },
}

#[derive(Subcommand, Debug)]
enum RecordingsAction {
    List,
    Delete { id: String },
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_manager = match &cli.config {
        Some(path) => ConfigManager::with_path(path)?,
        None => ConfigManager::new()?,
    };
    let config = config_manager.load_config().unwrap_or_else(|e| {
        eprintln!("設定読み込みエラー、デフォルト設定を使用: {:#}", e);
        AppConfig::default()
    });

    let _log_guard = logging::init_logging(&config.log)?;
    debug!("Using config: {}", config_manager.config_path().display());

    let store = match cli.storage.clone().or_else(|| config.storage_path.clone()) {
        Some(path) => JsonFileStore::new(path),
        None => JsonFileStore::open_default().context("Failed to resolve storage location")?,
    };
    let store = Arc::new(store);
    debug!("Using storage: {}", store.path().display());

    match cli.command {
        Command::Live {
            duration,
            tier,
            mode,
            skin,
            seed,
            record,
            now,
        } => {
            let options = LiveOptions {
                duration: Duration::from_secs(duration),
                tier,
                mode,
                skin,
                seed,
                record,
                now,
            };
            run_live(&config, store, options).await
        }
        Command::Settings { action } => run_settings(store, action),
        Command::Skins { action } => run_skins(store, action),
        Command::Recordings { action } => run_recordings(store, action),
        Command::Tiers => {
            print_tiers();
            Ok(())
        }
        Command::Config { action } => run_config(&config_manager, &config, action),
    }
}

struct LiveOptions {
    duration: Duration,
    tier: Option<String>,
    mode: Option<String>,
    skin: Option<String>,
    seed: Option<u64>,
    record: bool,
    now: bool,
}

async fn run_live(config: &AppConfig, store: Arc<JsonFileStore>, options: LiveOptions) -> Result<()> {
    let settings = SettingsStore::new(store.clone()).load();
    let platform = match &options.skin {
        Some(key) => Platform::resolve(key),
        None => SkinSelection::new(store.clone()).current(),
    };
    let simulator_config = SimulatorConfig {
        viewer_tier: options
            .tier
            .as_deref()
            .map(ViewerTier::resolve)
            .unwrap_or(settings.viewer_tier),
        comment_mode: options
            .mode
            .as_deref()
            .map(CommentMode::resolve)
            .unwrap_or(settings.comment_mode),
        stage: config.stage,
    };

    let text_generation = &config.text_generation;
    let mut builder = LiveSession::builder()
        .config(simulator_config)
        .timing(config.timing.into())
        .platform(platform)
        .show_watermark(settings.show_watermark)
        .speaker(&text_generation.speaker_name, &text_generation.topic);
    if let Some(seed) = options.seed.or(config.seed) {
        builder = builder.seed(seed);
    }
    if text_generation.enabled {
        match TextGenerationSource::from_env(text_generation.clone()) {
            Ok(source) => {
                info!("🤖 Using text generation model {}", text_generation.model);
                builder = builder.comment_source(Arc::new(source));
            }
            Err(e) => warn!("🤖 Text generation unavailable, using phrase bank: {}", e),
        }
    }
    let session = builder.build();

    let theme = theme_for(platform);
    println!(
        "{} {} | {} viewers | {} comments",
        theme.icon,
        theme.display_name,
        simulator_config.viewer_tier.config().label,
        simulator_config.comment_mode.display_name()
    );
    if settings.show_watermark {
        println!("{}", WATERMARK_TEXT);
    }

    let go_live = tokio::select! {
        ready = wait_for_go_live(settings.auto_start || options.now, listen_for_enter) => ready,
        _ = tokio::signal::ctrl_c() => false,
    };
    if !go_live {
        println!("⚫ Stream not started");
        return Ok(());
    }

    let mut events = session.subscribe();
    session.start()?;
    if options.record {
        session.start_recording();
    }
    let library = RecordingLibrary::new(store);

    let deadline = tokio::time::sleep(options.duration);
    let recording_deadline = tokio::time::sleep(Duration::from_secs(RECORDING_DURATION_SECS));
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(deadline, recording_deadline, ctrl_c);
    let mut recording_pending = options.record;

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            _ = &mut ctrl_c => {
                info!("🛑 終了シグナルを受信しました");
                break;
            }
            _ = &mut recording_deadline, if recording_pending => {
                recording_pending = false;
                save_recording(&session, &library);
            }
            event = events.recv() => match event {
                Ok(event) => render_event(&event, settings.show_watermark),
                Err(RecvError::Lagged(skipped)) => warn!("⚠️ Display lagged, {} events skipped", skipped),
                Err(RecvError::Closed) => break,
            },
        }
    }

    session.stop();
    if recording_pending {
        save_recording(&session, &library);
    }
    let snapshot = session.snapshot();
    session.shutdown();

    println!(
        "⏹️ Stream ended: {} comments on screen, last count {}",
        snapshot.comments.len(),
        snapshot.formatted_viewer_count.unwrap_or_else(|| "-".to_string())
    );
    Ok(())
}

/// 自動開始が無効ならEnterを待つ。入力が閉じられたら配信しない
async fn wait_for_go_live<F, Fut>(auto_start: bool, enter: F) -> bool
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = bool>,
{
    if auto_start {
        return true;
    }
    println!("⏸️ Auto start is off. Press Enter to go live");
    enter().await
}

/// 標準入力の読み取りは専用スレッドで行う（Ctrl-C時に終了を妨げない）
async fn listen_for_enter() -> bool {
    let (sender, receiver) = oneshot::channel();
    std::thread::spawn(move || {
        let _ = sender.send(read_enter(std::io::stdin().lock()));
    });
    receiver.await.unwrap_or(false)
}

fn read_enter<R: BufRead>(mut input: R) -> bool {
    let mut line = String::new();
    match input.read_line(&mut line) {
        Ok(read) => read > 0,
        Err(e) => {
            warn!("⚠️ Failed to read from stdin: {}", e);
            false
        }
    }
}

fn save_recording(session: &LiveSession, library: &RecordingLibrary<Arc<JsonFileStore>>) {
    if let Some(recording) = session.stop_recording() {
        match library.add(recording.clone()) {
            Ok(()) => println!("🎬 Recording saved: {}", recording.id),
            Err(e) => warn!("❌ Failed to save recording: {}", e),
        }
        session.dismiss_disclaimer();
    }
}

fn render_event(event: &SessionEvent, show_watermark: bool) {
    match event {
        SessionEvent::LiveChanged { is_live } => {
            println!("{}", if *is_live { "🔴 LIVE" } else { "⚫ OFFLINE" });
        }
        SessionEvent::ViewerCountUpdated { formatted, .. } => println!("👀 {}", formatted),
        SessionEvent::CommentAdded(comment) => {
            println!("💬 {}: {}", comment.username, comment.text)
        }
        SessionEvent::ReactionSpawned(particle) => println!("   {}", particle.emoji),
        SessionEvent::ReactionRemoved { id, reason } => {
            debug!("Reaction {} removed ({:?})", id, reason)
        }
        SessionEvent::DisclaimerChanged { visible: true } => {
            for line in DisclaimerOverlay::new(show_watermark).lines() {
                println!("│ {}", line);
            }
        }
        SessionEvent::DisclaimerChanged { visible: false } => {}
    }
}

fn run_settings(store: Arc<JsonFileStore>, action: SettingsAction) -> Result<()> {
    let settings_store = SettingsStore::new(store);
    match action {
        SettingsAction::Show => {}
        SettingsAction::Set {
            tier,
            mode,
            watermark,
            auto_start,
            sound,
        } => {
            if let Some(tier) = tier {
                let tier = ViewerTier::from_key(&tier)
                    .with_context(|| format!("Unknown viewer level: {}", tier))?;
                settings_store.set_viewer_tier(tier)?;
            }
            if let Some(mode) = mode {
                let mode = CommentMode::from_key(&mode)
                    .with_context(|| format!("Unknown comment mode: {}", mode))?;
                settings_store.set_comment_mode(mode)?;
            }
            if let Some(enabled) = watermark {
                settings_store.set_show_watermark(enabled)?;
            }
            if let Some(enabled) = auto_start {
                settings_store.set_auto_start(enabled)?;
            }
            if let Some(enabled) = sound {
                settings_store.set_sound_enabled(enabled)?;
            }
        }
        SettingsAction::Reset => {
            settings_store.reset()?;
        }
    }

    let settings = settings_store.load();
    println!("viewer level : {}", settings.viewer_tier.as_key());
    println!("comment mode : {}", settings.comment_mode.as_key());
    println!("watermark    : {}", settings.show_watermark);
    println!("auto start   : {}", settings.auto_start);
    println!("sound        : {}", settings.sound_enabled);
    Ok(())
}

fn run_skins(store: Arc<JsonFileStore>, action: SkinsAction) -> Result<()> {
    let selection = SkinSelection::new(store);
    match action {
        SkinsAction::List => {
            let current = selection.current();
            for platform in Platform::ALL {
                let theme = theme_for(platform);
                let marker = if platform == current { "*" } else { " " };
                println!(
                    "{} {} {:<10} {} / {}",
                    marker, theme.icon, theme.display_name, theme.background_color, theme.primary_color
                );
            }
        }
        SkinsAction::Select { name } => {
            let Some(platform) = Platform::from_key(&name) else {
                bail!("Unknown skin: {}", name);
            };
            selection.select(platform)?;
            println!("{} {} selected", platform.icon(), platform);
        }
    }
    Ok(())
}

fn run_recordings(store: Arc<JsonFileStore>, action: RecordingsAction) -> Result<()> {
    let library = RecordingLibrary::new(store);
    match action {
        RecordingsAction::List => {
            let recordings = library.list();
            if recordings.is_empty() {
                println!("No recordings yet");
            }
            for recording in recordings {
                println!(
                    "{} {:<10} {} {}s{} {}",
                    recording.platform.icon(),
                    recording.platform.to_string(),
                    recording
                        .timestamp
                        .with_timezone(&chrono::Local)
                        .format("%Y-%m-%d %H:%M"),
                    recording.duration,
                    if recording.has_watermark { " 🎭" } else { "" },
                    recording.id
                );
            }
        }
        RecordingsAction::Delete { id } => {
            if library.delete(&id)? {
                println!("Deleted {}", id);
            } else {
                bail!("Recording not found: {}", id);
            }
        }
        RecordingsAction::Clear => {
            library.clear()?;
            println!("All recordings cleared");
        }
    }
    Ok(())
}

fn run_config(manager: &ConfigManager, config: &AppConfig, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            println!("# {}", manager.config_path().display());
            print!("{}", toml::to_string_pretty(config).context("Failed to serialize config")?);
        }
        ConfigAction::Init { force } => {
            if manager.config_exists() && !force {
                bail!(
                    "Config file already exists: {} (use --force to overwrite)",
                    manager.config_path().display()
                );
            }
            manager.save_config(&AppConfig::default())?;
            println!("Wrote {}", manager.config_path().display());
        }
        ConfigAction::Reset => {
            manager.reset_config()?;
            println!("Config reset to defaults");
        }
    }
    Ok(())
}

fn print_tiers() {
    for tier in ViewerTier::ALL {
        let config = tier.config();
        println!(
            "{:<6} {:>6} - {:<6} ({})",
            tier.as_key(),
            config.min_count,
            config.max_count,
            config.label
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_auto_start_goes_live_without_input() {
        let asked = std::cell::Cell::new(false);
        let ready = wait_for_go_live(true, || async {
            asked.set(true);
            false
        })
        .await;
        assert!(ready);
        assert!(!asked.get());
    }

    #[tokio::test]
    async fn test_manual_start_follows_enter() {
        assert!(wait_for_go_live(false, || async { read_enter(&b"\n"[..]) }).await);
        assert!(!wait_for_go_live(false, || async { read_enter(&b""[..]) }).await);
    }

    #[test]
    fn test_live_accepts_now_flag() {
        let cli = Cli::try_parse_from(["viralstage", "live", "--now", "--duration", "5"])
            .expect("parse");
        assert!(matches!(
            cli.command,
            Command::Live {
                now: true,
                duration: 5,
                ..
            }
        ));
    }

    #[test]
    fn test_config_init_writes_defaults_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manager = ConfigManager::with_path(dir.path().join("config.toml")).expect("manager");
        let config = AppConfig::default();

        run_config(&manager, &config, ConfigAction::Init { force: false }).expect("init");
        assert_eq!(manager.load_config().expect("load"), AppConfig::default());
        assert!(run_config(&manager, &config, ConfigAction::Init { force: false }).is_err());
        run_config(&manager, &config, ConfigAction::Init { force: true }).expect("force");

        run_config(&manager, &config, ConfigAction::Reset).expect("reset");
        assert!(!manager.config_exists());
    }
}
