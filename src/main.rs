//! 命令行入口

use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use timeline_translate::env::core::{LogLevel, NoColor};
use timeline_translate::env::{generate_env_docs, EnvVar};
use timeline_translate::network::HttpFetcher;
use timeline_translate::org::OrgDirectory;
use timeline_translate::translation::error::helpers;
use timeline_translate::translation::{
    content_hash, ConfigManager, RedbStore, RoomOverlay, Timeline, TranslationCache,
    TranslationConfig,
};

#[derive(Parser, Debug)]
#[command(name = "timeline-translate", version, about = "聊天时间线翻译工具")]
struct Cli {
    /// 配置文件路径
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// 本地存储文件路径
    #[arg(short, long, global = true)]
    store: Option<PathBuf>,

    /// 日志级别 (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 翻译时间线 HTML
    Translate {
        /// 房间 ID
        #[arg(short, long)]
        room: String,

        /// 目标语言；不指定时使用房间保存的语言
        #[arg(short, long)]
        lang: Option<String>,

        /// 本地用户 ID，其发送的消息不翻译
        #[arg(short, long)]
        user_id: Option<String>,

        /// 输入文件，缺省读标准输入
        input: Option<PathBuf>,

        /// 输出文件，缺省写标准输出
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// 读写房间的目标语言
    Preference {
        #[command(subcommand)]
        action: PreferenceAction,
    },
    /// 计算内容哈希
    Hash { text: String, lang: String },
    /// 列出组织目录
    Orgs,
    /// 打印环境变量说明
    EnvDocs,
    /// 生成示例配置文件
    InitConfig { path: PathBuf },
}

#[derive(Subcommand, Debug)]
enum PreferenceAction {
    Get { room: String },
    Set { room: String, lang: String },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    match cli.command {
        Command::Hash { text, lang } => {
            println!("{}", content_hash(&text, &lang));
        }
        Command::EnvDocs => {
            print!("{}", generate_env_docs());
        }
        Command::InitConfig { path } => {
            ConfigManager::generate_example_config(&path)?;
            println!("已生成配置文件: {}", path.display());
        }
        Command::Preference { action } => {
            let config = load_config(cli.config.as_ref())?;
            let cache = open_cache(cli.store.as_ref(), &config)?;
            match action {
                PreferenceAction::Get { room } => match cache.load_room_preference(&room).await {
                    Some(lang) => println!("{}", lang),
                    None => println!("{}", config.display_language),
                },
                PreferenceAction::Set { room, lang } => {
                    if lang.trim().is_empty() {
                        helpers::log_error::<()>(helpers::validation_error("目标语言不能为空"))?;
                    }
                    cache.save_room_preference(&room, &lang).await?;
                    println!("{} -> {}", room, lang);
                }
            }
        }
        Command::Orgs => {
            let config = load_config(cli.config.as_ref())?;
            let directory = OrgDirectory::from_config(&config)?;
            directory.refresh().await?;
            for org in directory.org_list() {
                println!("{}\t{}\t{}", org.id, org.alias, org.name);
            }
        }
        Command::Translate {
            room,
            lang,
            user_id,
            input,
            output,
        } => {
            let mut config = load_config(cli.config.as_ref())?;
            if user_id.is_some() {
                config.user_id = user_id;
            }
            let cache = open_cache(cli.store.as_ref(), &config)?;
            let html = read_input(input.as_ref())?;

            let timeline = Rc::new(Timeline::parse(&html)?);
            let fetcher = Arc::new(HttpFetcher::new(&config)?);
            let mut overlay = RoomOverlay::new(&room, timeline, &config, cache.clone(), fetcher);

            // 显式指定语言时不恢复保存的语言
            match lang.filter(|lang| !lang.is_empty() && *lang != config.display_language) {
                Some(lang) => {
                    if !config.is_offered_language(&lang) {
                        tracing::warn!("语言 {} 不在选择器列表中", lang);
                    }
                    overlay.control.select_language(&lang);
                }
                None => {
                    overlay.control.mount().await;
                }
            }
            let report = overlay.worker.run_pending().await;

            for failure in overlay.drain_failures() {
                tracing::warn!("{}: {}", failure.kind, failure.error);
            }
            tracing::info!(
                "翻译 {} 条，跳过自己 {} 条，失败 {} 条，缓存命中率 {:.0}%",
                report.translated,
                report.skipped_own,
                report.failed(),
                cache.stats().hit_rate() * 100.0
            );

            write_output(output.as_ref(), &overlay.timeline.to_html()?)?;
        }
    }

    Ok(())
}

fn init_tracing(cli_level: Option<&str>) {
    let level = cli_level
        .map(str::to_string)
        .or_else(|| LogLevel::get().ok())
        .unwrap_or_else(|| "info".to_string());

    let filter = EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(!NoColor::get_or_default(false))
        .init();
}

fn load_config(path: Option<&PathBuf>) -> Result<TranslationConfig, Box<dyn std::error::Error>> {
    let manager = match path {
        Some(path) => ConfigManager::from_path(path)?,
        None => ConfigManager::new()?,
    };
    Ok(manager.into_config())
}

fn open_cache(
    store: Option<&PathBuf>,
    config: &TranslationConfig,
) -> Result<TranslationCache, Box<dyn std::error::Error>> {
    let path = store.cloned().unwrap_or_else(|| config.store_path());
    let store = RedbStore::open(&path)?;
    Ok(TranslationCache::new(Arc::new(store)))
}

fn read_input(input: Option<&PathBuf>) -> io::Result<String> {
    match input {
        Some(path) => fs::read_to_string(path),
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Ok(buffer)
        }
    }
}

fn write_output(output: Option<&PathBuf>, html: &str) -> io::Result<()> {
    match output {
        Some(path) => fs::write(path, html),
        None => {
            let mut stdout = io::stdout();
            stdout.write_all(html.as_bytes())?;
            stdout.flush()
        }
    }
}
