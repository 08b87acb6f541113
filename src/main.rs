use chrono::Local; // 日志时间戳
use clap::{Parser, Subcommand, ValueEnum};
use env_logger::{Env, Target};
use std::io::Write; // env_logger 自定义格式需要
use std::path::PathBuf;
use std::sync::Arc;

use uigf_notion_sync::{
    config::Config,
    external::NotionApi,
    models::UigfVersion,
    services::{DuplicateService, ExportService, ImportService, ItemMasterService, SyncClient},
    utils::TokioDelay,
};

#[derive(Parser)]
#[command(version, about = "Sync UIGF gacha history with Notion databases")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 导入 UIGF 3.0 / 4.x 文件到抽卡记录数据库
    Import {
        file: PathBuf,
        /// 导入后跳过重复检查
        #[arg(long)]
        skip_validation: bool,
    },
    /// 将抽卡记录数据库导出为 UIGF
    Export {
        #[arg(long, value_enum, default_value_t = ExportVersion::V4_1)]
        version: ExportVersion,
    },
    /// 标记 Item ID 重复的记录
    Validate,
    /// 为 UIGF 文件中出现的物品注册物品主数据
    RegisterItems { file: PathBuf },
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportVersion {
    #[value(name = "3.0")]
    V3_0,
    #[value(name = "4.1")]
    V4_1,
}

impl From<ExportVersion> for UigfVersion {
    fn from(v: ExportVersion) -> Self {
        match v {
            ExportVersion::V3_0 => UigfVersion::V3,
            ExportVersion::V4_1 => UigfVersion::V4,
        }
    }
}

fn init_logger() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env 是可选的
    let _ = dotenvy::dotenv();
    init_logger();
    let cli = Cli::parse();

    let config = Config::from_toml().map_err(|e| anyhow::anyhow!("failed to load configuration: {e}"))?;
    let api = NotionApi::new(config.notion.clone())?;
    let client = SyncClient::new(Arc::new(api), Arc::new(TokioDelay), &config);

    match cli.command {
        Command::Import {
            file,
            skip_validation,
        } => {
            let report = ImportService::new(client, &config)
                .import_file(&file, skip_validation)
                .await?;
            if report.limit_reached {
                log::warn!(
                    "Stopped at the import limit: {} written, {} remaining",
                    report.written,
                    report.remaining
                );
            }
            log::info!("Import report: {}", serde_json::to_string(&report)?);
        }
        Command::Export { version } => {
            let paths = ExportService::new(client, &config)
                .export(version.into())
                .await?;
            for path in paths {
                log::info!("Wrote {}", path.display());
            }
        }
        Command::Validate => {
            let report = DuplicateService::new(client).validate().await;
            log::info!("Validation report: {}", serde_json::to_string(&report)?);
        }
        Command::RegisterItems { file } => {
            let count = ItemMasterService::new(client, &config)
                .register_from_history(&file)
                .await?;
            log::info!("Registered {} new item master entries", count);
        }
    }

    Ok(())
}
