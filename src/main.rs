use clap::{Parser, Subcommand};
use std::path::PathBuf;
use websync::config::AppConfig;
use websync::{commands, config, logging, AppContext};

/// websync - 将静态网站部署到 S3 兼容对象存储
#[derive(Parser)]
#[command(name = "websync", version, about = "将静态网站部署到 S3 兼容对象存储")]
struct Cli {
    /// 配置文件路径（默认 <配置目录>/websync/config.json）
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 列出所有桶
    ListBuckets,
    /// 列出桶内所有对象
    ListBucketObjects {
        /// 桶名
        bucket: String,
    },
    /// 创建桶并配置为静态网站托管
    SetupBucket {
        /// 桶名
        bucket: String,
    },
    /// 将本地目录同步到桶
    Sync {
        /// 本地目录
        pathname: PathBuf,
        /// 桶名
        bucket: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let app_config = match AppConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("配置加载失败: {:#}", e);
            std::process::exit(2);
        }
    };

    logging::init(&app_config.log, &config::app_dir());

    let ctx = AppContext::new(app_config);
    let code = match run(&cli.command, &ctx).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("错误: {:#}", e);
            1
        }
    };
    std::process::exit(code);
}

async fn run(command: &Command, ctx: &AppContext) -> anyhow::Result<i32> {
    match command {
        Command::ListBuckets => commands::bucket::list_buckets(ctx).await?,
        Command::ListBucketObjects { bucket } => {
            commands::bucket::list_bucket_objects(ctx, bucket).await?
        }
        Command::SetupBucket { bucket } => commands::bucket::setup_bucket(ctx, bucket).await?,
        Command::Sync { pathname, bucket } => {
            let report = commands::sync::run_sync(ctx, pathname, bucket).await?;
            // 有失败文件时以非零码退出
            if report.files_failed > 0 {
                return Ok(1);
            }
        }
    }
    Ok(0)
}
