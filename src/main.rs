use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use notification_hub::notification::backends::TrayBackend;
use notification_hub::notification::rule::{Method, NotificationRule};
use notification_hub::notification::store::read_rules_file;
use notification_hub::{Entity, HubBuilder, HubConfig};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "nhub")]
#[command(about = "Notification Hub - 实体分发与通知聚合")]
#[command(version)]
struct Cli {
    /// 配置文件路径（默认 ~/.config/notification-hub/config.json）
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 回放 JSONL 格式的 Entity 文件，输出托盘状态
    Replay {
        /// 每行一个 Entity
        file: PathBuf,
        /// 覆盖配置中的规则文件
        #[arg(long)]
        rules: Option<PathBuf>,
    },
    /// 列出配置中加载的规则
    Rules {
        /// 输出 JSON 格式
        #[arg(long)]
        json: bool,
    },
    /// 校验规则文件
    CheckRules {
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // 通过 RUST_LOG 环境变量控制日志级别，默认为 info
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("notification_hub=info,nhub=info"));

    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => HubConfig::load_from(path)?,
        None => HubConfig::load()?,
    };

    match cli.command {
        Commands::Replay { file, rules } => replay(config, &file, rules).await?,
        Commands::Rules { json } => {
            let store = HubBuilder::new(config).load_rules()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&store.definitions())?);
            } else {
                println!("共 {} 条规则:\n", store.len());
                for rule in store.rules() {
                    print_rule(rule);
                }
            }
        }
        Commands::CheckRules { file } => check_rules(&file)?,
    }

    Ok(())
}

async fn replay(config: HubConfig, file: &Path, rules: Option<PathBuf>) -> Result<()> {
    let content = fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;

    let mut builder = HubBuilder::new(config);
    if let Some(rules) = rules {
        builder = builder.rules_file(rules);
    }
    let coordinator = builder.build()?;
    let sink = coordinator.sink();

    let mut submitted = 0;
    for (line_no, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match serde_json::from_str::<Entity>(line) {
            Ok(entity) => {
                sink.submit(entity);
                submitted += 1;
            }
            Err(e) => warn!(line = line_no + 1, error = %e, "Skipping malformed entity"),
        }
    }
    sink.shutdown();

    let mut coordinator = coordinator.run().await?;
    // Shutdown 之后排队的后续 Entity（例如计数广播）
    coordinator.drain();
    info!(submitted, "Replay finished");

    let Some(tray) = coordinator.handler().backend_as::<TrayBackend>(Method::Tray) else {
        bail!("tray backend not registered");
    };
    println!("{}", serde_json::to_string_pretty(&tray.snapshot())?);
    Ok(())
}

fn check_rules(file: &Path) -> Result<()> {
    let definitions = read_rules_file(file)?;

    let mut invalid = 0;
    for def in definitions {
        let name = def.name.clone();
        match NotificationRule::try_from(def) {
            Ok(rule) => print_rule(&rule),
            Err(e) => {
                invalid += 1;
                println!("  ✗ {}: {:#}", name, e);
            }
        }
    }

    if invalid > 0 {
        bail!("{} invalid rule(s) in {}", invalid, file.display());
    }
    println!("\n规则文件有效");
    Ok(())
}

fn print_rule(rule: &NotificationRule) {
    let methods: Vec<&str> = rule.methods.to_vec().iter().map(Method::as_str).collect();
    println!(
        "  {} | {}:{} | {}{}{}",
        rule.name,
        rule.category,
        rule.event_type,
        methods.join(","),
        if rule.single_shot { " | single-shot" } else { "" },
        if rule.enabled { "" } else { " | disabled" },
    );
}
