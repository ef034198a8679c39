//! Briefing 命令行入口
//!
//! - `digest`：执行一次每日简报工作流，输出 JSON
//! - `query`：把一条自然语言查询路由到工具并回答
//! - `status`：输出各工具类别的初始化状态
//!
//! 连接器使用内置演示数据；未设置 OPENAI_API_KEY 时使用 Mock LLM。

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use briefing::llm::ConfiguredModelFactory;
use briefing::sources::{SourceConnector, SourceKind, StaticConnector};
use briefing::{load_config, observability, AppContext};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "briefing", about = "Personal work briefing agent", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Extra config file layered over config/default.toml
    #[arg(short, long, global = true, env = "BRIEFING_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the digest workflow once and print the result as JSON
    Digest,

    /// Answer a natural-language query with the relevant tools
    Query {
        /// The question to answer
        text: String,

        /// Conversation thread id
        #[arg(short, long, default_value = "default")]
        thread: String,

        /// Model id (defaults to [llm] model)
        #[arg(short, long)]
        model: Option<String>,

        /// Comma-separated tool categories, skipping automatic selection (e.g. mail,chat)
        #[arg(long, value_delimiter = ',')]
        tools: Option<Vec<String>>,
    },

    /// Print tool category statuses as JSON
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    observability::init(cli.verbose);

    let config = load_config(cli.config).context("Failed to load configuration")?;
    let models = Arc::new(ConfiguredModelFactory::new(config.llm.clone()));
    let connectors: Vec<Arc<dyn SourceConnector>> = SourceKind::ALL
        .into_iter()
        .map(|kind| Arc::new(StaticConnector::demo(kind)) as Arc<dyn SourceConnector>)
        .collect();

    let ctx = AppContext::new(config, connectors, models)
        .await
        .context("Failed to build application context")?;

    match cli.command {
        Commands::Digest => {
            let run = ctx.run_digest().await;
            println!("{}", serde_json::to_string_pretty(&run)?);
        }
        Commands::Query {
            text,
            thread,
            model,
            tools,
        } => {
            let answer = ctx
                .route_query(&text, Some(&thread), model.as_deref(), tools.as_deref())
                .await
                .context("Query failed")?;
            println!("{}", answer);
        }
        Commands::Status => {
            println!("{}", serde_json::to_string_pretty(&ctx.tool_statuses())?);
        }
    }

    Ok(())
}
