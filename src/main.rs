use clap::Parser;
use std::fs;
use std::sync::Arc;

use query_context::config::Config;
use query_context::core::TaskId;
use query_context::query::{QueryContextManager, TaskUpdateRequest};
use query_context::utils::logging;

#[derive(Parser)]
#[clap(version = "0.1.0", author = "QueryContext Contributors")]
struct Cli {
    /// Worker configuration file
    #[clap(short, long)]
    config: Option<String>,

    /// Task to register, as `<taskId>=<request.json>`; may be repeated
    #[clap(short, long = "task", required = true)]
    tasks: Vec<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    logging::init(&config)?;

    let result = run(&cli, &config);
    logging::shutdown();
    result
}

fn run(cli: &Cli, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let manager = Arc::new(QueryContextManager::from_config(config)?);

    // 持有所有上下文直到输出结束
    let mut held = Vec::with_capacity(cli.tasks.len());
    for arg in &cli.tasks {
        let (task_text, request_path) = arg
            .split_once('=')
            .ok_or_else(|| format!("任务参数格式应为 <taskId>=<request.json>: {}", arg))?;
        let task_id = TaskId::parse(task_text)?;
        let request: TaskUpdateRequest = serde_json::from_str(&fs::read_to_string(request_path)?)?;

        let ctx = manager.find_or_create_query_ctx(&task_id, &request)?;
        println!("task {} -> query {}", task_id, ctx.query_id());
        held.push(ctx);
    }

    println!(
        "cached contexts: {} (capacity {})",
        manager.cache_size(),
        manager.cache_capacity()
    );
    manager.visit_all_contexts(|query_id, ctx| {
        println!(
            "  {} config_entries={} connectors={} spill_enabled={} created_at={}",
            query_id,
            ctx.config().len(),
            ctx.connector_configs().len(),
            ctx.config().spill_enabled(),
            ctx.created_at().to_rfc3339()
        );
    });

    let stats = manager.cache_stats();
    println!(
        "lookups: {} hits, {} misses",
        stats.total_hits, stats.total_misses
    );
    Ok(())
}
