//! vsphere-step - 命令行入口
//!
//! 加载配置与端点注册表，按 --server / --step 组装构建步骤容器并执行一次；中止时以非零退出码结束。

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use clap::Parser;
use vsphere_step::config::load_config;
use vsphere_step::connection::{Connector, MockConnector, RestConnector};
use vsphere_step::steps::{BuildStepRegistry, EnvVars, StdoutSink};
use vsphere_step::{observability, selectable_server_names, BuildStepContainer, ExecutionContext};

#[derive(Parser, Debug)]
#[command(name = "vsphere-step", about = "Run a vSphere build step against a configured cloud")]
struct Cli {
    /// 额外的配置文件（叠加在 config/default.toml 之上）
    #[arg(long)]
    config: Option<PathBuf>,

    /// 服务器名，或 ${VSPHERE_CLOUD_NAME} 从环境变量选择
    #[arg(long)]
    server: Option<String>,

    #[arg(long)]
    step: Option<String>,

    /// 步骤参数（JSON）
    #[arg(long, default_value = "{}")]
    args: String,

    /// 构建变量 KEY=VALUE，覆盖同名环境变量
    #[arg(long = "env", value_parser = parse_key_value)]
    env: Vec<(String, String)>,

    #[arg(long)]
    list_servers: bool,

    #[arg(long)]
    list_steps: bool,

    /// 使用 Mock 连接器，不访问 vCenter
    #[arg(long)]
    dry_run: bool,
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = load_config(cli.config.clone()).context("Failed to load config")?;
    observability::init(&cfg.logging.filter);

    let registry = Arc::new(cfg.registry().context("Invalid [[clouds]] configuration")?);
    let steps = BuildStepRegistry::with_builtin();

    if cli.list_servers {
        for name in selectable_server_names(registry.as_ref()) {
            println!("{name}");
        }
        return Ok(());
    }
    if cli.list_steps {
        for (kind, description) in steps.descriptions() {
            println!("{kind}\t{description}");
        }
        return Ok(());
    }

    let server = cli.server.as_deref().ok_or_else(|| anyhow!("--server is required"))?;
    let kind = cli.step.as_deref().ok_or_else(|| anyhow!("--step is required"))?;
    let args: serde_json::Value =
        serde_json::from_str(&cli.args).context("--args is not valid JSON")?;
    let step = steps.create(kind, args).map_err(|e| anyhow!(e))?;

    let connector: Arc<dyn Connector> = if cli.dry_run {
        Arc::new(MockConnector::new())
    } else {
        Arc::new(RestConnector::new(cfg.connection.request_timeout_secs))
    };

    let mut container = BuildStepContainer::new(step, server, registry, connector)
        .context("Invalid build step configuration")?;

    let mut ctx = ExecutionContext::new(EnvVars::from_process(), Arc::new(StdoutSink));
    if !cli.env.is_empty() {
        ctx = ctx.with_build_variables(cli.env.into_iter().collect::<HashMap<_, _>>());
    }

    let cancel = ctx.cancel.clone();
    tokio::spawn(async move {
        if let Ok(()) = tokio::signal::ctrl_c().await {
            tracing::info!("Received Ctrl+C, interrupting build step...");
            cancel.cancel();
        }
    });

    container.execute(&ctx).await.context("Build step aborted")?;
    Ok(())
}
