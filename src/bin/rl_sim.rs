use clap::Parser;
use routerl_rs::controller::{ControllerChannel, ZmqChannel};
use routerl_rs::epoch::ReturnMode;
use routerl_rs::harness;
use routerl_rs::routing::StrategyKind;
use routerl_rs::sim::SimTime;
use routerl_rs::{Result, RouterError, SessionConfig};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(
    name = "rl-sim",
    about = "Run the RL routing coordination core against a controller"
)]
struct Args {
    /// Path to session config JSON
    #[arg(long)]
    config: PathBuf,

    /// Override strategy: convention, probabilistic, singlepath or multipath
    #[arg(long)]
    strategy: Option<String>,

    /// Override reward mode: global or distributed
    #[arg(long)]
    return_mode: Option<String>,

    /// Override number of steps per host
    #[arg(long)]
    total_steps: Option<u64>,

    /// Override controller address (host:port)
    #[arg(long)]
    controller: Option<String>,

    /// Answer every state report with the initial table instead of connecting
    #[arg(long)]
    offline: bool,

    /// Run until this time (ms); defaults to running until completion
    #[arg(long)]
    until_ms: Option<u64>,
}

fn load_config(args: &Args) -> Result<SessionConfig> {
    let raw = fs::read_to_string(&args.config)
        .map_err(|e| RouterError::Config(format!("read {}: {e}", args.config.display())))?;
    let mut cfg: SessionConfig =
        serde_json::from_str(&raw).map_err(|e| RouterError::Config(e.to_string()))?;

    if let Some(s) = &args.strategy {
        cfg.strategy = StrategyKind::parse(s).map_err(RouterError::Config)?;
    }
    if let Some(m) = &args.return_mode {
        cfg.return_mode = ReturnMode::parse(m).map_err(RouterError::Config)?;
    }
    if let Some(n) = args.total_steps {
        cfg.total_steps = n;
    }
    if let Some(addr) = &args.controller {
        cfg.controller.addr = addr.clone();
    }
    cfg.validate()?;
    Ok(cfg)
}

fn run(args: &Args) -> Result<()> {
    let cfg = load_config(args)?;
    info!(config = %args.config.display(), strategy = ?cfg.strategy, offline = args.offline, "⚙️  配置已加载");

    let channel: Box<dyn ControllerChannel> = if args.offline {
        Box::new(harness::offline_controller(&cfg)?)
    } else {
        Box::new(ZmqChannel::connect(
            &cfg.controller.addr,
            Duration::from_millis(cfg.controller.connect_timeout_ms),
            Duration::from_millis(cfg.controller.request_timeout_ms),
        )?)
    };

    let until = args.until_ms.map(SimTime::from_millis);
    let summary = harness::run(&cfg, channel, until)?;

    println!(
        "done @ {:?} sent={} delivered={} dropped={} ttl_expired={} state_reports={} closed_steps={}",
        summary.final_time,
        summary.stats.sent_pkts,
        summary.stats.delivered_pkts,
        summary.stats.dropped_pkts,
        summary.stats.ttl_expired_pkts,
        summary.state_reports,
        summary.closed_steps,
    );
    for r in &summary.rewards {
        println!(
            "step_reward step={} avg_delay={:.6} loss_rate={:.6} entities={}",
            r.step,
            r.avg_delay,
            r.loss_rate,
            r.entities.len()
        );
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "❌ 运行失败");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
