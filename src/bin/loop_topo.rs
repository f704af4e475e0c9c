//! 冗余环网仿真
//!
//! 以 root 运行：构建 12 主机/12 交换机环网，连接远端控制器，设置 OpenFlow 版本后进入交互命令行。

use std::fs::OpenOptions;
use std::io;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;

use clap::Parser;
use loopnet_rs::app::{self, RunOutcome};
use loopnet_rs::config::RunConfig;
use loopnet_rs::emu::OpenFlowVersion;
use loopnet_rs::exec::{CommandRunner, RecordingRunner, SystemRunner, is_root};
use loopnet_rs::topo::Delay;
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(
    name = "loop-topo",
    about = "Emulate the redundant-path loop topology on Open vSwitch with a remote controller"
)]
struct Args {
    /// JSON run configuration; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    controller_ip: Option<Ipv4Addr>,

    #[arg(long)]
    controller_port: Option<u16>,

    /// Link bandwidth in Mbit/s
    #[arg(long)]
    bw_mbit: Option<u32>,

    /// Link delay, e.g. 25ms
    #[arg(long)]
    delay: Option<Delay>,

    /// OpenFlow version pinned on every switch
    #[arg(long)]
    protocol: Option<OpenFlowVersion>,

    /// Log file (appended)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Emulate a topology descriptor (JSON) instead of the loop mesh
    #[arg(long)]
    topology_json: Option<PathBuf>,

    /// Run the all-pairs ping test after startup
    #[arg(long)]
    ping: bool,

    /// Run the iperf test after startup
    #[arg(long)]
    iperf: bool,

    /// Do not enter the interactive CLI
    #[arg(long)]
    no_cli: bool,

    /// Log the commands instead of executing them
    #[arg(long)]
    dry_run: bool,
}

impl Args {
    fn apply(&self, cfg: &mut RunConfig) {
        if let Some(ip) = self.controller_ip {
            cfg.controller.ip = ip;
        }
        if let Some(port) = self.controller_port {
            cfg.controller.port = port;
        }
        if let Some(bw) = self.bw_mbit {
            cfg.link.bw_mbit = bw;
        }
        if let Some(delay) = self.delay {
            cfg.link.delay = delay;
        }
        if let Some(protocol) = self.protocol {
            cfg.protocol = protocol;
        }
        if let Some(path) = &self.log_file {
            cfg.log_file = path.clone();
        }
        if let Some(path) = &self.topology_json {
            cfg.topology_file = Some(path.clone());
        }
        cfg.ping |= self.ping;
        cfg.iperf |= self.iperf;
        if self.no_cli {
            cfg.cli = false;
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let mut cfg = match &args.config {
        Some(path) => match RunConfig::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("{e}");
                return ExitCode::FAILURE;
            }
        },
        None => RunConfig::default(),
    };
    args.apply(&mut cfg);

    let log_file = match OpenOptions::new()
        .create(true)
        .append(true)
        .open(&cfg.log_file)
    {
        Ok(f) => f,
        Err(e) => {
            eprintln!("open log file {}: {e}", cfg.log_file.display());
            return ExitCode::FAILURE;
        }
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(Mutex::new(log_file))
        .with_ansi(false)
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .init();

    let mut system = SystemRunner::new();
    let mut recording = RecordingRunner::new().echoing();
    let runner: &mut dyn CommandRunner = if args.dry_run {
        &mut recording
    } else {
        &mut system
    };

    let stdin = io::stdin();
    match app::run(&cfg, is_root(), runner, stdin.lock(), io::stdout()) {
        Ok(RunOutcome::NotRoot) => ExitCode::SUCCESS,
        Ok(RunOutcome::Completed { pinned, .. }) => {
            info!(pinned, "done");
            if args.dry_run {
                println!(
                    "dry-run: {} commands, {} background",
                    recording.commands().len(),
                    recording.spawned().len()
                );
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "run failed");
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
