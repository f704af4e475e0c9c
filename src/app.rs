//! 进程入口流程
//!
//! 权限检查 -> 构建拓扑 -> 启动仿真网络 -> 固定 OpenFlow 版本 -> 打印主机连接
//! -> 可选的 ping/iperf -> 交互式命令行 -> 停止网络。

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::cli;
use crate::config::{ConfigError, RunConfig};
use crate::diag::{self, IperfOpts, IperfRun};
use crate::emu::{EmuError, EmuNet, PingReport, ovs};
use crate::exec::CommandRunner;
use crate::topo::loop_mesh::LoopTopo;
use crate::topo::{TopoError, Topology, TopologyDesc};

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Topo(#[from] TopoError),
    #[error(transparent)]
    Emu(#[from] EmuError),
    #[error("read topology {path}: {source}")]
    TopologyRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("parse topology {path}: {source}")]
    TopologyParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("write output: {0}")]
    Io(#[from] io::Error),
}

/// 一次运行的结果
#[derive(Debug)]
pub enum RunOutcome {
    /// 非 root：什么都没做
    NotRoot,
    Completed {
        /// 发出的协议版本设置命令数
        pinned: usize,
        ping: Option<PingReport>,
        iperf: Vec<IperfRun>,
    },
}

/// 从 JSON 描述文件加载拓扑
pub fn load_topology_file(path: &Path) -> Result<Topology, AppError> {
    let raw = fs::read_to_string(path).map_err(|source| AppError::TopologyRead {
        path: path.to_path_buf(),
        source,
    })?;
    let desc: TopologyDesc =
        serde_json::from_str(&raw).map_err(|source| AppError::TopologyParse {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(Topology::from_desc(&desc)?)
}

/// 按配置构建拓扑：有描述文件时用描述文件，否则是内置环网
pub fn build_topology(cfg: &RunConfig) -> Result<Topology, AppError> {
    match &cfg.topology_file {
        Some(path) => load_topology_file(path),
        None => Ok(LoopTopo::build(&cfg.topo_opts())?.into_topology()),
    }
}

/// 完整的运行流程。`privileged` 为 false 时只记录警告，不执行任何命令。
pub fn run<R: BufRead, W: Write>(
    cfg: &RunConfig,
    privileged: bool,
    runner: &mut dyn CommandRunner,
    input: R,
    mut out: W,
) -> Result<RunOutcome, AppError> {
    if !privileged {
        warn!("You are NOT root");
        return Ok(RunOutcome::NotRoot);
    }

    let topo = build_topology(cfg)?;
    let mut net = EmuNet::new(topo, cfg.controller.clone(), runner);
    if let Err(e) = net.start() {
        error!(error = %e, "启动仿真网络失败，清理已创建的部分");
        net.stop();
        return Err(e.into());
    }

    let result = session(cfg, &mut net, input, &mut out);
    net.stop();
    result
}

fn session<R: BufRead, W: Write>(
    cfg: &RunConfig,
    net: &mut EmuNet<'_>,
    input: R,
    out: &mut W,
) -> Result<RunOutcome, AppError> {
    let switches = net.topology().switches().to_vec();
    let pinned = ovs::pin_protocols(&switches, net.runner(), cfg.protocol);
    info!(pinned, protocol = %cfg.protocol, "OpenFlow 版本已设置");

    debug!("dumpNode");
    writeln!(out, "Dumping host connections")?;
    let hosts = net.topology().hosts().to_vec();
    for line in net.dump_node_connections(&hosts) {
        writeln!(out, "{line}")?;
    }

    let ping = if cfg.ping {
        let report = diag::ping_test(net)?;
        writeln!(out, "{report}")?;
        Some(report)
    } else {
        None
    };

    let iperf = if cfg.iperf {
        let runs = diag::iperf_test(net, &IperfOpts::default())?;
        for run in &runs {
            writeln!(out, "*** {} : {}", run.client, run.command)?;
            write!(out, "{}", run.output)?;
        }
        runs
    } else {
        Vec::new()
    };

    if cfg.cli {
        cli::run(net, input, &mut *out)?;
    }

    Ok(RunOutcome::Completed {
        pinned,
        ping,
        iperf,
    })
}
