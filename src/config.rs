//! 运行配置
//!
//! JSON 配置文件，所有字段都有默认值；命令行参数在此基础上覆盖。

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::emu::{Controller, OpenFlowVersion};
use crate::topo::LinkParams;
use crate::topo::loop_mesh::{LoopTopoOpts, MESH_SIZE};

pub const DEFAULT_LOG_FILE: &str = "./fattree.log";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// 主机/交换机数量
    pub nodes: usize,
    pub link: LinkParams,
    pub controller: Controller,
    pub protocol: OpenFlowVersion,
    pub log_file: PathBuf,
    /// 用 JSON 拓扑描述代替内置环网
    pub topology_file: Option<PathBuf>,
    /// 启动后运行全连通 ping
    pub ping: bool,
    /// 启动后运行 iperf 测试
    pub iperf: bool,
    /// 进入交互式命令行
    pub cli: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            nodes: MESH_SIZE,
            link: LinkParams::default(),
            controller: Controller::default(),
            protocol: OpenFlowVersion::default(),
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            topology_file: None,
            ping: false,
            iperf: false,
            cli: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl RunConfig {
    pub fn load(path: &Path) -> Result<RunConfig, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn topo_opts(&self) -> LoopTopoOpts {
        LoopTopoOpts {
            nodes: self.nodes,
            link: self.link,
        }
    }
}
