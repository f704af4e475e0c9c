//! 冗余环网拓扑构建
//!
//! 交换机 s1..s12 各挂一台同序号的主机 h1..h12。交换机之间按固定边表互连，中间是一个
//! s2-s3-s4-s8-s10-s11-s12 的环，因此环两侧的主机之间存在两条独立路径：
//!
//! ```text
//!            s1
//!            |
//!     s12 -- s2 -- s3
//!      |             |
//!     s11            s4 -- s5
//!      |             |
//!     s10 ---------- s8 -- s9
//!                    |
//!                    s7 -- s6
//! ```

use tracing::info;

use super::topology::{LinkParams, TopoError, Topology};

/// 环网中的节点数
pub const MESH_SIZE: usize = 12;

/// 交换机互连边表（1-based 交换机序号）。
///
/// 按原样保留：每个元组各生成一条链路，两个方向的元组不合并。
pub const SWITCH_MESH_EDGES: [(usize, usize); 24] = [
    (1, 2),
    (2, 1),
    (2, 3),
    (2, 12),
    (3, 2),
    (3, 4),
    (4, 3),
    (4, 5),
    (4, 8),
    (5, 4),
    (6, 7),
    (7, 6),
    (7, 8),
    (8, 4),
    (8, 7),
    (8, 9),
    (8, 10),
    (9, 8),
    (10, 8),
    (10, 11),
    (11, 10),
    (11, 12),
    (12, 2),
    (12, 11),
];

/// 环网拓扑配置选项
#[derive(Debug, Clone)]
pub struct LoopTopoOpts {
    pub nodes: usize,
    pub link: LinkParams,
}

impl Default for LoopTopoOpts {
    fn default() -> Self {
        Self {
            nodes: MESH_SIZE,
            link: LinkParams::default(),
        }
    }
}

/// 环网拓扑；主机和交换机列表属于各自的实例
#[derive(Debug, Clone, Default)]
pub struct LoopTopo {
    topo: Topology,
    hosts: Vec<String>,
    switches: Vec<String>,
}

impl LoopTopo {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按顺序执行 add_nodes、add_host_links、add_switch_mesh
    pub fn build(opts: &LoopTopoOpts) -> Result<LoopTopo, TopoError> {
        let mut topo = LoopTopo::new();
        topo.add_nodes(opts.nodes)?;
        topo.add_host_links(opts.link)?;
        topo.add_switch_mesh(opts.link)?;
        info!(
            hosts = topo.hosts.len(),
            switches = topo.switches.len(),
            links = topo.topo.links().len(),
            "环网拓扑构建完成"
        );
        Ok(topo)
    }

    /// 注册 h1..hN 与 s1..sN（N = count），主机与交换机交替注册
    pub fn add_nodes(&mut self, count: usize) -> Result<(), TopoError> {
        if count == 0 {
            return Err(TopoError::InvalidCount);
        }
        for i in 1..=count {
            let host = format!("h{i}");
            let switch = format!("s{i}");
            self.topo.add_host(host.as_str())?;
            self.topo.add_switch(switch.as_str())?;
            self.hosts.push(host);
            self.switches.push(switch);
        }
        Ok(())
    }

    /// 第 i 台交换机连接第 i 台主机
    pub fn add_host_links(&mut self, params: LinkParams) -> Result<(), TopoError> {
        if self.hosts.is_empty() || self.switches.is_empty() {
            return Err(TopoError::NotPopulated);
        }
        for (switch, host) in self.switches.iter().zip(&self.hosts) {
            self.topo.add_link(switch, host, params)?;
        }
        Ok(())
    }

    /// 按 [`SWITCH_MESH_EDGES`] 连接交换机。任何一条边的端点不存在时一条链路也不添加。
    pub fn add_switch_mesh(&mut self, params: LinkParams) -> Result<(), TopoError> {
        for &(x, y) in SWITCH_MESH_EDGES.iter() {
            self.switch_at(x)?;
            self.switch_at(y)?;
        }
        for &(x, y) in SWITCH_MESH_EDGES.iter() {
            let a = self.switch_at(x)?.to_string();
            let b = self.switch_at(y)?.to_string();
            self.topo.add_link(&a, &b, params)?;
        }
        Ok(())
    }

    fn switch_at(&self, index: usize) -> Result<&str, TopoError> {
        index
            .checked_sub(1)
            .and_then(|i| self.switches.get(i))
            .map(String::as_str)
            .ok_or(TopoError::UnknownSwitchIndex(index))
    }

    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    pub fn switches(&self) -> &[String] {
        &self.switches
    }

    pub fn topology(&self) -> &Topology {
        &self.topo
    }

    pub fn into_topology(self) -> Topology {
        self.topo
    }
}
