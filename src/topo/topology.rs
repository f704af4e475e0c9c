//! 静态拓扑图
//!
//! 保存主机、交换机和带参数的无向链路。拓扑构建完成后交给仿真引擎，之后不再修改。

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace};

use super::delay::Delay;

/// 节点类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Host,
    Switch,
}

impl NodeKind {
    /// 第一个端口号：主机从 eth0 开始，交换机从 eth1 开始
    fn first_port(self) -> u16 {
        match self {
            NodeKind::Host => 0,
            NodeKind::Switch => 1,
        }
    }
}

/// 链路参数：带宽（Mbit/s）与单向时延
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkParams {
    pub bw_mbit: u32,
    pub delay: Delay,
}

impl Default for LinkParams {
    fn default() -> Self {
        Self {
            bw_mbit: 25,
            delay: Delay::from_millis(25),
        }
    }
}

/// 无向链路，两端各占用所在节点的一个端口
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub a: String,
    pub b: String,
    pub port_a: u16,
    pub port_b: u16,
    pub params: LinkParams,
}

impl Link {
    pub fn intf_a(&self) -> String {
        intf_name(&self.a, self.port_a)
    }

    pub fn intf_b(&self) -> String {
        intf_name(&self.b, self.port_b)
    }

    /// 是否连接了给定的两个节点（不区分方向）
    pub fn joins(&self, x: &str, y: &str) -> bool {
        (self.a == x && self.b == y) || (self.a == y && self.b == x)
    }
}

/// 内核接口名最长 15 字节（IFNAMSIZ - 1）
pub const MAX_INTF_LEN: usize = 15;

/// 节点名最长 8 字节：`<node>-eth<port>` 在端口号不超过 999 时不超过 [`MAX_INTF_LEN`]
pub const MAX_NODE_NAME_LEN: usize = 8;

/// 节点名会出现在 root 执行的 shell 命令、netns 名和接口名里，只允许 `[A-Za-z0-9_]`
pub fn validate_node_name(name: &str) -> Result<(), TopoError> {
    let ok = !name.is_empty()
        && name.len() <= MAX_NODE_NAME_LEN
        && name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_');
    if ok {
        Ok(())
    } else {
        Err(TopoError::InvalidName(name.to_string()))
    }
}

/// 接口名：`<node>-eth<port>`
pub fn intf_name(node: &str, port: u16) -> String {
    format!("{node}-eth{port}")
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TopoError {
    #[error("invalid node name {0:?}: expected 1-8 characters from [A-Za-z0-9_]")]
    InvalidName(String),
    #[error("interface name {0:?} exceeds 15 bytes")]
    IntfTooLong(String),
    #[error("node {0:?} is already registered")]
    DuplicateNode(String),
    #[error("node {0:?} is not registered")]
    UnknownNode(String),
    #[error("switch index {0} is outside the registered switches")]
    UnknownSwitchIndex(usize),
    #[error("node count must be greater than zero")]
    InvalidCount,
    #[error("no hosts or switches registered yet")]
    NotPopulated,
}

/// 拓扑描述（JSON 格式）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyDesc {
    pub hosts: Vec<String>,
    pub switches: Vec<String>,
    #[serde(default)]
    pub links: Vec<LinkDesc>,
}

/// 描述文件中的链路；端口号由加载时重新分配
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkDesc {
    pub a: String,
    pub b: String,
    #[serde(flatten)]
    pub params: LinkParams,
}

/// 静态拓扑
#[derive(Debug, Clone, Default)]
pub struct Topology {
    hosts: Vec<String>,
    switches: Vec<String>,
    kinds: HashMap<String, NodeKind>,
    next_port: HashMap<String, u16>,
    links: Vec<Link>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加主机节点
    pub fn add_host(&mut self, name: impl Into<String>) -> Result<(), TopoError> {
        let name = self.register(name.into(), NodeKind::Host)?;
        self.hosts.push(name);
        Ok(())
    }

    /// 添加交换机节点
    pub fn add_switch(&mut self, name: impl Into<String>) -> Result<(), TopoError> {
        let name = self.register(name.into(), NodeKind::Switch)?;
        self.switches.push(name);
        Ok(())
    }

    fn register(&mut self, name: String, kind: NodeKind) -> Result<String, TopoError> {
        validate_node_name(&name)?;
        if self.kinds.contains_key(&name) {
            return Err(TopoError::DuplicateNode(name));
        }
        trace!(node = %name, ?kind, "注册节点");
        self.kinds.insert(name.clone(), kind);
        self.next_port.insert(name.clone(), kind.first_port());
        Ok(name)
    }

    /// 连接两个已注册的节点（无向链路）
    pub fn add_link(&mut self, a: &str, b: &str, params: LinkParams) -> Result<&Link, TopoError> {
        for end in [a, b] {
            if !self.kinds.contains_key(end) {
                return Err(TopoError::UnknownNode(end.to_string()));
            }
        }
        // 端口号超过 999 时接口名会超长
        for end in [a, b] {
            let next = self.next_port.get(end).copied().unwrap_or_default();
            let intf = intf_name(end, next);
            if intf.len() > MAX_INTF_LEN {
                return Err(TopoError::IntfTooLong(intf));
            }
        }
        let port_a = self.take_port(a);
        let port_b = self.take_port(b);
        debug!(a, b, port_a, port_b, bw_mbit = params.bw_mbit, delay = %params.delay, "添加链路");
        self.links.push(Link {
            a: a.to_string(),
            b: b.to_string(),
            port_a,
            port_b,
            params,
        });
        Ok(&self.links[self.links.len() - 1])
    }

    fn take_port(&mut self, node: &str) -> u16 {
        let slot = self.next_port.entry(node.to_string()).or_default();
        let port = *slot;
        *slot = slot.saturating_add(1);
        port
    }

    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    pub fn switches(&self) -> &[String] {
        &self.switches
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn kind(&self, node: &str) -> Option<NodeKind> {
        self.kinds.get(node).copied()
    }

    /// 节点的所有连接：(本端接口, 对端接口)，按端口顺序
    pub fn connections(&self, node: &str) -> Vec<(String, String)> {
        let mut ends: Vec<(u16, String, String)> = Vec::new();
        for link in &self.links {
            if link.a == node {
                ends.push((link.port_a, link.intf_a(), link.intf_b()));
            }
            if link.b == node {
                ends.push((link.port_b, link.intf_b(), link.intf_a()));
            }
        }
        ends.sort_by_key(|(port, _, _)| *port);
        ends.into_iter().map(|(_, own, peer)| (own, peer)).collect()
    }

    pub fn to_desc(&self) -> TopologyDesc {
        TopologyDesc {
            hosts: self.hosts.clone(),
            switches: self.switches.clone(),
            links: self
                .links
                .iter()
                .map(|l| LinkDesc {
                    a: l.a.clone(),
                    b: l.b.clone(),
                    params: l.params,
                })
                .collect(),
        }
    }

    /// 从描述重建拓扑；逐个调用 add_*，因此所有约束照常检查
    pub fn from_desc(desc: &TopologyDesc) -> Result<Topology, TopoError> {
        let mut topo = Topology::new();
        for h in &desc.hosts {
            topo.add_host(h.as_str())?;
        }
        for s in &desc.switches {
            topo.add_switch(s.as_str())?;
        }
        for l in &desc.links {
            topo.add_link(&l.a, &l.b, l.params)?;
        }
        Ok(topo)
    }
}
