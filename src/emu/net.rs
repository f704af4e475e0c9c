//! 仿真网络
//!
//! 把 [`Topology`] 实例化：主机 -> netns，交换机 -> OVS bridge，链路 -> veth 对 + tc。

use std::collections::HashMap;
use std::net::Ipv4Addr;

use tracing::{debug, info, trace, warn};

use super::controller::Controller;
use super::ping::{PingReport, parse_ping};
use super::{EmuError, ovs, tc};
use crate::exec::{CmdOutput, CommandRunner, ShellCommand, run_checked};
use crate::topo::{Link, NodeKind, Topology};

/// 主机地址从 10.0.0.1 开始按主机顺序分配
const IP_BASE: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 0);
const PREFIX_LEN: u8 = 8;

/// 运行中的仿真网络
pub struct EmuNet<'r> {
    topo: Topology,
    controller: Controller,
    runner: &'r mut dyn CommandRunner,
    host_ips: HashMap<String, Ipv4Addr>,
    started: bool,
}

impl<'r> EmuNet<'r> {
    pub fn new(topo: Topology, controller: Controller, runner: &'r mut dyn CommandRunner) -> Self {
        let base = u32::from(IP_BASE);
        let host_ips = topo
            .hosts()
            .iter()
            .enumerate()
            .map(|(i, h)| (h.clone(), Ipv4Addr::from(base + i as u32 + 1)))
            .collect();
        Self {
            topo,
            controller,
            runner,
            host_ips,
            started: false,
        }
    }

    pub fn topology(&self) -> &Topology {
        &self.topo
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    pub fn runner(&mut self) -> &mut dyn CommandRunner {
        &mut *self.runner
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn host_ip(&self, host: &str) -> Result<Ipv4Addr, EmuError> {
        self.host_ips
            .get(host)
            .copied()
            .ok_or_else(|| EmuError::UnknownHost(host.to_string()))
    }

    /// 创建所有 bridge、命名空间和链路；任一命令失败即中止
    #[tracing::instrument(skip(self), fields(controller = %self.controller))]
    pub fn start(&mut self) -> Result<(), EmuError> {
        let target = self.controller.target();

        info!(switches = self.topo.switches().len(), "*** Adding switches");
        for sw in self.topo.switches().to_vec() {
            self.exec(ShellCommand::root(ovs::add_bridge(&sw, &target)))?;
        }

        info!(hosts = self.topo.hosts().len(), "*** Adding hosts");
        for host in self.topo.hosts().to_vec() {
            self.exec(ShellCommand::root(format!("ip netns add {host}")))?;
            self.exec(ShellCommand::on(&host, "ip link set lo up"))?;
        }

        info!(links = self.topo.links().len(), "*** Adding links");
        for link in self.topo.links().to_vec() {
            let (intf_a, intf_b) = (link.intf_a(), link.intf_b());
            self.exec(ShellCommand::root(format!(
                "ip link add {intf_a} type veth peer name {intf_b}"
            )))?;
            self.attach(&link, &link.a, link.port_a, &intf_a)?;
            self.attach(&link, &link.b, link.port_b, &intf_b)?;
        }

        self.started = true;
        info!("*** Network started");
        Ok(())
    }

    /// 把 veth 的一端挂到节点上并配置 tc
    fn attach(&mut self, link: &Link, node: &str, port: u16, intf: &str) -> Result<(), EmuError> {
        trace!(node, intf, "挂载接口");
        match self.topo.kind(node) {
            Some(NodeKind::Host) => {
                self.exec(ShellCommand::root(format!("ip link set {intf} netns {node}")))?;
                // 只有主机的第一个接口配置地址
                if port == 0 {
                    let ip = self.host_ip(node)?;
                    self.exec(ShellCommand::on(
                        node,
                        format!("ip addr add {ip}/{PREFIX_LEN} dev {intf}"),
                    ))?;
                }
                self.exec(ShellCommand::on(node, format!("ip link set {intf} up")))?;
                for line in tc::shape(intf, &link.params) {
                    self.exec(ShellCommand::on(node, line))?;
                }
            }
            Some(NodeKind::Switch) => {
                self.exec(ShellCommand::root(format!("ip link set {intf} up")))?;
                self.exec(ShellCommand::root(ovs::add_port(node, intf)))?;
                for line in tc::shape(intf, &link.params) {
                    self.exec(ShellCommand::root(line))?;
                }
            }
            None => return Err(EmuError::UnknownHost(node.to_string())),
        }
        Ok(())
    }

    fn exec(&mut self, cmd: ShellCommand) -> Result<CmdOutput, EmuError> {
        Ok(run_checked(&mut *self.runner, &cmd)?)
    }

    /// 清理网络；失败的命令只记录日志
    #[tracing::instrument(skip(self))]
    pub fn stop(&mut self) {
        info!("*** Stopping network");
        self.runner.kill_background();

        let mut teardown = Vec::new();
        for link in self.topo.links() {
            // 主机端的 veth 随命名空间一起删除
            if self.topo.kind(&link.a) == Some(NodeKind::Switch)
                && self.topo.kind(&link.b) == Some(NodeKind::Switch)
            {
                teardown.push(ShellCommand::root(format!("ip link del {}", link.intf_a())));
            }
        }
        for sw in self.topo.switches() {
            teardown.push(ShellCommand::root(ovs::del_bridge(sw)));
        }
        for host in self.topo.hosts() {
            teardown.push(ShellCommand::root(format!("ip netns del {host}")));
        }

        for cmd in teardown {
            match self.runner.run(&cmd) {
                Ok(out) if !out.success() => {
                    debug!(%cmd, status = ?out.status, "清理命令失败，忽略")
                }
                Err(e) => warn!(%cmd, error = %e, "清理命令无法执行"),
                Ok(_) => {}
            }
        }
        self.started = false;
    }

    fn ensure_host(&self, host: &str) -> Result<(), EmuError> {
        if !self.started {
            return Err(EmuError::NotStarted);
        }
        if self.topo.kind(host) != Some(NodeKind::Host) {
            return Err(EmuError::UnknownHost(host.to_string()));
        }
        Ok(())
    }

    /// 在主机上执行命令并等待结果
    pub fn host_cmd(&mut self, host: &str, line: &str) -> Result<CmdOutput, EmuError> {
        self.ensure_host(host)?;
        Ok(self.runner.run(&ShellCommand::on(host, line))?)
    }

    /// 在主机上后台启动命令
    pub fn host_popen(&mut self, host: &str, line: &str) -> Result<(), EmuError> {
        self.ensure_host(host)?;
        self.runner.spawn(&ShellCommand::on(host, line))?;
        Ok(())
    }

    /// 每个主机 ping 其余所有主机一次
    #[tracing::instrument(skip(self))]
    pub fn ping_all(&mut self, timeout_s: u32) -> Result<PingReport, EmuError> {
        let hosts = self.topo.hosts().to_vec();
        let mut report = PingReport::default();
        for src in &hosts {
            let mut line = format!("{src} ->");
            for dst in hosts.iter().filter(|d| *d != src) {
                let ip = self.host_ip(dst)?;
                let out = self.host_cmd(src, &format!("ping -c1 -W{timeout_s} {ip}"))?;
                // 无法解析时按发出 1 个、收到 0 个处理
                let (sent, received) = parse_ping(&out.stdout).unwrap_or((1, 0));
                report.sent += sent;
                report.received += received;
                line.push(' ');
                line.push_str(if received > 0 { dst } else { "X" });
            }
            debug!(%line, "ping 结果");
            report.lines.push(line);
        }
        info!(
            sent = report.sent,
            received = report.received,
            "*** Ping finished"
        );
        Ok(report)
    }

    /// 每个节点一行：`h1 h1-eth0:s1-eth1`
    pub fn dump_node_connections(&self, nodes: &[String]) -> Vec<String> {
        nodes
            .iter()
            .map(|node| {
                let mut line = node.clone();
                for (own, peer) in self.topo.connections(node) {
                    line.push_str(&format!(" {own}:{peer}"));
                }
                line
            })
            .collect()
    }
}
