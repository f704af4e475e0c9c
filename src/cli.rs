//! 交互式命令行
//!
//! 网络启动后把控制权交给操作者。读取到 `exit`、`quit` 或输入结束时返回。

use std::collections::HashSet;
use std::io::{self, BufRead, Write};

use tracing::{debug, info};

use crate::emu::{EmuError, EmuNet};
use crate::exec::ShellCommand;
use crate::topo::NodeKind;

pub const PROMPT: &str = "loopnet> ";

const HELP: &str = "\
Documented commands:
  help                 show this message
  nodes                list all nodes
  net                  list node connections
  links                list links with bandwidth and delay
  dump                 show host addresses and switch controller
  pingall              ping between all hosts
  iperf [client srv]   TCP bandwidth test between two hosts (default: first and last host)
  sh <cmd>             run a shell command in the root namespace
  <node> <cmd>         run a command on a node
  exit | quit          leave the CLI";

/// iperf 命令默认的客户端运行时长
const CLI_IPERF_SECS: u32 = 5;

/// 解析后的一行命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Empty,
    Help,
    Nodes,
    Net,
    Links,
    Dump,
    PingAll,
    Iperf(Option<(String, String)>),
    Sh(String),
    Node { node: String, line: String },
    Exit,
    Unknown(String),
}

impl Command {
    pub fn parse(input: &str) -> Command {
        let input = input.trim();
        let (head, rest) = match input.split_once(char::is_whitespace) {
            Some((h, r)) => (h, r.trim()),
            None => (input, ""),
        };
        match head {
            "" => Command::Empty,
            "help" | "?" => Command::Help,
            "nodes" => Command::Nodes,
            "net" => Command::Net,
            "links" => Command::Links,
            "dump" => Command::Dump,
            "pingall" => Command::PingAll,
            "exit" | "quit" => Command::Exit,
            "iperf" => {
                let args: Vec<&str> = rest.split_whitespace().collect();
                match args.as_slice() {
                    [] => Command::Iperf(None),
                    [c, s] => Command::Iperf(Some((c.to_string(), s.to_string()))),
                    _ => Command::Unknown(input.to_string()),
                }
            }
            "sh" if !rest.is_empty() => Command::Sh(rest.to_string()),
            node if !rest.is_empty() => Command::Node {
                node: node.to_string(),
                line: rest.to_string(),
            },
            _ => Command::Unknown(input.to_string()),
        }
    }
}

/// 跨命令保留的状态
#[derive(Debug, Default)]
struct CliState {
    /// 已经在后台运行 `iperf -s` 的主机；每台主机只启动一个 TCP 服务端
    iperf_servers: HashSet<String>,
}

/// 运行交互循环
pub fn run<R: BufRead, W: Write>(net: &mut EmuNet<'_>, input: R, mut out: W) -> io::Result<()> {
    info!("*** Starting CLI");
    let mut state = CliState::default();
    let mut lines = input.lines();
    loop {
        write!(out, "{PROMPT}")?;
        out.flush()?;
        let Some(line) = lines.next() else {
            writeln!(out)?;
            break;
        };
        let cmd = Command::parse(&line?);
        debug!(?cmd, "cli command");
        if cmd == Command::Exit {
            break;
        }
        if let Err(e) = execute(net, &mut state, &cmd, &mut out)? {
            writeln!(out, "*** Error: {e}")?;
        }
    }
    info!("*** Leaving CLI");
    Ok(())
}

/// 外层 io::Result 表示输出失败，内层是命令本身的错误
fn execute<W: Write>(
    net: &mut EmuNet<'_>,
    state: &mut CliState,
    cmd: &Command,
    out: &mut W,
) -> io::Result<Result<(), EmuError>> {
    match cmd {
        Command::Empty | Command::Exit => {}
        Command::Help => writeln!(out, "{HELP}")?,
        Command::Nodes => {
            let topo = net.topology();
            let names: Vec<&str> = topo
                .hosts()
                .iter()
                .chain(topo.switches())
                .map(String::as_str)
                .collect();
            writeln!(out, "available nodes are:\n{}", names.join(" "))?;
        }
        Command::Net => {
            let topo = net.topology();
            let nodes: Vec<String> = topo.hosts().iter().chain(topo.switches()).cloned().collect();
            for line in net.dump_node_connections(&nodes) {
                writeln!(out, "{line}")?;
            }
        }
        Command::Links => {
            for link in net.topology().links() {
                writeln!(
                    out,
                    "{}<->{} ({}Mbit {})",
                    link.intf_a(),
                    link.intf_b(),
                    link.params.bw_mbit,
                    link.params.delay
                )?;
            }
        }
        Command::Dump => {
            for host in net.topology().hosts() {
                match net.host_ip(host) {
                    Ok(ip) => writeln!(out, "<Host {host}: {host}-eth0:{ip}>")?,
                    Err(e) => return Ok(Err(e)),
                }
            }
            let target = net.controller().target();
            for sw in net.topology().switches() {
                writeln!(out, "<OVSSwitch {sw}: controller={target}>")?;
            }
        }
        Command::PingAll => match net.ping_all(1) {
            Ok(report) => writeln!(out, "{report}")?,
            Err(e) => return Ok(Err(e)),
        },
        Command::Iperf(pair) => {
            let hosts = net.topology().hosts();
            let (client, server) = match pair {
                Some((c, s)) => (c.clone(), s.clone()),
                None => match (hosts.first(), hosts.last()) {
                    (Some(c), Some(s)) if c != s => (c.clone(), s.clone()),
                    _ => return Ok(Err(EmuError::TooFewHosts { need: 2, have: hosts.len() })),
                },
            };
            match iperf_pair(net, state, &client, &server) {
                Ok(text) => writeln!(out, "{text}")?,
                Err(e) => return Ok(Err(e)),
            }
        }
        Command::Sh(line) => match net.runner().run(&ShellCommand::root(line.as_str())) {
            Ok(res) => write!(out, "{}{}", res.stdout, res.stderr)?,
            Err(e) => return Ok(Err(e.into())),
        },
        Command::Node { node, line } => {
            let res = match net.topology().kind(node) {
                Some(NodeKind::Host) => net.host_cmd(node, line),
                // 交换机位于根命名空间
                Some(NodeKind::Switch) => net
                    .runner()
                    .run(&ShellCommand::root(line.as_str()))
                    .map_err(EmuError::from),
                None => {
                    writeln!(out, "*** Unknown command: {node} {line}")?;
                    return Ok(Ok(()));
                }
            };
            match res {
                Ok(res) => write!(out, "{}{}", res.stdout, res.stderr)?,
                Err(e) => return Ok(Err(e)),
            }
        }
        Command::Unknown(line) => writeln!(out, "*** Unknown command: {line}")?,
    }
    Ok(Ok(()))
}

fn iperf_pair(
    net: &mut EmuNet<'_>,
    state: &mut CliState,
    client: &str,
    server: &str,
) -> Result<String, EmuError> {
    let ip = net.host_ip(server)?;
    if !state.iperf_servers.contains(server) {
        net.host_popen(server, "iperf -s")?;
        state.iperf_servers.insert(server.to_string());
    } else {
        debug!(server, "iperf 服务端已在运行");
    }
    let res = net.host_cmd(client, &format!("iperf -c {ip} -t {CLI_IPERF_SECS}"))?;
    Ok(format!(
        "*** Iperf: testing TCP bandwidth between {client} and {server}\n{}",
        res.stdout
    ))
}
