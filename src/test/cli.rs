use crate::cli::{self, Command, PROMPT};
use crate::emu::{Controller, EmuNet};
use crate::exec::{CmdOutput, RecordingRunner};
use crate::topo::loop_mesh::{LoopTopo, LoopTopoOpts};

fn run_script(script: &str, runner: &mut RecordingRunner) -> String {
    let topo = LoopTopo::build(&LoopTopoOpts::default())
        .expect("build loop topo")
        .into_topology();
    let mut net = EmuNet::new(topo, Controller::default(), runner);
    net.start().expect("start");
    let mut out: Vec<u8> = Vec::new();
    cli::run(&mut net, script.as_bytes(), &mut out).expect("cli");
    String::from_utf8(out).expect("utf8 output")
}

#[test]
fn parse_recognises_builtin_and_node_commands() {
    assert_eq!(Command::parse(""), Command::Empty);
    assert_eq!(Command::parse("  pingall "), Command::PingAll);
    assert_eq!(Command::parse("quit"), Command::Exit);
    assert_eq!(Command::parse("iperf"), Command::Iperf(None));
    assert_eq!(
        Command::parse("iperf h1 h4"),
        Command::Iperf(Some(("h1".into(), "h4".into())))
    );
    assert_eq!(Command::parse("sh ovs-vsctl show"), Command::Sh("ovs-vsctl show".into()));
    assert_eq!(
        Command::parse("h1 ping -c1 10.0.0.2"),
        Command::Node {
            node: "h1".into(),
            line: "ping -c1 10.0.0.2".into()
        }
    );
    assert_eq!(Command::parse("bogus"), Command::Unknown("bogus".into()));
    assert_eq!(Command::parse("iperf h1"), Command::Unknown("iperf h1".into()));
}

#[test]
fn cli_lists_nodes_and_links_then_exits() {
    let mut runner = RecordingRunner::new();
    let out = run_script("nodes\nlinks\nexit\nnodes\n", &mut runner);

    assert!(out.starts_with(PROMPT));
    assert!(out.contains("available nodes are:\nh1 h2 h3"));
    assert!(out.contains("s11 s12"));
    assert!(out.contains("s1-eth1<->h1-eth0 (25Mbit 25ms)"));
    // exit 之后的命令不再执行
    assert_eq!(out.matches("available nodes are").count(), 1);
}

#[test]
fn cli_runs_commands_on_hosts_and_switches() {
    let mut runner = RecordingRunner::new().with_responder(|cmd| match cmd.netns.as_deref() {
        Some(ns) => CmdOutput::ok(format!("hello from {ns}\n")),
        None => CmdOutput::ok("root\n"),
    });
    let out = run_script("h3 hostname\ns2 ovs-ofctl show s2\nghost ls\n", &mut runner);

    assert!(out.contains("hello from h3"));
    assert!(out.contains("root"));
    assert!(out.contains("*** Unknown command: ghost ls"));
    let last = runner.commands().last().expect("commands");
    assert_eq!(last.line, "ovs-ofctl show s2");
    assert_eq!(last.netns, None);
}

#[test]
fn cli_net_and_dump_show_wiring() {
    let mut runner = RecordingRunner::new();
    let out = run_script("net\ndump\n", &mut runner);
    assert!(out.contains("h1 h1-eth0:s1-eth1"));
    assert!(out.contains("s1 s1-eth1:h1-eth0 s1-eth2:s2-eth2 s1-eth3:s2-eth3"));
    assert!(out.contains("<Host h4: h4-eth0:10.0.0.4>"));
    assert!(out.contains("<OVSSwitch s7: controller=tcp:127.0.0.1:6633>"));
}

#[test]
fn cli_iperf_defaults_to_first_and_last_host() {
    let mut runner = RecordingRunner::new();
    let out = run_script("iperf\n", &mut runner);
    assert!(out.contains("testing TCP bandwidth between h1 and h12"));
    assert_eq!(runner.spawned().len(), 1);
    assert_eq!(runner.spawned()[0].netns.as_deref(), Some("h12"));
    assert_eq!(runner.count_matching("iperf -c 10.0.0.12 -t 5"), 1);
}

#[test]
fn cli_iperf_reuses_the_running_server() {
    let mut runner = RecordingRunner::new();
    let out = run_script("iperf\niperf\niperf h12 h1\n", &mut runner);
    assert_eq!(out.matches("testing TCP bandwidth").count(), 3);

    // h12 只启动一次服务端，h1 作为新的服务端另起一个
    let servers: Vec<Option<&str>> = runner
        .spawned()
        .iter()
        .map(|c| c.netns.as_deref())
        .collect();
    assert_eq!(servers, vec![Some("h12"), Some("h1")]);
    assert_eq!(runner.count_matching("iperf -c 10.0.0.12 -t 5"), 2);
    assert_eq!(runner.count_matching("iperf -c 10.0.0.1 -t 5"), 1);
}
