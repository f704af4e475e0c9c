use crate::diag::{self, IperfOpts};
use crate::emu::{Controller, EmuError, EmuNet, PingReport, parse_ping, tc};
use crate::exec::{CmdOutput, RecordingRunner};
use crate::topo::loop_mesh::{LoopTopo, LoopTopoOpts};
use crate::topo::{Delay, LinkParams, Topology};
use std::net::Ipv4Addr;

const PING_OK: &str = "\
PING 10.0.0.2 (10.0.0.2) 56(84) bytes of data.
64 bytes from 10.0.0.2: icmp_seq=1 ttl=64 time=101 ms

--- 10.0.0.2 ping statistics ---
1 packets transmitted, 1 received, 0% packet loss, time 0ms
";

const PING_LOST: &str = "\
--- 10.0.0.3 ping statistics ---
1 packets transmitted, 0 received, 100% packet loss, time 0ms
";

fn small_topo() -> Topology {
    let mut t = Topology::new();
    for h in ["h1", "h2", "h3"] {
        t.add_host(h).expect("add host");
    }
    t.add_switch("s1").expect("add switch");
    for h in ["h1", "h2", "h3"] {
        t.add_link("s1", h, LinkParams::default()).expect("link");
    }
    t
}

#[test]
fn start_builds_bridges_namespaces_and_shaped_links() {
    let topo = LoopTopo::build(&LoopTopoOpts::default())
        .expect("build loop topo")
        .into_topology();
    let mut runner = RecordingRunner::new();
    {
        let mut net = EmuNet::new(topo, Controller::default(), &mut runner);
        net.start().expect("start");
        assert!(net.is_started());
        assert_eq!(net.host_ip("h1").expect("ip"), Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(net.host_ip("h12").expect("ip"), Ipv4Addr::new(10, 0, 0, 12));
    }

    assert_eq!(runner.count_matching("add-br"), 12);
    assert_eq!(runner.count_matching("set-controller"), 12);
    assert_eq!(runner.count_matching("tcp:127.0.0.1:6633"), 12);
    assert_eq!(runner.count_matching("ip netns add"), 12);
    assert_eq!(runner.count_matching("type veth"), 36);
    // 每条链路两端各一套 htb + netem
    assert_eq!(runner.count_matching("htb rate 25Mbit"), 72);
    assert_eq!(runner.count_matching("netem delay 25ms"), 72);
    assert_eq!(runner.count_matching("ip addr add"), 12);

    let addr = runner
        .commands()
        .iter()
        .find(|c| c.line.starts_with("ip addr add 10.0.0.1/8"))
        .expect("h1 address command");
    assert_eq!(addr.netns.as_deref(), Some("h1"));
}

#[test]
fn start_aborts_on_first_failing_command() {
    let mut runner = RecordingRunner::new().with_responder(|cmd| {
        if cmd.line.starts_with("ip netns add") {
            CmdOutput {
                status: Some(1),
                stdout: String::new(),
                stderr: "Cannot create namespace".to_string(),
            }
        } else {
            CmdOutput::ok("")
        }
    });
    {
        let mut net = EmuNet::new(small_topo(), Controller::default(), &mut runner);
        let err = net.start().expect_err("start must fail");
        assert!(matches!(err, EmuError::Exec(_)), "{err}");
        assert!(!net.is_started());
    }
    assert_eq!(runner.count_matching("ip netns add"), 1);
    assert_eq!(runner.count_matching("type veth"), 0);
}

#[test]
fn host_commands_need_a_started_network() {
    let mut runner = RecordingRunner::new();
    let mut net = EmuNet::new(small_topo(), Controller::default(), &mut runner);
    assert!(matches!(net.host_cmd("h1", "true"), Err(EmuError::NotStarted)));
    net.start().expect("start");
    assert!(matches!(net.host_cmd("s1", "true"), Err(EmuError::UnknownHost(_))));
    assert!(matches!(net.host_ip("h9"), Err(EmuError::UnknownHost(_))));
    assert!(net.host_cmd("h1", "true").is_ok());
}

#[test]
fn ping_all_reports_unreachable_hosts() {
    let mut runner = RecordingRunner::new().with_responder(|cmd| {
        if cmd.line.starts_with("ping") && cmd.line.ends_with("10.0.0.3") {
            CmdOutput::ok(PING_LOST)
        } else if cmd.line.starts_with("ping") {
            CmdOutput::ok(PING_OK)
        } else {
            CmdOutput::ok("")
        }
    });
    let mut net = EmuNet::new(small_topo(), Controller::default(), &mut runner);
    net.start().expect("start");
    let report = diag::ping_test(&mut net).expect("ping");

    assert_eq!(report.sent, 6);
    assert_eq!(report.received, 4);
    assert_eq!(report.dropped(), 2);
    assert_eq!(
        report.lines,
        vec!["h1 -> h2 X", "h2 -> h1 X", "h3 -> h1 h2"]
    );
    assert!(report.to_string().ends_with("*** Results: 33% dropped (4/6 received)"));
}

#[test]
fn parse_ping_handles_missing_statistics() {
    assert_eq!(parse_ping(PING_OK), Some((1, 1)));
    assert_eq!(parse_ping(PING_LOST), Some((1, 0)));
    assert_eq!(parse_ping("connect: Network is unreachable"), None);
    assert_eq!(PingReport::default().drop_pct(), 0.0);
}

#[test]
fn iperf_test_starts_two_servers_and_runs_client_on_third_host() {
    let mut runner = RecordingRunner::new().with_responder(|cmd| {
        if cmd.line.starts_with("iperf -c") {
            CmdOutput::ok("[  3]  0.0-10.0 sec  23.8 MBytes  20.0 Mbits/sec\n")
        } else {
            CmdOutput::ok("")
        }
    });
    {
        let mut net = EmuNet::new(small_topo(), Controller::default(), &mut runner);
        net.start().expect("start");
        let runs = diag::iperf_test(&mut net, &IperfOpts::default()).expect("iperf");
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].client, "h3");
        assert_eq!(runs[0].server, "h1");
        assert_eq!(runs[0].command, "iperf -c 10.0.0.1 -u -t 10 -i 1 -b 20m");
        assert_eq!(runs[1].command, "iperf -c 10.0.0.2 -u -t 10 -i 1 -b 20m");
        assert!(runs[1].output.contains("20.0 Mbits/sec"));
        net.stop();
    }

    let spawned = runner.spawned();
    assert_eq!(spawned.len(), 2);
    assert_eq!(spawned[0].netns.as_deref(), Some("h1"));
    assert_eq!(
        spawned[0].line,
        "iperf -s -u -i 1 > iperf_server_differentPod_result"
    );
    assert_eq!(spawned[1].netns.as_deref(), Some("h2"));
    assert_eq!(spawned[1].line, "iperf -s -u -i 1 > iperf_server_samePod_result");
    assert_eq!(runner.killed(), 2);
}

#[test]
fn iperf_test_needs_three_hosts() {
    let mut t = Topology::new();
    t.add_host("h1").expect("add host");
    let mut runner = RecordingRunner::new();
    let mut net = EmuNet::new(t, Controller::default(), &mut runner);
    net.start().expect("start");
    assert!(matches!(
        diag::iperf_test(&mut net, &IperfOpts::default()),
        Err(EmuError::TooFewHosts { need: 3, have: 1 })
    ));
}

#[test]
fn stop_tears_down_bridges_namespaces_and_switch_veths() {
    let topo = LoopTopo::build(&LoopTopoOpts::default())
        .expect("build loop topo")
        .into_topology();
    let mut runner = RecordingRunner::new();
    {
        let mut net = EmuNet::new(topo, Controller::default(), &mut runner);
        net.start().expect("start");
        net.stop();
        assert!(!net.is_started());
    }
    assert_eq!(runner.count_matching("del-br"), 12);
    assert_eq!(runner.count_matching("ip netns del"), 12);
    assert_eq!(runner.count_matching("ip link del"), 24);
}

#[test]
fn dump_lists_host_interfaces() {
    let topo = LoopTopo::build(&LoopTopoOpts::default())
        .expect("build loop topo")
        .into_topology();
    let mut runner = RecordingRunner::new();
    let net = EmuNet::new(topo, Controller::default(), &mut runner);
    let lines = net.dump_node_connections(&["h1".to_string(), "h12".to_string()]);
    assert_eq!(lines, vec!["h1 h1-eth0:s1-eth1", "h12 h12-eth0:s12-eth1"]);
}

#[test]
fn tc_shaping_depends_on_params() {
    let both = tc::shape(
        "s1-eth1",
        &LinkParams {
            bw_mbit: 25,
            delay: Delay::from_millis(25),
        },
    );
    assert_eq!(both.len(), 3);
    assert!(both[1].ends_with("htb rate 25Mbit burst 15k"));
    assert!(both[2].ends_with("netem delay 25ms"));

    let delay_only = tc::shape(
        "h1-eth0",
        &LinkParams {
            bw_mbit: 0,
            delay: Delay::from_micros(500),
        },
    );
    assert_eq!(delay_only, vec!["tc qdisc replace dev h1-eth0 root handle 10: netem delay 500us"]);

    let none = tc::shape(
        "h1-eth0",
        &LinkParams {
            bw_mbit: 0,
            delay: Delay::ZERO,
        },
    );
    assert!(none.is_empty());
}
