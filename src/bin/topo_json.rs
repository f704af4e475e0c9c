//! 输出环网拓扑的 JSON 描述（不需要 root）

use std::process::ExitCode;

use clap::Parser;
use loopnet_rs::topo::loop_mesh::{LoopTopo, LoopTopoOpts, MESH_SIZE};
use loopnet_rs::topo::{Delay, LinkParams};

#[derive(Debug, Parser)]
#[command(name = "topo-json", about = "Print the loop topology descriptor as JSON")]
struct Args {
    #[arg(long, default_value_t = MESH_SIZE)]
    nodes: usize,
    /// Link bandwidth in Mbit/s
    #[arg(long, default_value_t = 25)]
    bw_mbit: u32,
    /// Link delay, e.g. 25ms
    #[arg(long, default_value = "25ms")]
    delay: Delay,
    #[arg(long)]
    pretty: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    let args = Args::parse();
    let opts = LoopTopoOpts {
        nodes: args.nodes,
        link: LinkParams {
            bw_mbit: args.bw_mbit,
            delay: args.delay,
        },
    };

    let topo = match LoopTopo::build(&opts) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("build topology: {e}");
            return ExitCode::FAILURE;
        }
    };
    let desc = topo.topology().to_desc();
    let json = if args.pretty {
        serde_json::to_string_pretty(&desc)
    } else {
        serde_json::to_string(&desc)
    };
    match json {
        Ok(s) => {
            println!("{s}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("serialize topology: {e}");
            ExitCode::FAILURE
        }
    }
}
