// SPDX-License-Identifier: GPL-3.0-or-later

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use ospf_flood::ospf::Scope;
use ospf_flood::sim::{Fabric, Topology};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Arg {
    #[arg(short, long, help = "Topology YAML file", default_value = "demos/ring.yaml")]
    config: PathBuf,

    #[arg(short, long, help = "Seconds to run, overrides the topology")]
    duration: Option<u64>,

    #[arg(short, long, help = "Tracing item, e.g. event:flooding or packet:ls-ack:send")]
    trace: Vec<String>,

    #[arg(short, long, help = "Print databases as JSON")]
    json: bool,
}

fn tracing_set() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> anyhow::Result<()> {
    let arg = Arg::parse();
    tracing_set();

    let yaml = std::fs::read_to_string(&arg.config)
        .with_context(|| format!("Can't read topology {}", arg.config.display()))?;
    let topo: Topology = serde_yaml::from_str(&yaml)
        .with_context(|| format!("Can't parse topology {}", arg.config.display()))?;

    let mut fabric = Fabric::from_topology(&topo)?;
    for router in fabric.routers.values_mut() {
        for item in arg.trace.iter() {
            if router.ospf.tracing.enable(item).is_none() {
                anyhow::bail!("Unknown tracing item {}", item);
            }
        }
    }
    fabric.originate_router_lsas()?;

    let duration = arg.duration.unwrap_or(topo.duration());
    tracing::info!(
        "ospf-flood: {} routers, {} links, loss {}, running {}s",
        topo.routers.len(),
        topo.links.len(),
        topo.loss,
        duration
    );
    fabric.run(duration);

    for (router_id, router) in fabric.routers.iter() {
        if !arg.json {
            println!("== {} ({} LSDB changes)", router_id, router.lsdb_changes);
        }
        let out = router
            .ospf
            .show("/show/ip/ospf/database", arg.json)
            .unwrap_or_default();
        println!("{}", out);
    }

    let scope = Scope::Area(fabric.area);
    let converged = fabric.converged();
    tracing::info!(
        "ospf-flood: {} in {}, delivered {} dropped {}",
        if converged { "converged" } else { "not converged" },
        scope,
        fabric.delivered,
        fabric.dropped
    );
    if !converged {
        std::process::exit(1);
    }
    Ok(())
}
