//! Tunnel Manager entry point

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use ifupdown_addon_common::{
    load_interfaces, Addon, AddonFlags, CurrentState, InterfaceConfig, IpRoute2, Operation,
    DEFAULT_INTERFACES_FILE,
};
use ifupdown_tunnelmgr::TunnelMgr;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "tunnelmgr",
    version,
    about = "Create, remove and check GRE/IPIP/SIT/VTI tunnel interfaces"
)]
struct Cli {
    /// Interfaces file to read
    #[arg(short, long, default_value = DEFAULT_INTERFACES_FILE)]
    interfaces: PathBuf,

    /// Delete without checking that the interface exists first
    #[arg(long)]
    perfmode: bool,

    /// Log mutating commands instead of running them
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create tunnels, recreating those whose settings drifted
    Up {
        /// Interfaces to process (default: every tunnel stanza)
        names: Vec<String>,
    },
    /// Delete tunnels
    Down { names: Vec<String> },
    /// Compare configuration with the running state
    Check {
        names: Vec<String>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Print the underlay devices tunnels depend on
    Deps { names: Vec<String> },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Initialize tracing; RUST_LOG overrides -v
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Returns `Ok(false)` if any interface failed validation or drifted
fn run(cli: Cli) -> Result<bool> {
    let ifaces = load_interfaces(&cli.interfaces)
        .with_context(|| format!("Failed to load {}", cli.interfaces.display()))?;

    let flags = AddonFlags::default()
        .with_perfmode(cli.perfmode)
        .with_dryrun(cli.dry_run);
    let mut mgr = TunnelMgr::new(IpRoute2::new(flags), flags);

    match cli.command {
        Command::Up { names } => {
            let selected = select(&mgr, &ifaces, &names)?;
            Ok(run_hook(&mut mgr, Operation::PreUp, &selected))
        }
        Command::Down { names } => {
            let mut selected = select(&mgr, &ifaces, &names)?;
            selected.reverse();
            Ok(run_hook(&mut mgr, Operation::PostDown, &selected))
        }
        Command::Check { names, json } => {
            let selected = select(&mgr, &ifaces, &names)?;
            check(&mut mgr, &selected, json)
        }
        Command::Deps { names } => {
            for iface in select(&mgr, &ifaces, &names)? {
                if let Some(deps) = mgr.dependent_ifacenames(iface) {
                    println!("{}: {}", iface.name, deps.join(" "));
                }
            }
            Ok(true)
        }
    }
}

/// Pick the stanzas to work on: the named ones, or every owned one
fn select<'a>(
    addon: &dyn Addon,
    ifaces: &'a [InterfaceConfig],
    names: &[String],
) -> Result<Vec<&'a InterfaceConfig>> {
    if names.is_empty() {
        return Ok(ifaces.iter().filter(|i| addon.is_my_interface(i)).collect());
    }

    let mut selected = Vec::with_capacity(names.len());
    for name in names {
        let iface = ifaces
            .iter()
            .find(|i| &i.name == name)
            .with_context(|| format!("Interface '{}' not found", name))?;
        if addon.is_my_interface(iface) {
            selected.push(iface);
        } else {
            warn!("{}: not a tunnel interface, skipping", name);
        }
    }
    Ok(selected)
}

/// Log every schema violation of `iface`; true if there were none
fn validate(addon: &dyn Addon, iface: &InterfaceConfig) -> bool {
    let errors = addon.modinfo().validate(iface);
    for err in &errors {
        error!("{}", err);
    }
    errors.is_empty()
}

fn run_hook(addon: &mut dyn Addon, op: Operation, ifaces: &[&InterfaceConfig]) -> bool {
    let mut ok = true;
    for iface in ifaces {
        if op != Operation::PostDown && !validate(addon, iface) {
            ok = false;
            continue;
        }
        info!("{}: {}", iface.name, op);
        if let Err(e) = addon.run(op, iface, None) {
            error!("{}: {}", iface.name, e);
            ok = false;
        }
    }
    ok
}

fn check(addon: &mut dyn Addon, ifaces: &[&InterfaceConfig], json: bool) -> Result<bool> {
    let mut ok = true;
    let mut states = Vec::with_capacity(ifaces.len());

    for iface in ifaces {
        if !validate(addon, iface) {
            ok = false;
            continue;
        }
        let mut state = CurrentState::new(&iface.name);
        if let Err(e) = addon.run(Operation::QueryCheckCurr, iface, Some(&mut state)) {
            error!("{}: {}", iface.name, e);
            ok = false;
            continue;
        }
        ok &= state.all_match();
        states.push(state);
    }

    if json {
        let records: Vec<_> = states.iter().map(CurrentState::to_record).collect();
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else {
        for state in &states {
            for (attr, check) in state.iter() {
                println!(
                    "{} {} {} [{}]",
                    state.name(),
                    attr,
                    check.value.as_deref().unwrap_or("(none)"),
                    check.status.label()
                );
            }
        }
    }
    Ok(ok)
}
