//! Command-line entry point (§6 CLI): loads a workflow and a resource configuration, builds a
//! [`ExperimentSimulation`](wsim_dag::simulation::ExperimentSimulation), drives it to completion
//! and prints the four output metrics.

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};

use wsim_dag::dag::TaskDag;
use wsim_dag::distribution::DistributionSpec;
use wsim_dag::error::{DagError, DagResult};
use wsim_dag::failure::reclustering::ReclusteringPolicy;
use wsim_dag::failure::FailureMode;
use wsim_dag::parsers::config::{FileSystemMode, Parameters, SchedulingAlgorithm};
use wsim_dag::parsers::{parse_dax, parse_yaml, read_parameters};
use wsim_dag::resource::read_resource_config;
use wsim_dag::simulation::SimulationBuilder;

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ReplicaCatalogArg {
    Shared,
    Local,
}

#[derive(Parser, Debug)]
#[command(about = "Runs one scientific-workflow scheduling experiment to completion", long_about = None)]
struct Args {
    /// Workflow description: a DAX document (.xml/.dax) or the flat YAML format (.yaml/.yml)
    #[arg(short, long)]
    workflow: PathBuf,

    /// Resource configuration file: datacenters, hosts and the VMs placed on them
    #[arg(short, long)]
    resources: PathBuf,

    /// Optional run parameters file (§6 `Parameters`); every field has a default if omitted
    #[arg(long)]
    params: Option<PathBuf>,

    /// Optional BRITE-format network topology, logged for informational purposes only - the
    /// simulation otherwise falls back to a flat constant-bandwidth inter-datacenter model
    #[arg(long)]
    topology: Option<PathBuf>,

    /// Overrides `schedulingAlgorithm` from the parameters file
    #[arg(long)]
    scheduling: Option<String>,

    /// Overrides `replicaCatalog.fileSystem` from the parameters file
    #[arg(long, value_enum)]
    replica_catalog: Option<ReplicaCatalogArg>,

    /// Seed for every distribution generator in the run; two runs with the same seed and inputs
    /// produce identical placements, timestamps and totals (§5 Determinism)
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Writes the run's log lines to this file instead of stderr
    #[arg(long)]
    trace_log: Option<PathBuf>,

    /// Prints the output metrics as a JSON object instead of the default human-readable form
    #[arg(long)]
    json: bool,
}

fn init_logging(trace_log: &Option<PathBuf>) -> std::io::Result<()> {
    let mut builder = env_logger::Builder::from_default_env();
    builder.format(|buf, record| writeln!(buf, "{}", record.args()));
    if let Some(path) = trace_log {
        builder.target(env_logger::Target::Pipe(Box::new(File::create(path)?)));
    }
    builder.init();
    Ok(())
}

fn load_workflow(path: &PathBuf, runtime_scale: f64) -> DagResult<TaskDag> {
    let text = std::fs::read_to_string(path).map_err(|e| DagError::Io { path: path.display().to_string(), source: e })?;
    match path.extension().and_then(|e| e.to_str()) {
        Some("yaml") | Some("yml") => parse_yaml(&text, runtime_scale),
        _ => parse_dax(&text, runtime_scale),
    }
}

fn parse_scheduling_algorithm(name: &str) -> Option<SchedulingAlgorithm> {
    match name.to_uppercase().as_str() {
        "MAXMIN" => Some(SchedulingAlgorithm::MaxMin),
        "MINMIN" => Some(SchedulingAlgorithm::MinMin),
        "MCT" => Some(SchedulingAlgorithm::Mct),
        "DATA" => Some(SchedulingAlgorithm::Data),
        "STATIC" => Some(SchedulingAlgorithm::Static),
        "FCFS" => Some(SchedulingAlgorithm::Fcfs),
        "ROUNDROBIN" => Some(SchedulingAlgorithm::RoundRobin),
        _ => None,
    }
}

fn run(args: Args) -> Result<(), String> {
    init_logging(&args.trace_log).map_err(|e| format!("failed to open trace log: {e}"))?;

    let mut params: Parameters = match &args.params {
        Some(path) => read_parameters(path).map_err(|e| e.to_string())?,
        None => Parameters::default(),
    };
    if let Some(name) = &args.scheduling {
        params.scheduling_algorithm = parse_scheduling_algorithm(name).ok_or_else(|| format!("unrecognised scheduling algorithm {name:?}"))?;
    }
    if let Some(mode) = args.replica_catalog {
        params.replica_catalog.file_system = match mode {
            ReplicaCatalogArg::Shared => FileSystemMode::Shared,
            ReplicaCatalogArg::Local => FileSystemMode::Local,
        };
    }

    if let Some(topology_path) = &args.topology {
        let text = std::fs::read_to_string(topology_path).map_err(|e| format!("failed to read topology file: {e}"))?;
        let topology = wsim_network::brite::parse_brite(&text).map_err(|e| format!("failed to parse topology: {e}"))?;
        log::info!("loaded network topology with {} nodes and {} links", topology.node_count(), topology.link_count());
    }

    let dag = load_workflow(&args.workflow, params.runtime_scale).map_err(|e| e.to_string())?;
    let resource_config = read_resource_config(&args.resources).map_err(|e| e.to_string())?;

    let mut sim = SimulationBuilder::new(args.seed)
        .with_failure_model(FailureMode::FailureAll, DistributionSpec::Constant(0.))
        .with_reclustering_policy(ReclusteringPolicy::Noop)
        .build(dag, &params, resource_config);

    sim.step_until_no_events();

    let metrics = sim.metrics();
    if args.json {
        let json = serde_json::json!({
            "makespan": metrics.makespan,
            "total_cost": metrics.total_cost,
            "utilization": metrics.utilization,
            "energy": metrics.energy,
            "vm_count": sim.vm_count(),
            "event_count": sim.event_count(),
        });
        println!("{}", serde_json::to_string_pretty(&json).map_err(|e| e.to_string())?);
    } else {
        log::info!(
            "makespan={:.3}s total_cost={:.4} utilization={:.2}% energy={:.4}J ({} VMs, {} events, final clock {:.3}s)",
            metrics.makespan,
            metrics.total_cost,
            metrics.utilization,
            metrics.energy,
            sim.vm_count(),
            sim.event_count(),
            sim.time(),
        );
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}
