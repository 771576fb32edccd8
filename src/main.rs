use std::path::PathBuf;

use anyhow::{bail, Context};
use fankit::{Processor, SmoothingPipe, SpinupPipe};
use tracing::info;

/// Options for the `fan` subcommand. Durations are milliseconds of
/// simulated print time, distances are mm.
struct FanArgs {
    path: PathBuf,
    smooth_time: f64,
    reset_distance: f64,
    lead_time: f64,
}

const DEFAULT_SMOOTH_TIME: f64 = 7000.0;
const DEFAULT_RESET_DISTANCE: f64 = 3.0;
const DEFAULT_LEAD_TIME: f64 = 0.0;

fn main() -> anyhow::Result<()> {
    fankit::init_logging()?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("fan") => run_fan(parse_fan_args(&args[1..])?),
        Some("--version" | "-V") => {
            println!("fankit {} (built {})", fankit::VERSION, fankit::BUILD_DATE);
            Ok(())
        }
        Some("--help" | "-h") | None => {
            print_usage();
            Ok(())
        }
        Some(other) => bail!("unknown subcommand: {other} (try --help)"),
    }
}

fn run_fan(args: FanArgs) -> anyhow::Result<()> {
    let processor = build_fan_chain(&args);

    if processor.pipe_count() == 0 {
        info!("all stages disabled, file will pass through unchanged");
    }

    processor
        .run(&args.path)
        .with_context(|| format!("failed to process {}", args.path.display()))
}

/// A stage whose duration/lead is zero is not constructed at all.
fn build_fan_chain(args: &FanArgs) -> Processor {
    let mut processor = Processor::new();
    if args.smooth_time > 0.0 {
        processor.add_pipe(Box::new(SmoothingPipe::new(
            args.smooth_time,
            args.reset_distance,
        )));
    }
    if args.lead_time > 0.0 {
        processor.add_pipe(Box::new(SpinupPipe::new(args.lead_time)));
    }
    processor
}

fn parse_fan_args(args: &[String]) -> anyhow::Result<FanArgs> {
    let mut smooth_time = DEFAULT_SMOOTH_TIME;
    let mut reset_distance = DEFAULT_RESET_DISTANCE;
    let mut lead_time = DEFAULT_LEAD_TIME;
    let mut path: Option<PathBuf> = None;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--smooth-time" => smooth_time = numeric_option(arg, iter.next())?,
            "--reset-distance" => reset_distance = numeric_option(arg, iter.next())?,
            "--lead-time" => lead_time = numeric_option(arg, iter.next())?,
            other if other.starts_with('-') => bail!("unknown option: {other}"),
            other => {
                if path.is_some() {
                    bail!("unexpected extra argument: {other}");
                }
                path = Some(PathBuf::from(other));
            }
        }
    }

    let path = path.context("missing input file")?;

    Ok(FanArgs {
        path,
        smooth_time,
        reset_distance,
        lead_time,
    })
}

fn numeric_option(name: &str, value: Option<&String>) -> anyhow::Result<f64> {
    let raw = value.with_context(|| format!("{name} requires a value"))?;
    let value: f64 = raw
        .parse()
        .with_context(|| format!("invalid value for {name}: {raw}"))?;
    if value < 0.0 {
        bail!("{name} must be non-negative");
    }
    Ok(value)
}

fn print_usage() {
    println!(
        "fankit {} - gcode fan post-processor

USAGE:
    fankit fan [OPTIONS] <FILE>

Rewrites <FILE> in place. The original is only replaced once the whole
file has been transformed successfully.

OPTIONS:
    --smooth-time <MS>      fan chatter suppression window in ms of print
                            time, 0 disables smoothing [default: {}]
    --reset-distance <MM>   travel length that ends the window early
                            [default: {}]
    --lead-time <MS>        re-issue fan increases this early, 0 disables
                            spinup [default: {}]
    -h, --help              print this help
    -V, --version           print version",
        fankit::VERSION,
        DEFAULT_SMOOTH_TIME,
        DEFAULT_RESET_DISTANCE,
        DEFAULT_LEAD_TIME,
    );
}
