//! TraceGuard CLI - multi-board interconnect verification from the command line.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process;
use traceguard::{CheckOutput, CheckRecord, RunOptions, RunReport, TraceGuardCore};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "traceguard")]
#[command(about = "Multi-board netlist trace and voltage verification tool", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the checks queued in a driver file
    Check {
        /// Path to the driver CSV file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Filename stem for report files (writes STEM_check.csv,
        /// STEM_map.csv, and constraint files)
        #[arg(short, long)]
        out: Option<String>,

        /// Also resolve pulls for every net of every board
        /// (writes STEM_volt.csv with --out)
        #[arg(long)]
        all_volt: bool,

        /// Output format for the console summary
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,
    },

    /// List recognized driver-file directives
    Directives {
        /// Show detailed directive descriptions
        #[arg(short, long)]
        verbose: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output for CI/CD
    Json,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let exit_code = match cli.command {
        Commands::Check {
            file,
            out,
            all_volt,
            format,
        } => handle_check(&file, out, all_volt, format),
        Commands::Directives { verbose } => {
            handle_directives(verbose);
            0
        }
    };

    process::exit(exit_code);
}

fn handle_check(
    file: &PathBuf,
    out: Option<String>,
    all_volt: bool,
    format: OutputFormat,
) -> i32 {
    let mut system = match TraceGuardCore::load_system(file) {
        Ok(system) => system,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    let options = RunOptions { all_volt };
    let report = TraceGuardCore::run(&mut system, &options);

    match format {
        OutputFormat::Human => output_human(&report),
        OutputFormat::Json => output_json(&report),
    }

    if let Some(stem) = out {
        match TraceGuardCore::write_reports(&system, &report, &stem) {
            Ok(paths) => {
                for path in paths {
                    println!("Wrote {}", path.display());
                }
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                return 1;
            }
        }
    }

    0
}

fn records(outputs: &[CheckOutput]) -> Vec<&CheckRecord> {
    outputs.iter().filter_map(|o| o.as_record()).collect()
}

fn output_human(report: &RunReport) {
    let traces = records(&report.traces);
    if !traces.is_empty() {
        println!("\nTrace checks:");
        println!("{}", "─".repeat(60));
        for record in &traces {
            let verdict = match record.trace {
                Some(true) => "PASS",
                Some(false) => "FAIL",
                None => "    ",
            };
            print!("  {}  {} -> {}", verdict, record.from, record.to);
            if record.ignored {
                print!("  (ignored)");
            }
            println!();
        }
    }

    let volts = records(&report.volts);
    if !volts.is_empty() {
        println!("\nVoltage checks:");
        println!("{}", "─".repeat(60));
        for record in &volts {
            let level = match record.common_volt() {
                Some(volts) => format!("{:.2} V", volts),
                None if record.voltages.is_empty() => "no voltage data".to_string(),
                None => format!(
                    "CONFLICT ({})",
                    record
                        .voltages
                        .iter()
                        .map(|v| format!("{:.2}", v))
                        .collect::<Vec<_>>()
                        .join(" vs ")
                ),
            };
            print!("  {}: {}", record.from, level);
            if let Some(matched) = record.volt_match() {
                print!("  [{}]", if matched { "as desired" } else { "MISMATCH" });
            }
            println!();
        }
    }

    if let Some(groups) = &report.all_volt {
        println!("\nFull voltage sweep:");
        println!("{}", "─".repeat(60));
        for group in groups {
            println!(
                "  {}: {} conflicting, {} without voltage, {} agreeing",
                group.board,
                group.conflicts.len(),
                group.no_volts.len(),
                group.agreeing.len()
            );
        }
    }

    let failed = traces
        .iter()
        .filter(|r| r.trace == Some(false) && !r.ignored)
        .count();
    let conflicts = volts
        .iter()
        .filter(|r| !r.voltages.is_empty() && !r.has_common_volt())
        .count();
    println!("\nSummary:");
    println!("  Traces:    {} ({} failed)", traces.len(), failed);
    println!("  Voltages:  {} ({} conflicting)", volts.len(), conflicts);
}

fn record_json(record: &CheckRecord) -> serde_json::Value {
    serde_json::json!({
        "from": record.from,
        "to": record.to,
        "group": record.group,
        "desired_volt": record.desired_volt,
        "trace": record.trace,
        "ignored": record.ignored,
        "volt_match": record.volt_match(),
        "common_volt": record.common_volt(),
        "path": record.path,
        "pulls": record.pulls,
        "voltages": record.voltages,
    })
}

fn output_json(report: &RunReport) {
    let traces: Vec<_> = records(&report.traces).into_iter().map(record_json).collect();
    let volts: Vec<_> = records(&report.volts).into_iter().map(record_json).collect();

    let output = serde_json::json!({
        "traces": traces,
        "volts": volts,
        "summary": {
            "trace_count": traces.len(),
            "trace_failures": records(&report.traces)
                .iter()
                .filter(|r| r.trace == Some(false))
                .count(),
            "volt_count": volts.len(),
            "volt_conflicts": records(&report.volts)
                .iter()
                .filter(|r| !r.voltages.is_empty() && !r.has_common_volt())
                .count(),
        }
    });
    println!("{}", serde_json::to_string_pretty(&output).unwrap());
}

fn handle_directives(verbose: bool) {
    println!("Recognized driver-file directives:\n");

    let directives = [
        (
            "NETLIST, <board>, <file>",
            "Parse an ASC netlist and attach it as a board",
        ),
        (
            "CONNECTION, <board>, <ref>, <board>, <ref>",
            "Board-to-board mating; pin numbers carry straight across",
        ),
        (
            "HARNESSLINK, <harness>, <ref>, <pin>, <ref>, <pin>",
            "One wire inside a cable assembly; stored both directions",
        ),
        (
            "CHECKTRACE, <board>, <sig|ref.pin>, <board>, <sig|ref.pin> [, group [, volt]]",
            "Queue a conductive-path check between two endpoints",
        ),
        (
            "CHECKVOLT, <board>, <sig|ref.pin> [, group [, volt]]",
            "Queue a voltage-pull check on one endpoint",
        ),
        (
            "RAIL, <board>, <signal>, <volt>",
            "Force a net to be a supply rail at the given voltage",
        ),
        (
            "IGNORE, <board>, SIGNAL|DEVICE, <name>",
            "Exclude a signal or device from traversal",
        ),
        (
            "DEVICELINK, <type>, <pin>, <pin> [, bidir [, volt, volt]]",
            "Declare a straight-through pin pair on a device type",
        ),
        (
            "DEVICEPULL, <type> [, countA], AB|BA|ABBA, <pinA...>, <pinB...>",
            "Declare voltage-propagating pin pairs (pull engine only)",
        ),
        (
            "DEVICEVOLT, <type>, <volt>, <pin...>",
            "Stake pins of a device type at a fixed voltage",
        ),
        (
            "REFVOLT, <board>, <ref>, <volt>, <pin...>",
            "Stake pins of one device instance at a fixed voltage",
        ),
        (
            "DEVICEPIN, <type>, RC|ARB|CATEGORY, ...",
            "Physical pin layout for pinout reports",
        ),
        (
            "MAP, <board>, <ref>, <name>",
            "Label a refdes for the pinout report",
        ),
        (
            "REFSIG, <board>, <ref>, <pin>, <int>, <ext> [, iostandard]",
            "Associate a device pin with its external signal name",
        ),
        (
            "DEVICEPARAM, <type>, <param>, <value> [, ...]",
            "Characterize a device type (DEVICETYPE selects constraint syntax)",
        ),
        (
            "IMPORT, <file>",
            "Load another driver file; each file loads at most once",
        ),
        (
            "COMMENT, <text>",
            "Comment block, reproduced ahead of the next check in reports",
        ),
    ];

    for (usage, description) in &directives {
        println!("  {}", usage);
        if verbose {
            println!("    {}", description);
        }
        println!();
    }
}
