//! netdiag - fuzzy network fault diagnosis
//!
//! Command-line interface over the network knowledge base.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use netdiag::config::{LogLevel, NetdiagConfig, ReportFormat};
use netdiag::network::{self, NetworkDiagnostics, NetworkReadings, NetworkReport, SCENARIOS};
use netdiag::{Diagnosis, Finding, OutputScore};

#[derive(Parser)]
#[command(name = "netdiag")]
#[command(author = "Netdiag Rust Authors")]
#[command(version = env!("NETDIAG_VERSION"))]
#[command(about = "Fuzzy-logic diagnosis of network faults", long_about = None)]
struct Cli {
    /// Configuration file (defaults to the standard search path)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Report format (overrides configuration)
    #[arg(short, long, global = true, value_enum)]
    format: Option<FormatArg>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Diagnose one set of readings
    Diagnose {
        #[command(flatten)]
        readings: ReadingArgs,
    },

    /// Run the built-in reference scenarios
    Scenarios {
        /// Only run the named scenario (isp, dns, wifi, hardware, congestion)
        name: Option<String>,
    },

    /// List input and output variables and their terms
    Variables {
        /// Fuzzify these readings against the input terms
        #[command(flatten)]
        readings: ReadingArgs,
    },

    /// Manage the configuration file
    Config {
        /// Write a default configuration to ./netdiag.toml
        #[arg(long, conflicts_with = "show")]
        init: bool,

        /// Overwrite an existing file with --init
        #[arg(long, requires = "init")]
        force: bool,

        /// Print the effective configuration
        #[arg(long)]
        show: bool,
    },

    /// Show version and build information
    Version,
}

#[derive(clap::Args, Debug, Default)]
struct ReadingArgs {
    /// Upload speed in Mbps
    #[arg(long, value_name = "MBPS")]
    upload: Option<f64>,

    /// Packet loss in percent
    #[arg(long, value_name = "PCT")]
    packet_loss: Option<f64>,

    /// DNS errors per hour
    #[arg(long, value_name = "PER_HOUR")]
    dns_errors: Option<f64>,

    /// WiFi signal strength in percent
    #[arg(long, value_name = "PCT")]
    wifi: Option<f64>,

    /// Response time in milliseconds
    #[arg(long, value_name = "MS")]
    latency: Option<f64>,
}

impl From<&ReadingArgs> for NetworkReadings {
    fn from(args: &ReadingArgs) -> Self {
        NetworkReadings {
            upload_mbps: args.upload,
            packet_loss_pct: args.packet_loss,
            dns_errors_per_hour: args.dns_errors,
            wifi_signal_pct: args.wifi,
            latency_ms: args.latency,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    /// Human-readable report
    Text,
    /// JSON document
    Json,
}

impl From<FormatArg> for ReportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => ReportFormat::Text,
            FormatArg::Json => ReportFormat::Json,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => {
            let mut config = NetdiagConfig::load_from_file(path)?;
            config.apply_env_overrides();
            config.validate()?;
            config
        }
        None => NetdiagConfig::load()?,
    };

    if cli.verbose {
        config.general.log_level = LogLevel::Verbose;
    } else if cli.quiet {
        config.general.log_level = LogLevel::Quiet;
    }
    if let Some(format) = cli.format {
        config.general.format = format.into();
    }

    init_logging(config.general.log_level);
    debug!(?config, "effective configuration");

    match &cli.command {
        Commands::Diagnose { readings } => {
            let diagnostics = NetworkDiagnostics::from_config(&config)?;
            let report = match diagnostics.diagnose(&readings.into()) {
                Ok(report) => report,
                Err(err) => {
                    // JSON consumers get the structured error on stdout as well
                    if config.general.format == ReportFormat::Json {
                        println!("{}", err.to_json());
                    }
                    return Err(err).context("Diagnosis failed");
                }
            };
            print_reports(&[("readings", report)], config.general.format)?;
        }
        Commands::Scenarios { name } => {
            let diagnostics = NetworkDiagnostics::from_config(&config)?;
            let selected: Vec<_> = match name {
                Some(name) => match network::find_scenario(name) {
                    Some(scenario) => vec![scenario],
                    None => bail!("Unknown scenario '{}'", name),
                },
                None => SCENARIOS.iter().collect(),
            };

            let batch: Vec<NetworkReadings> = selected.iter().map(|s| s.readings).collect();
            let mut reports = Vec::with_capacity(selected.len());
            for (scenario, result) in selected.iter().zip(diagnostics.diagnose_batch(&batch)) {
                let report = result.with_context(|| format!("Scenario '{}' failed", scenario.name))?;
                reports.push((scenario.name, report));
            }
            print_reports(&reports, config.general.format)?;
        }
        Commands::Variables { readings } => {
            let diagnostics = NetworkDiagnostics::from_config(&config)?;
            print_variables(&diagnostics, &readings.into(), config.general.format)?;
        }
        Commands::Config { init, force, show } => {
            if *init {
                init_config(Path::new("./netdiag.toml"), *force)?;
            } else if *show {
                print!("{}", config.to_toml()?);
            } else {
                println!("Configuration search paths:");
                for path in NetdiagConfig::config_paths() {
                    let marker = if path.exists() { "*" } else { " " };
                    println!(" {} {}", marker, path.display());
                }
            }
        }
        Commands::Version => {
            println!("netdiag {}", env!("NETDIAG_VERSION"));
            println!("target: {}", env!("NETDIAG_TARGET"));
        }
    }

    Ok(())
}

/// Install the stderr subscriber; `RUST_LOG` wins over the configured level
fn init_logging(level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("netdiag={}", level.filter_directive())));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    fs::write(path, NetdiagConfig::default_config_content())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

// ============================================================================
// Output
// ============================================================================

fn print_reports(reports: &[(&str, NetworkReport)], format: ReportFormat) -> Result<()> {
    match format {
        ReportFormat::Json => {
            let doc: serde_json::Map<String, serde_json::Value> = reports
                .iter()
                .map(|(name, report)| Ok((name.to_string(), serde_json::to_value(report)?)))
                .collect::<Result<_, serde_json::Error>>()?;
            println!("{}", serde_json::to_string_pretty(&doc)?);
        }
        ReportFormat::Text => {
            for (i, (name, report)) in reports.iter().enumerate() {
                if i > 0 {
                    println!();
                }
                print_report(name, report);
            }
        }
    }
    Ok(())
}

fn print_report(name: &str, report: &NetworkReport) {
    println!("== {} ==", name);

    println!("Readings:");
    for ((variable, value), (_, unit)) in report.readings.entries().iter().zip(network::INPUT_UNITS) {
        match value {
            Some(v) => println!("  {:<18} {} {}", variable, v, unit),
            None => println!("  {:<18} -", variable),
        }
    }

    println!("Fault scores (0-100):");
    for (output, score) in &report.outcome.scores {
        match score {
            OutputScore::Score(v) => println!("  {:<18} {:6.2}", output, v),
            OutputScore::Undetermined => println!("  {:<18} undetermined", output),
        }
    }

    match &report.diagnosis {
        Diagnosis::Found { primary, secondary } => {
            println!("Primary diagnosis: {}", describe(primary));
            for finding in secondary {
                println!("Also likely:       {}", describe(finding));
            }
        }
        Diagnosis::NoDiagnosis => println!("Primary diagnosis: none (no rule fired)"),
    }

    println!("Fired rules:");
    for rule in &report.outcome.fired {
        println!("  #{:<3} {:.2}  {}", rule.index + 1, rule.strength, rule.label);
    }
}

fn describe(finding: &Finding) -> String {
    format!("{} ({:.2}, {})", finding.output, finding.score, finding.severity.as_str())
}

fn print_variables(diagnostics: &NetworkDiagnostics, readings: &NetworkReadings, format: ReportFormat) -> Result<()> {
    let rule_base = diagnostics.engine().rule_base();

    if format == ReportFormat::Json {
        println!("{}", serde_json::to_string_pretty(rule_base)?);
        return Ok(());
    }

    println!("Inputs:");
    for ((variable, unit), (_, reading)) in rule_base.inputs().zip(network::INPUT_UNITS).zip(readings.entries()) {
        let universe = variable.universe();
        println!(
            "  {} [{}, {}] {} step {}",
            variable.name(),
            universe.min(),
            universe.max(),
            unit.1,
            universe.step()
        );
        for term in variable.term_names() {
            if let Some(mf) = variable.term(term) {
                println!("    {:<12} {}", term, mf);
            }
        }
        if let Some(x) = reading {
            let degrees = variable.fuzzify(x);
            let summary: Vec<String> = degrees.iter().map(|(t, d)| format!("{}={:.2}", t, d)).collect();
            match variable.dominant_term(x) {
                Some((term, _)) => println!("    -> {}: {} ({})", x, term, summary.join(", ")),
                None => println!("    -> {}: no term ({})", x, summary.join(", ")),
            }
        }
    }

    println!("Outputs:");
    for variable in rule_base.outputs() {
        let universe = variable.universe();
        println!("  {} [{}, {}] step {}", variable.name(), universe.min(), universe.max(), universe.step());
        for term in variable.term_names() {
            if let Some(mf) = variable.term(term) {
                println!("    {:<12} {}", term, mf);
            }
        }
    }

    println!("Rules:");
    for (i, rule) in rule_base.rules().iter().enumerate() {
        println!("  #{:<3} {}", i + 1, rule);
    }

    Ok(())
}
