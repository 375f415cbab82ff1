// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Tessera — label-driven routing configuration
//
//  Input:   discovery snapshot (service → instances), JSON or YAML
//  Output:  derived frontends/backends, JSON or YAML
//  Config:  YAML file + TESSERA_* env overrides
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

mod snapshot;

use clap::Parser;
use std::path::PathBuf;
use tessera_core::config::{OutputFormat, TesseraConfig};
use tessera_core::Assembler;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "tessera", version, about = "Derive routing configuration from instance labels")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "/etc/tessera/tessera.yaml")]
    config: PathBuf,

    /// Discovery snapshot to read (service name → instances)
    #[arg(short, long)]
    snapshot: PathBuf,

    /// Write the derived configuration here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format: json or yaml
    #[arg(short, long)]
    format: Option<OutputFormat>,

    /// Domain for synthesized Host rules (overrides config)
    #[arg(long)]
    domain: Option<String>,

    /// Fail if any service could not be routed
    #[arg(long)]
    strict: bool,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // ── Tracing ──
    // Logs go to stderr so stdout stays clean for the rendered output.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "Tessera starting");

    // ── Config ──
    let mut config = if cli.config.exists() {
        info!(path = %cli.config.display(), "Loading config file");
        TesseraConfig::load(&cli.config)?
    } else {
        info!("No config file found, using defaults");
        TesseraConfig::default()
    };
    if let Some(domain) = cli.domain {
        config.provider.domain = domain;
    }
    if let Some(format) = cli.format {
        config.output.format = format;
    }
    if let Some(output) = cli.output {
        config.output.path = Some(output);
    }
    if config.provider.domain.is_empty() {
        warn!("No domain configured, default rules will end in a bare dot");
    }

    // ── Snapshot ──
    let services = snapshot::load_snapshot(&cli.snapshot)?;
    info!(
        path = %cli.snapshot.display(),
        services = services.len(),
        instances = services.values().map(Vec::len).sum::<usize>(),
        "Snapshot loaded"
    );

    // ── Assemble ──
    let assembler = Assembler::new(&config.provider);
    let assembly = assembler.assemble(&services);

    for (service, errors) in &assembly.failures {
        for error in errors {
            warn!(service = %service, code = error.code(), error = %error, "Instance not routable");
        }
    }
    let excluded = assembly.excluded_services();
    if !excluded.is_empty() {
        warn!(services = %excluded.join(", "), "Services excluded from output");
    }
    if cli.strict && !assembly.is_complete() {
        anyhow::bail!(
            "{} service(s) have unroutable instances: {}",
            assembly.failures.len(),
            assembly
                .failures
                .keys()
                .cloned()
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    // ── Output ──
    let rendered = snapshot::render(&assembly.configuration, config.output.format)?;
    snapshot::write_output(&rendered, config.output.path.as_deref())?;

    info!(
        format = %config.output.format,
        backends = assembly.configuration.backends.len(),
        frontends = assembly.configuration.frontends.len(),
        "Configuration written"
    );
    Ok(())
}
