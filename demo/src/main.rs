//! Physician Attestation Clinic Reference: Demo CLI
//!
//! Runs one or all of the clinic attestation scenarios. Each scenario uses
//! the real session, gate, challenge registry and ledger wired to in-process
//! adapters with fictional physician data.
//!
//! Usage:
//!   cargo run -p demo -- run-all
//!   cargo run -p demo -- expired-code
//!   cargo run -p demo -- gated-submission
//!   cargo run -p demo -- check-config path/to/attestor.toml

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use attestor_config::AttestorConfig;
use attestor_contracts::error::AttestResult;
use attestor_ref_clinic::scenarios::{
    expired_code, gate_walkthrough, manual_approval, mismatch_recovery, network_timeout,
    replayed_code, unregistered_physician,
};

// ── CLI definition ────────────────────────────────────────────────────────────

/// Mandatory physician attestation before document actions.
///
/// Each subcommand runs one or all of the clinic scenarios.
#[derive(Parser)]
#[command(
    name = "demo",
    about = "Physician attestation clinic reference demo",
    long_about = "Runs clinic scenarios showing one-time code expiry, replay protection,\n\
                  directory degradation, manual approval and the fail-closed gate."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run every scenario in sequence.
    RunAll,
    /// Scenario A: correct code submitted after the TTL.
    ExpiredCode,
    /// Scenario B: mistyped code, recovery and the attempt limit.
    MistypedCode,
    /// Scenario C: a consumed code replayed against the issuer.
    ReplayedCode,
    /// Scenario D: physician missing from the directory.
    UnregisteredPhysician,
    /// Scenario E: witnessed in-person approval.
    ManualApproval,
    /// Scenario F: request timeouts on the mail relay and directory.
    SlowNetwork,
    /// Scenario G: prescription submission behind the attestation gate.
    GatedSubmission,
    /// Load and validate an operator configuration file.
    CheckConfig {
        /// Path to a TOML configuration file.
        path: PathBuf,
    },
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Set RUST_LOG=debug for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    print_banner();

    let result = match cli.command {
        Command::RunAll => run_all(),
        Command::ExpiredCode => expired_code::run_scenario(),
        Command::MistypedCode => mismatch_recovery::run_scenario(),
        Command::ReplayedCode => replayed_code::run_scenario(),
        Command::UnregisteredPhysician => unregistered_physician::run_scenario(),
        Command::ManualApproval => manual_approval::run_scenario(),
        Command::SlowNetwork => network_timeout::run_scenario(),
        Command::GatedSubmission => gate_walkthrough::run_scenario(),
        Command::CheckConfig { path } => check_config(path),
    };

    match result {
        Ok(()) => {
            println!("All selected scenarios completed successfully.");
        }
        Err(e) => {
            eprintln!("Demo error: {}", e);
            std::process::exit(1);
        }
    }
}

// ── Dispatch ──────────────────────────────────────────────────────────────────

fn run_all() -> AttestResult<()> {
    expired_code::run_scenario()?;
    mismatch_recovery::run_scenario()?;
    replayed_code::run_scenario()?;
    unregistered_physician::run_scenario()?;
    manual_approval::run_scenario()?;
    network_timeout::run_scenario()?;
    gate_walkthrough::run_scenario()?;
    Ok(())
}

fn check_config(path: PathBuf) -> AttestResult<()> {
    let config = AttestorConfig::from_file(&path)?;
    info!(path = %path.display(), "configuration accepted");

    println!("Configuration {} is valid:", path.display());
    println!("  challenge ttl:     {}s", config.challenge.ttl_secs);
    println!("  max attempts:      {}", config.challenge.max_attempts);
    println!("  request timeout:   {}s", config.network.request_timeout_secs);
    println!(
        "  enabled methods:   {}",
        config
            .methods
            .enabled
            .iter()
            .map(|m| m.label())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!("  fallback ip:       {}", config.client.fallback_ip);
    println!();
    Ok(())
}

// ── Banner ────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("Physician Attestation: Clinic Reference Demo");
    println!("============================================");
    println!();
    println!("Every gated document action runs:");
    println!("  [1] Directory lookup resolves the physician's contact channels");
    println!("  [2] The physician picks app approval, email code or manual approval");
    println!("  [3] The method verifies the physician and yields a proof");
    println!("  [4] The attestation record is written to the SHA-256 ledger");
    println!("  [5] Only then does the protected action run");
    println!();
}
