// MCP23017 Driver - I2C GPIO Expander Support
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

mod bench;

use anyhow::Context;
use bench::{Bench, PinReport};
use clap::{Parser, Subcommand};
use mcp23017_config::DeviceManifest;
use mcp23017_driver::{DispatcherKind, ExpanderError, PinEvent, PinLevel};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};

const EXIT_PASS: u8 = 0;
const EXIT_CONFIG_ERROR: u8 = 2;
const EXIT_RUNTIME_ERROR: u8 = 3;

const REPORT_SCHEMA_VERSION: &str = "1.0";

#[derive(Parser, Debug)]
#[command(author, version, about = "MCP23017 expander bench", long_about = None)]
struct Cli {
    /// Enable register-level tracing
    #[arg(short, long, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate a device manifest and bring the device up on a simulated chip.
    Check(CheckArgs),

    /// Drive input transitions on a simulated chip and report dispatched interrupts.
    Simulate(SimulateArgs),
}

#[derive(Parser, Debug)]
struct CheckArgs {
    /// Path to the device manifest (YAML)
    #[arg(short, long)]
    manifest: PathBuf,
}

#[derive(Debug, Clone)]
struct DriveStep {
    target: String,
    level: PinLevel,
}

fn parse_drive(s: &str) -> Result<DriveStep, String> {
    let (target, level) = s
        .split_once('=')
        .ok_or_else(|| format!("Expected PIN=LEVEL, got '{}'", s))?;
    let level = match level.trim().to_ascii_lowercase().as_str() {
        "high" | "1" => PinLevel::High,
        "low" | "0" => PinLevel::Low,
        other => return Err(format!("Invalid level '{}': expected high or low", other)),
    };
    Ok(DriveStep {
        target: target.trim().to_string(),
        level,
    })
}

#[derive(Parser, Debug)]
struct SimulateArgs {
    /// Path to the device manifest (YAML)
    #[arg(short, long)]
    manifest: PathBuf,

    /// Input transition PIN=LEVEL, by number or label (repeatable, applied in order)
    #[arg(short, long, value_parser = parse_drive)]
    drive: Vec<DriveStep>,

    /// Write the final chip register state (JSON)
    #[arg(long)]
    snapshot: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct Report {
    schema_version: &'static str,
    status: &'static str,
    name: String,
    address: u8,
    dispatcher: DispatcherKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    events: Option<Vec<PinEvent>>,
    pins: Vec<PinReport>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries the JSON report.
    let level = if cli.trace {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Check(args) => run_check(args),
        Commands::Simulate(args) => run_simulate(args),
    }
}

fn load_manifest(path: &Path) -> Result<DeviceManifest, ExitCode> {
    info!("Loading device manifest: {:?}", path);
    DeviceManifest::from_file(path).map_err(|e| {
        error!("{:#}", e);
        ExitCode::from(EXIT_CONFIG_ERROR)
    })
}

fn bring_up(manifest: &DeviceManifest) -> Result<Bench, ExitCode> {
    Bench::bring_up(manifest).map_err(|e| {
        error!("Bring-up failed: {}", e);
        exit_for(&e)
    })
}

fn exit_for(e: &ExpanderError) -> ExitCode {
    match e {
        ExpanderError::InvalidConfig(_)
        | ExpanderError::InvalidPin(_)
        | ExpanderError::WrongDirection { .. }
        | ExpanderError::UnsupportedOperation(_) => ExitCode::from(EXIT_CONFIG_ERROR),
        ExpanderError::BusUnavailable { .. } | ExpanderError::Bus(_) => {
            ExitCode::from(EXIT_RUNTIME_ERROR)
        }
    }
}

fn report(
    manifest: &DeviceManifest,
    bench: &Bench,
    events: Option<Vec<PinEvent>>,
) -> Result<Report, ExitCode> {
    let pins = bench.pins().map_err(|e| {
        error!("Failed to read pins: {}", e);
        exit_for(&e)
    })?;
    Ok(Report {
        schema_version: REPORT_SCHEMA_VERSION,
        status: "ok",
        name: manifest.name.clone(),
        address: bench.device.address(),
        dispatcher: bench.device.dispatcher_kind(),
        events,
        pins,
    })
}

fn emit(report: &Report) -> ExitCode {
    match serde_json::to_string(report) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::from(EXIT_PASS)
        }
        Err(e) => {
            error!("Failed to serialize report: {}", e);
            ExitCode::from(EXIT_RUNTIME_ERROR)
        }
    }
}

fn run_check(args: CheckArgs) -> ExitCode {
    let manifest = match load_manifest(&args.manifest) {
        Ok(m) => m,
        Err(code) => return code,
    };
    let bench = match bring_up(&manifest) {
        Ok(b) => b,
        Err(code) => return code,
    };
    match report(&manifest, &bench, None) {
        Ok(r) => emit(&r),
        Err(code) => code,
    }
}

fn write_snapshot(path: &Path, bench: &Bench) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(&bench.chip.snapshot())?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write snapshot to {:?}", path))?;
    info!("Snapshot written to {:?}", path);
    Ok(())
}

fn run_simulate(args: SimulateArgs) -> ExitCode {
    let manifest = match load_manifest(&args.manifest) {
        Ok(m) => m,
        Err(code) => return code,
    };
    let bench = match bring_up(&manifest) {
        Ok(b) => b,
        Err(code) => return code,
    };

    for step in &args.drive {
        let Some(pin) = bench.resolve(&step.target) else {
            error!("Unknown pin '{}'", step.target);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        };
        if let Err(e) = bench.drive(pin, step.level) {
            error!("Cannot drive '{}': {}", step.target, e);
            return exit_for(&e);
        }
    }

    let summary = match report(&manifest, &bench, Some(bench.events())) {
        Ok(r) => r,
        Err(code) => return code,
    };

    if let Some(path) = &args.snapshot {
        if let Err(e) = write_snapshot(path, &bench) {
            error!("{:#}", e);
            return ExitCode::from(EXIT_RUNTIME_ERROR);
        }
    }
    emit(&summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_drive() {
        let step = parse_drive("door=LOW").unwrap();
        assert_eq!(step.target, "door");
        assert_eq!(step.level, PinLevel::Low);
        assert_eq!(parse_drive("3=1").unwrap().level, PinLevel::High);
        assert!(parse_drive("3").is_err());
        assert!(parse_drive("3=maybe").is_err());
    }
}
