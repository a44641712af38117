// Copyright 2025 rmodel developers
// SPDX-License-Identifier: Apache-2.0

//! Demo runner for the brain runtime.
//!
//! Loads `rmodel_configuration.toml` (or defaults), sets up logging and runs two flows: a
//! two-step greeting and a flow whose middle neuron runs a nested brain.
//!
//! Usage: flow_demo [--config <path>] [--set key=value]... [--name "<first> <last>"]
//!        [--debug-<crate>]...

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::info;

use rmodel::config::{load_config, load_config_or_default, validate_config, RmodelConfig};
use rmodel::observability::{debug_flags_help, init_console_logging, parse_debug_flags};
use rmodel::prelude::*;

struct Args {
    config: Option<PathBuf>,
    overrides: HashMap<String, String>,
    name: String,
}

fn usage_and_exit() -> ! {
    eprintln!(
        "Usage: flow_demo [--config <path>] [--set key=value]... [--name \"<first> <last>\"]\n\n{}",
        debug_flags_help()
    );
    process::exit(2);
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        config: None,
        overrides: HashMap::new(),
        name: "Clay Zhang".to_string(),
    };

    let mut iter = env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                let path = iter.next().unwrap_or_else(|| usage_and_exit());
                args.config = Some(PathBuf::from(path));
            }
            "--set" => {
                let pair = iter.next().unwrap_or_else(|| usage_and_exit());
                let (key, value) = pair
                    .split_once('=')
                    .with_context(|| format!("--set expects key=value, got '{}'", pair))?;
                args.overrides.insert(key.to_string(), value.to_string());
            }
            "--name" => args.name = iter.next().unwrap_or_else(|| usage_and_exit()),
            "-h" | "--help" => usage_and_exit(),
            other if other.starts_with("--debug-") => {}
            other => {
                eprintln!("Unknown argument: {}", other);
                usage_and_exit();
            }
        }
    }
    Ok(args)
}

fn load(args: &Args) -> Result<RmodelConfig> {
    let config = match &args.config {
        Some(path) => load_config(Some(path), Some(&args.overrides))
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => load_config_or_default(Some(&args.overrides))?,
    };
    validate_config(&config)?;
    Ok(config)
}

fn text(ctx: &BrainContextReader<'_>, key: &str) -> Result<String, ProcessorError> {
    ctx.get_memory(key)?
        .and_then(|v| v.as_str().map(str::to_string))
        .ok_or_else(|| ProcessorError::msg(format!("'{}' is not set", key)))
}

fn greeting_flow() -> BrainResult<Blueprint> {
    let mut bp = Blueprint::new();
    let split = bp.add_neuron_with_id(
        "split_name",
        FnProcessor::new(|ctx| {
            let name = text(ctx, "name")?;
            let (first, last) = name.split_once(' ').unwrap_or((name.as_str(), ""));
            ctx.set_memory("first_name", first)?;
            ctx.set_memory("last_name", last)?;
            Ok(())
        }),
    )?;
    let greet = bp.add_neuron_with_id(
        "greet",
        FnProcessor::new(|ctx| {
            let greeting = format!("Hello, {} {}!", text(ctx, "first_name")?, text(ctx, "last_name")?);
            ctx.set_memory("greeting", greeting)?;
            Ok(())
        }),
    )?;

    bp.add_entry_link_to(&split)?;
    bp.add_link(&split, &greet)?;
    bp.add_end_link_from(&greet)?;
    Ok(bp)
}

fn nested_flow() -> BrainResult<Blueprint> {
    let mut bp = Blueprint::new();
    let outer = bp.add_neuron_with_id(
        "run_greeting",
        FnProcessor::new(|ctx| {
            let inner = greeting_flow()?;
            let nested = ctx.new_brain(&inner)?;
            nested.entry_with_memory([("name", text(ctx, "name")?)])?;
            nested.wait();
            let greeting = nested
                .get_memory("greeting")?
                .ok_or_else(|| ProcessorError::msg("nested flow produced no greeting"))?;
            ctx.set_memory("nested_greeting", greeting)?;
            Ok(())
        }),
    )?;
    bp.add_entry_link_to(&outer)?;
    bp.add_end_link_from(&outer)?;
    Ok(bp)
}

fn run(name: &str, bp: &Blueprint, config: &RmodelConfig, key: &str) -> Result<String> {
    let brain = Brain::from_config(bp, config)?;
    brain.entry_with_memory([("name", name)])?;
    if !brain.wait_timeout(Duration::from_secs(30)) {
        bail!("brain {} did not finish within 30s", brain.id());
    }

    let result = brain
        .get_memory(key)?
        .and_then(|v| v.as_str().map(str::to_string))
        .with_context(|| format!("'{}' missing after the run", key))?;
    info!(brain_id = %brain.id(), counts = ?brain.state_counts(), "[DEMO] Run finished");
    Ok(result)
}

fn main() -> Result<()> {
    let args = parse_args()?;
    let config = load(&args)?;
    let debug_flags = parse_debug_flags();
    init_console_logging(&config.logging, &debug_flags)?;

    info!(
        worker_num = config.brain.worker_num,
        cast_policy = config.brain.cast_policy.as_str(),
        "[DEMO] Configuration loaded"
    );

    let greeting = run(&args.name, &greeting_flow()?, &config, "greeting")?;
    println!("{}", greeting);

    let nested = run(&args.name, &nested_flow()?, &config, "nested_greeting")?;
    println!("{} (nested)", nested);
    Ok(())
}
