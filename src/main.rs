// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::env;
use std::fs;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde_json::json;
use strom::config::{load_config, EngineConfig};
use strom::engine::{Coordinator, MemorySink};
use strom::record::Record;
use strom::template::{InMemoryTemplateRegistry, Template};
use strom::transforms::TransformRegistry;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn usage(program: &str) -> String {
    format!(
        "Usage: {0} <template.json> <records.json> [config.yaml|config.toml]\n       {0} --describe",
        program
    )
}

/// Config file settings apply unless `RUST_LOG` is set.
fn init_tracing(cfg: &EngineConfig) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cfg.logging.filter.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn describe() -> Result<()> {
    let registry = TransformRegistry::with_builtins();
    println!("{}", serde_json::to_string_pretty(&registry.describe_all())?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("strom");

    if args.get(1).map(String::as_str) == Some("--describe") {
        return describe();
    }
    if args.len() < 3 || args.len() > 4 {
        bail!(usage(program));
    }

    let cfg = match args.get(3) {
        Some(path) => load_config(path).with_context(|| format!("loading config {}", path))?,
        None => EngineConfig::default(),
    };
    init_tracing(&cfg);

    let template_json = fs::read_to_string(&args[1]).with_context(|| format!("reading {}", args[1]))?;
    let template = Template::from_json(&template_json).with_context(|| format!("parsing {}", args[1]))?;
    let records_json = fs::read_to_string(&args[2]).with_context(|| format!("reading {}", args[2]))?;
    let records = Record::list_from_json(&records_json).with_context(|| format!("parsing {}", args[2]))?;

    let token = template.stream_token.clone();
    let transforms = Arc::new(TransformRegistry::with_builtins());
    let coordinator = Coordinator::new(
        Arc::new(InMemoryTemplateRegistry::with_validation(Arc::clone(&transforms))),
        Arc::new(MemorySink::new()),
        transforms,
        &cfg.pipeline,
    );

    coordinator.process_template(template).await?;
    let report = coordinator.process_data(&token, records).await?;

    let output = json!({
        "stream_token": report.stream_token,
        "version": report.version,
        "rows": report.batch.len(),
        "filtered": report.batch.filtered_rows(),
        "derived": report.batch.derived_document(),
        "events": report.batch.events_document(),
        "failures": report.failures.iter().map(|f| f.to_string()).collect::<Vec<_>>(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    if !report.is_clean() {
        eprintln!("{} rule(s) failed; results above are partial", report.failures.len());
    }
    Ok(())
}
