//! CLI subcommand handlers.

use crate::Commands;
use crate::ConfigAction;
use anyhow::Context;
use flipcheck_core::config::{FlipcheckConfig, load_config, workspace_config_path};
use flipcheck_core::{DatasetBuilder, MetricsValidator};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Handle a CLI subcommand.
pub async fn handle_command(command: Commands, workspace: &Path) -> anyhow::Result<()> {
    match command {
        Commands::Build {
            samples,
            variants,
            seed,
            output,
            json,
        } => {
            let mut config = load(workspace)?;
            if let Some(samples) = samples {
                config.build.sample_size = samples;
            }
            if let Some(variants) = variants {
                config.build.variants_per_sample = variants;
            }
            if let Some(seed) = seed {
                config.build.seed = seed;
            }
            if let Some(output) = output {
                config.data.table_path = output;
            }
            config.data.table_path = resolve(workspace, &config.data.table_path);
            handle_build(config, json).await
        }
        Commands::Validate { path, metric, json } => {
            let mut config = load(workspace)?;
            if let Some(metric) = metric {
                config.validate.metric = metric;
            }
            let path = path.unwrap_or_else(|| config.data.table_path.clone());
            let path = resolve(workspace, &path);
            handle_validate(config, &path, json)
        }
        Commands::Config { action } => handle_config(action, workspace),
    }
}

fn load(workspace: &Path) -> anyhow::Result<FlipcheckConfig> {
    let config =
        load_config(Some(workspace)).map_err(|e| anyhow::anyhow!("Configuration error: {e}"))?;
    debug!(workspace = %workspace.display(), "Loaded configuration");
    Ok(config)
}

/// Relative paths are taken from the workspace.
fn resolve(workspace: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        workspace.join(path)
    }
}

async fn handle_build(config: FlipcheckConfig, json: bool) -> anyhow::Result<()> {
    let summary = async {
        let builder = DatasetBuilder::from_config(config)?;
        builder.run().await
    }
    .await
    .context("could not build dataset")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{summary}");
        if let Some(output) = &summary.output {
            println!("\nNext: flipcheck validate {}", output.display());
        }
    }
    Ok(())
}

fn handle_validate(config: FlipcheckConfig, path: &Path, json: bool) -> anyhow::Result<()> {
    let report = config
        .validate()
        .and_then(|()| MetricsValidator::new(config.validate.clone()).validate_path(path))
        .context("could not validate dataset")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{report}");
    }
    Ok(())
}

fn handle_config(action: ConfigAction, workspace: &Path) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let config_path = workspace_config_path(workspace);
            if config_path.exists() {
                println!(
                    "Configuration file already exists at: {}",
                    config_path.display()
                );
                return Ok(());
            }
            if let Some(dir) = config_path.parent() {
                std::fs::create_dir_all(dir)?;
            }

            let toml_str = toml::to_string_pretty(&FlipcheckConfig::default())?;
            std::fs::write(&config_path, &toml_str)?;
            println!(
                "Created default configuration at: {}",
                config_path.display()
            );
            Ok(())
        }
        ConfigAction::Show => {
            let config = load(workspace)?;
            println!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
    }
}
