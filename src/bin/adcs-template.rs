// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 U.S. Federal Government (in countries where recognized)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Certificate Template Command-Line Tool
//!
//! Compares template attribute sets, plans directory writes and publishes
//! templates as an enrollment policy document.
//!
//! # Usage
//!
//! ```text
//! adcs-template [OPTIONS] <COMMAND>
//!
//! Commands:
//!   diff      Show attributes that differ between two attribute sets
//!   plan      Show the replace/clear writes that reach the desired state
//!   policy    Serialize templates into an enrollment policy document
//!   duration  Convert a period such as "6 weeks" to seconds
//!   config    Configuration management
//!
//! Options:
//!   -c, --config <PATH>   Path to configuration file
//!   -v, --verbose         Enable verbose output
//!   -q, --quiet           Suppress non-error output
//!   -h, --help            Print help
//!   -V, --version         Print version
//! ```
//!
//! # Examples
//!
//! ```bash
//! # What would change on WebServer2
//! adcs-template plan --current live/WebServer2.json --desired desired/WebServer2.json
//!
//! # Publish two templates
//! adcs-template policy --output policy.xml WebServer2.json User.json
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;

use adcs_templates::attributes::AttributeMap;
use adcs_templates::config::{ConfigLoader, SyncConfig};
use adcs_templates::directory::InMemoryDirectory;
use adcs_templates::logging::{LogLevel, init_logging};
use adcs_templates::sync::TemplateSynchronizer;
use adcs_templates::template::PolicyTemplate;
use adcs_templates::{Result, TemplateError, diff, parse_duration, xcep};

/// Certificate Template Command-Line Tool
#[derive(Parser)]
#[command(name = "adcs-template")]
#[command(author = "U.S. Federal Government")]
#[command(version = adcs_templates::VERSION)]
#[command(about = "AD CS certificate template reconciliation", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show attributes that differ between two attribute sets
    Diff {
        /// Live template attributes (JSON object)
        #[arg(long, value_name = "JSON")]
        current: PathBuf,

        /// Desired template attributes (JSON object)
        #[arg(long, value_name = "JSON")]
        desired: PathBuf,
    },

    /// Show the replace/clear writes that reach the desired state
    Plan {
        /// Live template attributes (JSON object)
        #[arg(long, value_name = "JSON")]
        current: PathBuf,

        /// Desired template attributes (JSON object)
        #[arg(long, value_name = "JSON")]
        desired: PathBuf,
    },

    /// Serialize templates into an enrollment policy document
    Policy {
        /// Output file (stdout when omitted)
        #[arg(short, long, value_name = "XML")]
        output: Option<PathBuf>,

        /// Write compact XML regardless of configuration
        #[arg(long)]
        compact: bool,

        /// Template attribute files (JSON objects), in document order
        #[arg(value_name = "TEMPLATE", required = true)]
        templates: Vec<PathBuf>,
    },

    /// Convert a period such as "6 weeks" to seconds
    Duration {
        /// Period text: "<count> <unit>"
        #[arg(value_name = "TEXT", num_args = 1.., required = true)]
        text: Vec<String>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,

    /// Validate the configuration file
    Validate,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}: {e}", e.kind());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;

    let mut logging = config.logging.clone();
    if cli.quiet {
        logging.level = LogLevel::Error.to_string();
    } else if cli.verbose {
        logging.level = LogLevel::Debug.to_string();
    }
    init_logging(&logging)?;

    match &cli.command {
        Commands::Diff { current, desired } => cmd_diff(current, desired),
        Commands::Plan { current, desired } => cmd_plan(&config, current, desired),
        Commands::Policy {
            output,
            compact,
            templates,
        } => cmd_policy(cli, &config, output.as_deref(), *compact, templates),
        Commands::Duration { text } => cmd_duration(&text.join(" ")),
        Commands::Config { action } => cmd_config(cli, &config, action),
    }
}

fn load_config(cli: &Cli) -> Result<SyncConfig> {
    let mut loader = ConfigLoader::new().with_validate(false);
    if let Some(path) = &cli.config {
        loader = loader.with_path(path);
    }
    loader.load_or_default()
}

// ============================================================================
// Command Implementations
// ============================================================================

fn cmd_diff(current: &Path, desired: &Path) -> Result<()> {
    let changes = diff(&read_attributes(current)?, &read_attributes(desired)?)?;
    print_json(&changes)
}

fn cmd_plan(config: &SyncConfig, current: &Path, desired: &Path) -> Result<()> {
    let current = read_attributes(current)?;
    let desired = read_attributes(desired)?;

    let name = current
        .get_str("cn")
        .or_else(|| current.get_str("name"))
        .unwrap_or("template")
        .to_string();

    let directory = InMemoryDirectory::new();
    directory.insert_template(name.as_str(), current);

    let outcome = TemplateSynchronizer::from_settings(directory, &config.sync).plan(&name, &desired)?;
    print_json(&outcome)
}

fn cmd_policy(
    cli: &Cli,
    config: &SyncConfig,
    output: Option<&Path>,
    compact: bool,
    files: &[PathBuf],
) -> Result<()> {
    let templates = files
        .iter()
        .map(|path| PolicyTemplate::from_attributes(&read_attributes(path)?))
        .collect::<Result<Vec<_>>>()?;

    let document = xcep::serialize(&templates)?;
    let xml = if config.policy.pretty && !compact {
        document.to_pretty_xml()?
    } else {
        document.to_xml()?
    };

    match output {
        Some(path) => {
            fs::write(path, xml)?;
            if !cli.quiet {
                println!(
                    "Wrote {} policies and {} OIDs to {}",
                    document.policies().len(),
                    document.oid_table().len(),
                    path.display()
                );
            }
        }
        None => println!("{xml}"),
    }
    Ok(())
}

fn cmd_duration(text: &str) -> Result<()> {
    println!("{}", parse_duration(text)?);
    Ok(())
}

fn cmd_config(cli: &Cli, config: &SyncConfig, action: &ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
        ConfigAction::Validate => {
            config.validate()?;
            if !cli.quiet {
                println!("Configuration is valid.");
                println!();
                println!("Summary:");
                println!(
                    "  Server: {}",
                    config.directory.server.as_deref().unwrap_or("(not set)")
                );
                println!("  Dry Run: {}", config.sync.dry_run);
                println!(
                    "  Protected Attributes: {}",
                    config.sync.protected_attributes.len()
                );
                println!("  Log Level: {}", config.logging.level);
            }
            Ok(())
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn read_attributes(path: &Path) -> Result<AttributeMap> {
    let content = fs::read_to_string(path).map_err(|e| {
        TemplateError::missing_input(format!("cannot read {}: {e}", path.display()))
    })?;
    let document: serde_json::Value = serde_json::from_str(&content)?;
    AttributeMap::from_json(&document)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
