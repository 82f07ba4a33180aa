// src/cli/mod.rs
//! CLI definitions for the syspurpose tool
//!
//! This module contains the command-line interface definitions using clap.
//! The command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use syspurpose::{ConflictPolicy, DEFAULT_CONFIG_PATH};

#[derive(Parser)]
#[command(name = "syspurpose")]
#[command(author, version)]
#[command(about = "View and synchronize system purpose attributes", long_about = None)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Only edit the local file; don't contact the entitlement server
    #[arg(long, global = true)]
    pub no_sync: bool,

    /// Which side wins when both changed a field (remote or local)
    #[arg(long, global = true, value_name = "POLICY", value_parser = ConflictPolicy::from_name)]
    pub on_conflict: Option<ConflictPolicy>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the current system purpose
    Show {
        /// Attribute to show (all if omitted)
        key: Option<String>,
    },

    /// Set an attribute to a single value
    Set {
        /// Attribute name (role, usage, service_level_agreement, ...)
        key: String,

        /// New value
        value: String,
    },

    /// Clear an attribute
    Unset {
        /// Attribute name
        key: String,
    },

    /// Add values to a list attribute
    Add {
        /// Attribute name (usually addons)
        key: String,

        /// Values to add
        #[arg(required = true)]
        values: Vec<String>,
    },

    /// Remove values from a list attribute
    Remove {
        /// Attribute name (usually addons)
        key: String,

        /// Values to remove
        #[arg(required = true)]
        values: Vec<String>,
    },

    /// Reconcile the local file with the entitlement server
    Sync,

    /// List the values the entitlement server accepts
    ValidFields {
        /// Attribute to list (all if omitted)
        key: Option<String>,
    },
}
