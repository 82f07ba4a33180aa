// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Attribute name argument shared by the edit commands
fn key_arg(required: bool) -> Arg {
    Arg::new("key")
        .required(required)
        .help("Attribute name (role, usage, service_level_agreement, addons)")
}

fn build_cli() -> Command {
    Command::new("syspurpose")
        .version(env!("CARGO_PKG_VERSION"))
        .about("View and synchronize system purpose attributes")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("PATH")
                .global(true)
                .default_value("/etc/rhsm/syspurpose/syspurpose.toml")
                .help("Path to the configuration file"),
        )
        .arg(
            Arg::new("no_sync")
                .long("no-sync")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Only edit the local file; don't contact the entitlement server"),
        )
        .arg(
            Arg::new("on_conflict")
                .long("on-conflict")
                .value_name("POLICY")
                .global(true)
                .value_parser(["remote", "local"])
                .help("Which side wins when both changed a field"),
        )
        .subcommand(
            Command::new("show")
                .about("Show the current system purpose")
                .arg(key_arg(false)),
        )
        .subcommand(
            Command::new("set")
                .about("Set an attribute to a single value")
                .arg(key_arg(true))
                .arg(Arg::new("value").required(true).help("New value")),
        )
        .subcommand(
            Command::new("unset")
                .about("Clear an attribute")
                .arg(key_arg(true)),
        )
        .subcommand(
            Command::new("add")
                .about("Add values to a list attribute")
                .arg(key_arg(true))
                .arg(
                    Arg::new("values")
                        .required(true)
                        .num_args(1..)
                        .help("Values to add"),
                ),
        )
        .subcommand(
            Command::new("remove")
                .about("Remove values from a list attribute")
                .arg(key_arg(true))
                .arg(
                    Arg::new("values")
                        .required(true)
                        .num_args(1..)
                        .help("Values to remove"),
                ),
        )
        .subcommand(Command::new("sync").about("Reconcile the local file with the entitlement server"))
        .subcommand(
            Command::new("valid-fields")
                .about("List the values the entitlement server accepts")
                .arg(key_arg(false)),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => {
            println!("cargo:warning=CARGO_MANIFEST_DIR not set: {}", e);
            return;
        }
    };
    let man_dir = manifest_dir.join("man");

    if let Err(e) = fs::create_dir_all(&man_dir) {
        println!("cargo:warning=Failed to create man directory: {}", e);
        return;
    }

    let man = Man::new(build_cli());
    let mut buffer = Vec::new();

    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=Failed to render man page: {}", e);
        return;
    }

    let man_path = man_dir.join("syspurpose.1");
    if let Err(e) = fs::write(&man_path, buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
    }
}
