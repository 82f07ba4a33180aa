// src/commands/mod.rs
//! Command handlers for the syspurpose CLI

mod purpose;

pub use purpose::{
    cmd_add, cmd_remove, cmd_set, cmd_show, cmd_sync, cmd_unset, cmd_valid_fields, StoreOptions,
};
