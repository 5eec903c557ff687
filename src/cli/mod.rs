mod args;
mod commands;

pub use args::{Cli, Commands, ConfigSubcommands};
pub use commands::{ask, build_client, print_reindex, print_status, resolve_config};
