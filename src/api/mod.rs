pub mod cli;

pub use cli::{AccountCommand, Cli, CliError, CliHandler, Commands, ConfigCommand, TxCommand};
