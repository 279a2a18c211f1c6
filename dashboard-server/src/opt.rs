use clap::{Parser, Subcommand};
use clio::Input;

#[derive(Debug, Parser)]
#[command(name = "dashboard-server", about = "Intern dashboard service")]
pub struct Opt {
    /// Config file path, defaults are used if not given
    #[arg(short, long, value_parser)]
    pub config: Option<Input>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Prints the password digest for the `users` config entry
    Digest { username: String, password: String },
}
