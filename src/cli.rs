use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "session-panel")]
#[command(about = "Session limit control panel (in-memory tables + LP redistribution)", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the HTTP JSON API over the in-memory sample tables.
    Serve(ServeArgs),
    /// Print the joined panel view to stdout.
    Panel,
    /// Run the session redistribution once and print the result.
    Solve,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ServeArgs {
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    #[arg(long, default_value_t = 8787)]
    pub port: u16,
}
