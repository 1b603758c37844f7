use crate::command::Command;

use clap::Parser;

/// GoodWe Bridge - talk to GoodWe inverters over their local UDP protocol
#[derive(Debug, Parser)]
#[clap(author, version)]
pub struct Options {
    /// Config file to read
    #[clap(short = 'c', long = "config", default_value = "config.yaml")]
    pub config_file: String,

    /// Talk to this host only, ignoring the config file
    #[clap(long = "host")]
    pub host: Option<String>,

    /// UDP port used with --host
    #[clap(long = "port")]
    pub port: Option<u16>,

    /// Inverter family used with --host, skipping discovery
    #[clap(long = "family")]
    pub family: Option<String>,

    #[clap(subcommand)]
    pub command: Command,
}

impl Options {
    pub fn new() -> Self {
        Self::parse()
    }
}
