use std::path::PathBuf;

use clap::Parser;

#[derive(Parser)]
#[command(name = "loxmqtt-bridge")]
#[command(about = "Bidirectional MQTT-to-Miniserver bridge", long_about = None)]
#[command(version)]
pub(crate) struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "config.toml")]
    pub(crate) config: PathBuf,

    /// Override the configured log level.
    #[arg(long)]
    pub(crate) log_level: Option<String>,

    /// Run without starting the companion UI subprocess.
    #[arg(long)]
    pub(crate) headless: bool,
}
