use clap::Parser;

/// Decora assistant — chat with the design assistant from a terminal.
#[derive(Parser, Debug)]
#[command(name = "decora", version, about)]
pub struct Args {
    /// Base URL of the assistant backend service.
    #[arg(long, default_value = "http://127.0.0.1:8790")]
    pub backend_url: String,

    /// Bearer token for the backend, if it requires one.
    #[arg(long)]
    pub token: Option<String>,

    /// Host context JSON sent with every chat turn (e.g. '{"project":"loft"}').
    #[arg(long)]
    pub context: Option<String>,

    /// Log level override (debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,
}

pub fn parse() -> Args {
    Args::parse()
}
