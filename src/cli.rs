use clap::{ArgAction, Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "mailtriage",
    version,
    about = "Classify unread mail, file it into folders and draft replies"
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        default_value = "default",
        help = "Profile name to use"
    )]
    pub profile: String,
    #[arg(long, global = true, help = "Emit JSON output")]
    pub json: bool,
    #[arg(short = 'v', long, global = true, action = ArgAction::Count, help = "Verbose logging")]
    pub verbose: u8,
    /// Without a subcommand a full triage run is performed.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Triage the unread inbox
    Run(RunArgs),
    Auth(AuthArgs),
    Prompts(PromptsArgs),
}

#[derive(Debug, Default, Args)]
pub struct RunArgs {
    #[arg(long, help = "Maximum unread messages to fetch (overrides batch_size)")]
    pub limit: Option<u32>,
    #[arg(long, help = "Classify only; do not create folders, move, mark or draft")]
    pub dry_run: bool,
}

#[derive(Debug, Args)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub command: AuthCommand,
}

#[derive(Debug, Subcommand)]
pub enum AuthCommand {
    Login,
    Status,
    Logout,
}

#[derive(Debug, Args)]
pub struct PromptsArgs {
    #[command(subcommand)]
    pub command: PromptsCommand,
}

#[derive(Debug, Subcommand)]
pub enum PromptsCommand {
    /// Print the active prompt configuration
    Show,
    /// Print the prompt configuration file location
    Path,
    /// Load (migrating if needed) and validate the prompt configuration
    Check,
}
