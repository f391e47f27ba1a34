use crate::demo::{run_demo, run_hours, DemoArgs, HoursArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use legal_review::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Legal Review Workflow",
    about = "Run and demonstrate the legal review request workflow from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Count business hours between two instants using the configured calendar
    Hours(HoursArgs),
    /// Walk a sample request through dual review, a resubmission and a hold
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Hours(args) => run_hours(args),
        Command::Demo(args) => run_demo(args).await,
    }
}
