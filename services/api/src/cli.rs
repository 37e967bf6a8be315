use crate::demo::{run_demo, DemoArgs};
use crate::server;
use crate::sweep::run_sweep;
use clap::{Args, Parser, Subcommand};
use rentsite::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Rental Microsite Service",
    about = "Run and operate the rental microsite lifecycle service",
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
    /// Delete every expired rental once and exit
    Sweep,
    /// Walk a rental through submission, approval, visits and expiry in memory
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
        Command::Sweep => run_sweep().await,
        Command::Demo(args) => run_demo(args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["rentsite-api"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn serve_accepts_overrides() {
        let cli = Cli::try_parse_from([
            "rentsite-api",
            "serve",
            "--host",
            "0.0.0.0",
            "--port",
            "9000",
        ])
        .expect("parses");
        match cli.command {
            Some(Command::Serve(args)) => {
                assert_eq!(args.host.as_deref(), Some("0.0.0.0"));
                assert_eq!(args.port, Some(9000));
            }
            other => panic!("expected serve, got {other:?}"),
        }
    }

    #[test]
    fn demo_defaults_to_a_week() {
        let cli = Cli::try_parse_from(["rentsite-api", "demo"]).expect("parses");
        match cli.command {
            Some(Command::Demo(args)) => assert_eq!(args.duration, "1 week"),
            other => panic!("expected demo, got {other:?}"),
        }
    }
}
