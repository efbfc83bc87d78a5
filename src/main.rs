use clap::Parser;
use nova::cli::commands::{Cli, Commands};
use nova::cli::{handlers, logging};

fn main() {
    let cli = Cli::parse();
    let workspace_dir = cli.workspace_dir.clone();

    match cli.command {
        None => {
            // No subcommand → launch TUI (logs go to a file inside the workspace)
            if let Err(e) = nova::tui::run(workspace_dir.as_deref(), cli.verbose, cli.quiet) {
                eprintln!("error: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Init(args)) => {
            logging::init_stderr(cli.verbose, cli.quiet);
            // Init is handled before workspace discovery
            if let Err(e) = handlers::cmd_init(args, workspace_dir.as_deref()) {
                eprintln!("error: {}", e);
                std::process::exit(1);
            }
        }
        Some(_) => {
            logging::init_stderr(cli.verbose, cli.quiet);
            if let Err(e) = handlers::dispatch(cli) {
                eprintln!("error: {}", e);
                std::process::exit(1);
            }
        }
    }
}
