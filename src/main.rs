use clap::Parser;

#[derive(clap::Parser)]
#[clap(name = "dashvend", version, about = "Cognito-federated QuickSight dashboard embed URL service")]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Start the embed URL HTTP service
    Serve {
        #[clap(flatten)]
        config: dashvend::config::ConfigArgs,
        #[clap(flatten)]
        args: dashvend::cmd::serve::ServeArgs,
    },
}

fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    match cli.command {
        Command::Serve { config, args } => {
            let config = dashvend::config::Config::new(config)?;
            dashvend::cmd::serve::run(&config, &args)
        }
    }
}
