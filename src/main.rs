use clap::Parser;
use log::{error, info};
use naumachia::build_driver::BuildDriver;
use naumachia::cli::{Cli, Command};
use naumachia::controller::Configurator;
use naumachia::process::SystemRunner;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    env_logger::Builder::from_default_env()
        .filter_level(cli.verbosity.level_filter())
        .format_target(false)
        .init();

    match cli.command {
        Command::Configure(args) => {
            let options = args.into_options();
            info!("Importing configuration from {}", options.config.display());

            let configurator = Configurator::new(SystemRunner, options);
            match configurator.run().await {
                Ok(report) => info!(
                    "Deployment written to {} ({} challenges)",
                    report.compose.display(),
                    report.configured.len()
                ),
                Err(e) => {
                    error!("Unable to configure the deployment: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Command::Build(args) => {
            let root = args.root.clone();
            let driver = BuildDriver::new(SystemRunner, args.into_options());
            if let Err(e) = driver.run(&root).await {
                error!("Build aborted: {}", e);
                std::process::exit(1);
            }
        }
    }
}
