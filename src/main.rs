use clap::Parser;
use edu_ledger::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve => cli::serve::run().await,
        Command::Pix(args) => cli::pix::run(args).await,
    }
}
