//! Pix command - prints a payment code without starting the server

use anyhow::Context;
use clap::Args;
use rust_decimal::Decimal;

use crate::config::AppConfig;

#[derive(Debug, Args)]
pub struct PixArgs {
    /// Amount with at most two fractional digits, e.g. 20.00
    pub amount: Decimal,

    /// Overrides `pix.payee_key` from the configuration
    #[arg(long)]
    pub payee_key: Option<String>,
}

/// Print the payload for `args.amount`
pub async fn run(args: PixArgs) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let mut config = AppConfig::load().context("Failed to load configuration")?;
    if let Some(key) = args.payee_key {
        config.pix.payee_key = key;
    }

    let encoder = crate::create_pix_encoder(&config)
        .context("A valid PIX payee key is required (set pix.payee_key or --payee-key)")?;
    let payload = encoder.encode(args.amount)?;

    println!("{}", payload);

    Ok(())
}
