//! CLI module for Edu Ledger
//!
//! - `serve`: HTTP server
//! - `pix <amount>`: print a payment code for the configured payee

pub mod pix;
pub mod serve;

use clap::{Parser, Subcommand};

/// Edu Ledger - balance metering and PIX recharges
#[derive(Parser)]
#[command(name = "edu-ledger")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP server
    Serve,

    /// Print the PIX payload for an amount
    Pix(pix::PixArgs),
}
