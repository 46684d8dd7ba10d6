use crate::cli::run;

pub mod cli;
mod config;
pub mod domain;
pub mod publish;
pub mod squeeze;

fn main() -> anyhow::Result<()> {
    run()
}
