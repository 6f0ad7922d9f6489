//! Command-line plumbing for Schelling runs, sweeps, and the reference demo.

pub mod cli;
pub mod driver;

use anyhow::Result;

pub use cli::{Cli, Command, ConfigArgs, DemoArgs, OrderArg, OutputArgs, RunArgs, SweepArgs};
pub use driver::{DemoReport, RunReport, SweepReport, execute_demo, execute_run, execute_sweep};

/// Run the parsed command to completion.
pub fn dispatch(cli: &Cli) -> Result<()> {
    match &cli.command {
        Command::Run(args) => {
            execute_run(args)?;
        }
        Command::Sweep(args) => {
            execute_sweep(args)?;
        }
        Command::Demo(args) => {
            execute_demo(args)?;
        }
    }
    Ok(())
}
