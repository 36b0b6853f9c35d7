mod cli;
mod paths;
mod run;

use anyhow::Result;
use cli::Command;

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();

    match cli.command {
        Some(Command::Uniforms) => run::print_uniforms(&cli.run),
        Some(Command::Where) => run::print_config_location(&cli.run),
        None => run::run(cli.run),
    }
}
