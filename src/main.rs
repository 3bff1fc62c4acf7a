use anyhow::Context;
use pipesh::{Config, Interpreter};

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let config: Config = argh::from_env();
    log::debug!("starting with {:?}", config);

    let mut shell = Interpreter::new(&config);
    shell.repl().context("line editor failed")?;
    Ok(())
}
