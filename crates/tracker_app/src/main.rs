mod app;
mod cli;
mod commands;
mod config;
mod logging;
mod render;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let options = cli::parse_args(std::env::args().skip(1))?;
    if options.help {
        println!("{}", cli::USAGE);
        return Ok(());
    }

    app::run(options).await
}
