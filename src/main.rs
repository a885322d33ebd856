mod cli;
mod runner;

#[tokio::main]
async fn main() {
    let code = match cli::parse_cli() {
        Ok(cli) => runner::run_from_cli(cli).await,
        Err(code) => code,
    };
    std::process::exit(i32::from(code));
}
