use env_logger::Env;
use lib::cli::interface::run_cli_interface;
use std::process::ExitCode;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    run_cli_interface().await
}
