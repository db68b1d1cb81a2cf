use docker_registry_client::cli::{Args, Runner};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse_args();

    let runner = match Runner::new(args) {
        Ok(runner) => runner,
        Err(e) => {
            eprintln!("❌ ERROR: {}", e);
            Args::print_examples();
            return ExitCode::FAILURE;
        }
    };

    match runner.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            runner.output().error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}
