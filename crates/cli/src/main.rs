use std::process::ExitCode;

fn main() -> ExitCode {
    offerwise_cli::run()
}
