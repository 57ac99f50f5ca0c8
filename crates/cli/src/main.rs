use std::process::ExitCode;

fn main() -> ExitCode {
    conclave_cli::run()
}
