use std::process::ExitCode;

fn main() -> ExitCode {
    assetscope_cli::run()
}
