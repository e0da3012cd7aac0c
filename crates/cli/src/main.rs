use std::process::ExitCode;

fn main() -> ExitCode {
    pricebook_cli::run()
}
