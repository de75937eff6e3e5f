use std::process::ExitCode;

fn main() -> ExitCode {
    mulliond::run()
}
