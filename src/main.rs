//! Taskmaster - stack-based personal task tracking

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = taskmaster::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
