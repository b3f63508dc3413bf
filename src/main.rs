use std::process::ExitCode;

fn main() -> ExitCode {
    match elb_logs::run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
