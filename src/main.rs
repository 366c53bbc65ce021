use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    match sysiq_cli::run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("sysiq: {:#}", e);
            ExitCode::from(1)
        }
    }
}
