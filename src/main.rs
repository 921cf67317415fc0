use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    digit_facts_lib::init_tracing();

    match digit_facts_lib::run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
