use gatesync_cli::{cli, init_tracing, run};

#[tokio::main]
async fn main() {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("json"));

    let code = match run(&matches).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "Command failed");
            eprintln!("error: {e:#}");
            1
        }
    };
    std::process::exit(code);
}
