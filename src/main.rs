// src/main.rs
use strip_stack::api;
use strip_stack::config::AppConfig;

#[tokio::main]
async fn main() {
    if let Err(err) = dotenvy::dotenv() {
        if !matches!(err, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
        {
            eprintln!("⚠️ Could not load .env: {}", err);
        }
    }

    let app_config = AppConfig::from_env();
    let api_config = app_config.api.clone();
    let solver_config = app_config.solver.clone();

    println!("🚀 Stacking service starting...");
    if let Err(err) = api::start_api_server(api_config.clone(), solver_config).await {
        eprintln!(
            "❌ Could not bind API server to {}: {}",
            api_config.socket_addr(),
            err
        );
        std::process::exit(1);
    }
}
