#[tokio::main]
async fn main() {
    if let Err(err) = restcheck::mcp::server::run_stdio().await {
        eprintln!("restcheck: {}", err);
        std::process::exit(1);
    }
}
