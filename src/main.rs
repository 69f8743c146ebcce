#[tokio::main]
async fn main() {
    atlasgate::logging::init();
    if let Err(err) = atlasgate::mcp::server::run_stdio().await {
        eprintln!("atlasgate: {}", err);
        std::process::exit(1);
    }
}
