#[tokio::main]
async fn main() -> std::io::Result<()> {
    game_server::run_with_config().await
}
