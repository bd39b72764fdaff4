use server::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    server::start_server(ServerConfig::load()?).await
}
