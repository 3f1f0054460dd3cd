#[tokio::main]
async fn main() -> anyhow::Result<()> {
    finovia_server::start().await
}
