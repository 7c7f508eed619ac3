mod host;
mod store;
mod templog;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    host::run().await
}
