use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    recap_cli::run_cli().await
}
