//! Portfolio API - binary entry point.
//! Delegates to the library for all app logic.

#[tokio::main]
async fn main() {
    portfolio_api::run().await;
}
