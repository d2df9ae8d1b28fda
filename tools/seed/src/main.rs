//! Seed tool: posts sample events to a running events service.
//!
//! # Usage
//!
//! ```bash
//! # Three events for the default tenant
//! cargo run -p herald-seed -- --base-url http://localhost:8080 --count 3
//!
//! # Explicit tenant and event type
//! SEED_TENANT_ID=t1 cargo run -p herald-seed -- --event-type UserJoined
//! ```
//!
//! Exits 1 on the first rejected request.

use anyhow::Result;
use clap::Parser;

mod publisher;

use publisher::Publisher;

#[derive(Parser)]
#[command(about = "Post sample events to the events service")]
struct Args {
    /// Base URL of the events service
    #[arg(long, default_value = "http://localhost:8080")]
    base_url: String,

    /// Tenant the events are recorded for
    #[arg(long, env = "SEED_TENANT_ID", default_value = "11111111-1111-1111-1111-111111111111")]
    tenant: String,

    /// Number of events to post
    #[arg(long, default_value_t = 1)]
    count: u32,

    /// Message prefix; the current time is appended
    #[arg(long, default_value = "Hello")]
    text: String,

    /// Event type sent with each event (the service default when omitted)
    #[arg(long)]
    event_type: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let publisher = Publisher::new(&args.base_url, &args.tenant);

    for _ in 0..args.count {
        let queued = publisher
            .publish(&args.text, args.event_type.as_deref())
            .await?;
        println!(
            "Inserted event {} (aggregate {}) for tenant {}",
            queued.event_id, queued.aggregate_id, args.tenant
        );
    }
    Ok(())
}
