//! Recordings demo
//!
//! Signs in to a BVision Hub configured through `BVISION_*` variables and
//! pages through the recordings of the first online device.
//!
//! ```text
//! BVISION_API_BASE_URL=https://hub.example.com/api \
//! BVISION_USER=operator BVISION_PASSWORD=secret \
//! cargo run --example recordings_demo
//! ```

use anyhow::Context;
use bvision::{init_logging, BVision};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging()?;

    let hub = BVision::init()?;
    println!("{} {}", hub.config().app_name, hub.config().app_version);

    let user = std::env::var("BVISION_USER").context("BVISION_USER is not set")?;
    let password = std::env::var("BVISION_PASSWORD").context("BVISION_PASSWORD is not set")?;
    let me = hub.auth().sign_in(&user, &password).await?;
    println!("Signed in as {}", me.username);

    let now = chrono::Utc::now();
    let summary = hub.workbench(now).await?;
    println!("Devices online: {}", summary.devices_label());
    println!("Sites online:   {}", summary.sites_label());
    println!("Recordings:     {}", summary.recordings_total);

    let online = hub.devices().online_devices(now).await?;
    let mut browser = hub.recordings();
    if let Some(device) = online.first() {
        browser.toggle_device(&device.name);
        println!("Filtering on {}", device.name);
    }

    for _ in 0..2 {
        browser.fetch().await?;
        println!("{}", browser.summary());
        for card in browser.cards() {
            println!(
                "  {:<10} {} - {}  {:>5}s  {}",
                card.month_day,
                card.start,
                card.end,
                card.duration.as_secs(),
                card.device_name
            );
        }
        if browser.recordings().is_empty() {
            break;
        }
        browser.next_page();
    }

    hub.auth().logout().await?;
    Ok(())
}
