//! Live view demo
//!
//! Opens two tiles against an in-memory relay and plays the device side:
//! every stream request is answered, so the tiles go through a full
//! offer/answer exchange without a backend.

use bvision::{init_logging, Device, LiveView, MemoryRelay, SessionEvent};
use bvision_signaling::protocol::topic;
use bvision_signaling::testing::FakePeerFactory;
use bvision_signaling::{SessionDescription, SignalingAction, SignalingEnvelope};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging()?;

    println!("BVision live view demo");
    println!("======================");

    let relay = MemoryRelay::new();
    let (events_tx, mut events) = mpsc::unbounded_channel();
    let view = LiveView::builder("hub-demo")
        .transport(Arc::new(relay.clone()))
        .peer_factory(Arc::new(FakePeerFactory::new()))
        .events(events_tx)
        .build()?;

    // Device side: answer every stream request
    let mut requests = relay.watch_published();
    let device_side = relay.clone();
    tokio::spawn(async move {
        while let Some(envelope) = requests.recv().await {
            let payload = envelope.payload();
            if payload.action != SignalingAction::RequestStream {
                continue;
            }
            let session_id = payload.value.session_id.clone();
            let answer = SignalingEnvelope::answer(
                topic("hub-demo", &payload.device_id),
                &payload.device_id,
                &session_id,
                &SessionDescription::answer("v=0\r\ns=demo-camera\r\n"),
            );
            match answer {
                Ok(answer) => {
                    device_side.deliver(answer);
                }
                Err(e) => eprintln!("Failed to build answer: {e}"),
            }
        }
    });

    let now = chrono::Utc::now();
    for key in ["lobby", "loading-dock"] {
        let camera = Device {
            id: format!("id-{key}"),
            key: key.to_string(),
            name: key.to_string(),
            last_heartbeat: Some(now.to_rfc3339()),
            ..Default::default()
        };
        view.open_tile(&camera).await?;
        println!("Opened tile {key}");
    }

    tokio::time::sleep(Duration::from_millis(100)).await;
    for snapshot in view.snapshots() {
        println!(
            "  {:<14} {:<12} session {}",
            snapshot.device_key.unwrap_or_default(),
            snapshot.state.as_str(),
            snapshot
                .session_id
                .map(|id| id.to_string())
                .unwrap_or_default()
        );
    }

    view.close_all();
    while let Ok(event) = events.try_recv() {
        if let SessionEvent::StateChanged { device_key, state } = event {
            println!("  event: {device_key} -> {state}");
        }
    }
    println!("All tiles closed");
    Ok(())
}
