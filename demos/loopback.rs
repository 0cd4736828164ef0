//! Loopback - a control head and a device talking over an in-memory link.
//!
//! This example demonstrates:
//! - Creating two links with the builder pattern
//! - Driving them from tokio byte streams
//! - Dispatching commands with a handler registry
//! - Replies, acknowledgements and subscriptions
//!
//! ```text
//! cargo run --example loopback
//! ```

use std::time::Duration;

use linkbus::handler::HandlerRegistry;
use linkbus::protocol::{Broadcast, DeviceId, MessageId};
use linkbus::transport::{spawn_rx_task, spawn_tx_task};
use linkbus::{Linkbus, Message, MessageType};

fn device_registry() -> HandlerRegistry {
    HandlerRegistry::new()
        .with(MessageId::Version, |_: &Message, link: &Linkbus| {
            let mut reply = Message::outbound(MessageType::Reply, MessageId::Version);
            reply.push_field(env!("CARGO_PKG_VERSION"))?;
            link.send_reply(&reply)
        })
        .with(MessageId::StationId, |msg: &Message, link: &Linkbus| {
            if let Some(call) = msg.field(0).filter(|c| !c.is_empty()) {
                println!("device: station id set to {}", call);
            }
            link.ack()
        })
        .with(MessageId::Battery, |msg: &Message, link: &Linkbus| {
            if msg.is_poll() {
                link.subscribe(Broadcast::BATTERY);
            }
            let mut reply = Message::outbound(MessageType::Reply, MessageId::Battery);
            reply.push_field("3300")?;
            link.send_reply(&reply)
        })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (head_io, device_io) = tokio::io::duplex(256);
    let (head_reader, head_writer) = tokio::io::split(head_io);
    let (device_reader, device_writer) = tokio::io::split(device_io);

    let (head, head_rx, head_tx) = Linkbus::builder().device(DeviceId::ControlHead).build()?;
    let (device, device_rx, device_tx) = Linkbus::builder().device(DeviceId::Transmitter).build()?;

    spawn_rx_task(head_reader, head_rx);
    let head_task = spawn_tx_task(head_writer, head_tx);
    spawn_rx_task(device_reader, device_rx);
    let device_task = spawn_tx_task(device_writer, device_tx);

    let registry = device_registry();

    for command in ["$VER?", "$ID,W1FOX;", "$BAT?"] {
        head.send(command).await?;
    }

    let deadline = tokio::time::Instant::now() + Duration::from_secs(1);
    while tokio::time::Instant::now() < deadline {
        while let Some(result) = registry.poll(&device) {
            if let Err(e) = result {
                eprintln!("device: {}", e);
            }
        }
        while let Some(msg) = head.next_message() {
            println!("head: {:?} {} {:?}", msg.kind(), msg.id(), msg.fields());
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    println!(
        "device battery subscription: {}",
        device.is_subscribed(Broadcast::BATTERY)
    );

    head.close();
    device.close();
    head_task.await??;
    device_task.await??;

    Ok(())
}
