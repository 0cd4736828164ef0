//! Console - a device answering on stdin/stdout.
//!
//! Type frames such as `$VER?` or `$GO;` and the device answers on stdout.
//! Close stdin (Ctrl-D) to exit.
//!
//! ```text
//! cargo run --example console
//! ```

use std::time::Duration;

use linkbus::handler::HandlerRegistry;
use linkbus::protocol::MessageId;
use linkbus::transport::{spawn_rx_task, spawn_tx_task};
use linkbus::{Linkbus, Message, MessageType};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (link, rx, tx) = Linkbus::init(57_600)?;
    let mut rx_task = spawn_rx_task(tokio::io::stdin(), rx);
    let tx_task = spawn_tx_task(tokio::io::stdout(), tx);

    let registry = HandlerRegistry::new()
        .with(MessageId::Go, |_: &Message, link: &Linkbus| link.ack())
        .with(MessageId::Version, |_: &Message, link: &Linkbus| {
            let mut reply = Message::outbound(MessageType::Reply, MessageId::Version);
            reply.push_field(env!("CARGO_PKG_VERSION"))?;
            link.send_reply(&reply)
        });

    link.send_help()?;
    link.send_new_prompt()?;

    let mut ticker = tokio::time::interval(Duration::from_millis(10));
    loop {
        tokio::select! {
            result = &mut rx_task => {
                result??;
                break;
            }
            _ = ticker.tick() => {
                while let Some(result) = registry.poll(&link) {
                    if let Err(e) = result {
                        link.send_string(&format!("! {}\n", e), linkbus::SendMode::FailFast).ok();
                    }
                    link.send_new_prompt()?;
                }
            }
        }
    }

    link.close();
    tx_task.await??;
    Ok(())
}
