//! MQTT transport wiring: connect to the broker, subscribe to the configured
//! topics plus the reserved control-plane subtopics, and hand each arriving
//! publish to the caller in order.

use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use tracing::{debug, warn};

use relay_core::config::SnapshotInner;

/// Options the event loop reconnects with forever; rumqttc's own
/// `EventLoop::poll` already retries on disconnect, so the caller just needs
/// to keep calling `next_message` in a loop.
pub(crate) fn build_options(snapshot: &SnapshotInner) -> MqttOptions {
    let mut options = MqttOptions::new(
        snapshot.broker.client_id.clone(),
        snapshot.broker.host.clone(),
        snapshot.broker.port,
    );
    options.set_keep_alive(std::time::Duration::from_secs(30));
    if let (Some(user), Some(password)) = (&snapshot.broker.user, &snapshot.broker.password) {
        options.set_credentials(user.as_str(), password.as_str());
    }
    options
}

pub(crate) async fn subscribe_all(client: &AsyncClient, snapshot: &SnapshotInner) {
    let base = snapshot.general.base_topic.trim_end_matches('/');
    let control_subtopics = [
        "config/get",
        "config/set",
        "config/add",
        "config/remove",
        "config/update",
        "config/restart",
        "miniserverevent/startup",
        "startui",
        "stopui",
    ];

    for suffix in control_subtopics {
        let topic = format!("{base}/{suffix}");
        if let Err(err) = client.subscribe(&topic, QoS::AtMostOnce).await {
            warn!("failed to subscribe to {topic}: {err}");
        }
    }

    for topic in &snapshot.topics.subscriptions {
        if let Err(err) = client.subscribe(topic, QoS::AtMostOnce).await {
            warn!("failed to subscribe to {topic}: {err}");
        }
    }
}

/// One incoming publish, detached from rumqttc's own event type.
pub(crate) struct IncomingMessage {
    pub(crate) topic: String,
    pub(crate) payload: Vec<u8>,
}

/// Poll the event loop until the next publish arrives, silently skipping
/// every other event kind (ack, pingresp, connection bookkeeping).
/// `rumqttc` itself handles reconnection; a transient `Err` here just means
/// the caller should poll again.
pub(crate) async fn next_message(eventloop: &mut EventLoop) -> IncomingMessage {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                return IncomingMessage {
                    topic: publish.topic,
                    payload: publish.payload.to_vec(),
                };
            }
            Ok(_) => continue,
            Err(err) => {
                debug!("mqtt event loop error, retrying: {err}");
                tokio::time::sleep(std::time::Duration::from_secs(1)).await;
                continue;
            }
        }
    }
}
