//! The relay itself: wires the ingress pipeline, the control-plane router,
//! and egress dispatch together around one shared configuration snapshot.
//! Mirrors the original's `received_mqtt_message` dispatch, split so that
//! pure classification stays in `relay_core` and every side effect
//! (persisting config, restarting, driving the UI subprocess, resyncing the
//! whitelist) lives here.

use std::path::PathBuf;
use std::sync::Arc;

use rumqttc::{AsyncClient, QoS};
use serde_json::Value;
use tracing::{error, info, warn};

use relay_core::config::mutation::{apply_update, ListMode};
use relay_core::config::redact::safe_snapshot;
use relay_core::config::SnapshotCell;
use relay_core::control_plane::{classify, ControlTopic};
use relay_core::egress::{HttpEgress, WebSocketEgress};
use relay_core::logging::TracingLogger;
use relay_core::normalize::normalize;
use relay_core::pipeline::IngressPipeline;
use relay_core::whitelist_sync::{sync_whitelist, FtpCredentials};

use crate::config_file;
use crate::supervisor::UiSupervisor;

pub(crate) struct Bridge {
    pub(crate) config_path: PathBuf,
    pub(crate) snapshot: Arc<SnapshotCell>,
    pub(crate) pipeline: Arc<IngressPipeline>,
    pub(crate) http_egress: HttpEgress,
    pub(crate) ws_egress: WebSocketEgress,
    pub(crate) mqtt: AsyncClient,
    pub(crate) supervisor: tokio::sync::Mutex<UiSupervisor>,
    pub(crate) headless: bool,
}

impl Bridge {
    pub(crate) fn new(config_path: PathBuf, snapshot: Arc<SnapshotCell>, mqtt: AsyncClient, headless: bool) -> Self {
        let current = snapshot.load();
        let pipeline = Arc::new(IngressPipeline::new(current.general.cache_size));
        pipeline.update_subscription_filters(&current.topics.subscription_filters, &TracingLogger);

        let http_egress = HttpEgress::new(
            &current.miniserver.miniserver_ip,
            current.miniserver.miniserver_port,
            current.miniserver.miniserver_max_parallel_connections,
            current.miniserver.miniserver_user.clone(),
            current.miniserver.miniserver_pass.clone(),
        );
        let ws_egress = WebSocketEgress::new(&current.miniserver.miniserver_ip, current.miniserver.miniserver_port);

        Self {
            config_path,
            snapshot,
            pipeline,
            http_egress,
            ws_egress,
            mqtt,
            supervisor: tokio::sync::Mutex::new(UiSupervisor::new()),
            headless,
        }
    }

    /// Handle one incoming MQTT publish: route control-plane subtopics to
    /// their side effects, everything else through the ingress pipeline and
    /// out to the Miniserver.
    pub(crate) async fn handle_message(&self, topic: &str, payload: &[u8]) {
        let current = self.snapshot.load();

        if let Some(control) = classify(&current.general.base_topic, topic) {
            self.handle_control_message(control, payload).await;
            return;
        }

        let (pairs, echoes) = self.pipeline.process(topic, payload, &current);

        for echo in echoes {
            let topic = normalize(&echo.topic);
            self.publish(&format!("{}processedtopics/{topic}", current.general.base_topic), &echo.value)
                .await;
        }

        if !current.miniserver.sync_with_miniserver {
            return;
        }

        for pair in pairs {
            let outcome = if current.miniserver.use_websocket {
                self.ws_egress.send(&pair.topic, &pair.value).await
            } else {
                self.http_egress.dispatch(&pair.topic, &pair.value).await
            };

            if current.debug.publish_forwarded_topics {
                let topic = normalize(&pair.topic);
                let body = serde_json::json!({ "value": pair.value, "http_code": outcome.code }).to_string();
                self.publish(&format!("{}forwardedtopics/{topic}", current.general.base_topic), &body)
                    .await;
            }
            if let Some(err) = outcome.error {
                warn!("delivery of {} failed ({}): {err}", pair.topic, outcome.code);
            }
        }
    }

    async fn handle_control_message(&self, control: ControlTopic, payload: &[u8]) {
        match control {
            ControlTopic::ConfigGet => self.handle_config_get().await,
            ControlTopic::ConfigSet => self.handle_config_mutation(payload, ListMode::Set, true).await,
            ControlTopic::ConfigAdd => self.handle_config_mutation(payload, ListMode::Add, true).await,
            ControlTopic::ConfigRemove => self.handle_config_mutation(payload, ListMode::Remove, true).await,
            ControlTopic::ConfigUpdate => self.handle_config_mutation(payload, ListMode::Set, false).await,
            ControlTopic::ConfigRestart => self.handle_config_restart().await,
            ControlTopic::MiniserverStartup => self.handle_miniserver_startup().await,
            ControlTopic::StartUi => self.handle_start_ui().await,
            ControlTopic::StopUi => self.handle_stop_ui().await,
        }
    }

    async fn handle_config_get(&self) {
        let safe = safe_snapshot(&self.snapshot.load());
        match serde_json::to_string(&safe) {
            Ok(body) => {
                let base = self.snapshot.load().general.base_topic.clone();
                self.publish(&format!("{base}config/response"), &body).await;
            }
            Err(err) => error!("failed to serialize configuration: {err}"),
        }
    }

    /// Payload shape: `{"section": "...", "field": "...", "value": ...}`.
    /// `restart` triggers a process restart after a successful mutation,
    /// matching the original's `restart_relay_incl_ui()` call for
    /// `config/set`, `config/add`, and `config/remove` (but not
    /// `config/update`).
    async fn handle_config_mutation(&self, payload: &[u8], mode: ListMode, restart: bool) {
        let request: Value = match serde_json::from_slice(payload) {
            Ok(value) => value,
            Err(err) => {
                warn!("malformed config mutation payload: {err}");
                return;
            }
        };

        let (Some(section), Some(field)) = (
            request.get("section").and_then(Value::as_str),
            request.get("field").and_then(Value::as_str),
        ) else {
            warn!("config mutation payload missing section/field");
            return;
        };
        let Some(value) = request.get("value") else {
            warn!("config mutation payload missing value");
            return;
        };

        let mut updated = (*self.snapshot.load()).clone();
        if let Err(err) = apply_update(&mut updated, section, field, value, mode) {
            warn!("config mutation rejected: {err}");
            return;
        }

        if section == "topics" && field == "subscription_filters" {
            self.pipeline
                .update_subscription_filters(&updated.topics.subscription_filters, &TracingLogger);
        }
        if section == "topics" && field == "topic_whitelist" {
            self.pipeline.invalidate_whitelist_cache();
        }

        if let Err(err) = config_file::store(&self.config_path, &updated) {
            error!("failed to persist configuration: {err}");
            return;
        }
        self.snapshot.store(updated);
        info!("applied config/{section}/{field} mutation");

        if restart {
            self.handle_config_restart().await;
        }
    }

    async fn handle_config_restart(&self) {
        info!("config/restart requested, exiting for process supervisor to relaunch");
        std::process::exit(0);
    }

    async fn handle_miniserver_startup(&self) {
        self.resync_whitelist().await;
    }

    /// Fetch the whitelist from the Miniserver over FTP and replace the
    /// configured one. Called both on startup and on the
    /// `miniserverevent/startup` control message, matching the original's
    /// `handle_miniserver_sync`.
    pub(crate) async fn resync_whitelist(&self) {
        let current = self.snapshot.load();
        if !current.miniserver.sync_with_miniserver {
            return;
        }
        let host = current.miniserver.miniserver_ip.clone();
        let user = current.miniserver.miniserver_user.clone();
        let password = current.miniserver.miniserver_pass.clone();
        match tokio::task::spawn_blocking(move || {
            let creds = FtpCredentials {
                host: &host,
                user: user.as_deref(),
                password: password.as_deref(),
            };
            sync_whitelist(&creds)
        })
        .await
        {
            Ok(Ok(titles)) => {
                let mut updated = (*current).clone();
                updated.topics.topic_whitelist = titles.into_iter().collect();
                self.pipeline.invalidate_whitelist_cache();
                if let Err(err) = config_file::store(&self.config_path, &updated) {
                    error!("failed to persist resynced whitelist: {err}");
                }
                self.snapshot.store(updated);
                info!("whitelist resynced from miniserver");
            }
            Ok(Err(err)) => {
                error!("whitelist resync failed, keeping configured whitelist: {err}");
            }
            Err(err) => error!("whitelist resync task panicked: {err}"),
        }
    }

    async fn handle_start_ui(&self) {
        self.start_ui().await;
    }

    async fn handle_stop_ui(&self) {
        self.supervisor.lock().await.stop().await;
    }

    /// Start the companion UI subprocess unless running headless. Called
    /// unconditionally at startup and again on a `startui` control message;
    /// `UiSupervisor::start` itself no-ops if a child is already running.
    pub(crate) async fn start_ui(&self) {
        if self.headless {
            return;
        }
        self.supervisor.lock().await.start("loxmqtt-ui", &[]);
    }

    /// Drive the WebSocket egress's receive side for the lifetime of the
    /// process, reconnecting the drain after every disconnect. Spawned once
    /// from the process entrypoint.
    pub(crate) async fn drain_websocket(&self) {
        loop {
            self.ws_egress.drain_incoming().await;
            tokio::time::sleep(std::time::Duration::from_secs(1)).await;
        }
    }

    async fn publish(&self, topic: &str, payload: &str) {
        if let Err(err) = self.mqtt.publish(topic, QoS::AtMostOnce, false, payload).await {
            warn!("failed to publish to {topic}: {err}");
        }
    }
}
