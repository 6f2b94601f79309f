//! Example: one master-side gimbal handoff against a scripted link
//!
//! Drives a `RemoteController` through the grant cycle without hardware:
//! two slaves attach, one asks for the gimbal, the master grants it, reads
//! the permission table back and then takes the grant home again.

use std::collections::HashMap;
use std::error::Error;
use std::sync::Arc;

use async_trait::async_trait;
use dualrc_lib::RemoteController;
use dualrc_lib::arbiter::ArbiterEvent;
use dualrc_lib::identity::{RcId, RcIdentity};
use dualrc_lib::session::{ProductCapabilities, Role, SessionEvent};
use dualrc_lib::telemetry::{TelemetryKind, TelemetrySample};
use dualrc_lib::transport::{Reply, Request, Transport, TransportError};
use tokio::sync::{Mutex, mpsc};
use tracing::info;

/// Link whose firmware half is a fixed script: master role, three slave
/// slots, an Ack for every write.
struct ScriptedLink {
    slaves: Vec<RcIdentity>,
    channels: Mutex<HashMap<TelemetryKind, mpsc::Sender<TelemetrySample>>>,
}

impl ScriptedLink {
    fn new(slaves: Vec<RcIdentity>) -> Self {
        Self {
            slaves,
            channels: Mutex::new(HashMap::new()),
        }
    }

    /// Deliver a push on the matching telemetry stream.
    async fn push(&self, sample: TelemetrySample) {
        let sender = self.channels.lock().await.get(&sample.kind()).cloned();
        if let Some(sender) = sender {
            let _ = sender.send(sample).await;
        }
    }
}

#[async_trait]
impl Transport for ScriptedLink {
    async fn send_request(&self, request: Request) -> Result<Reply, TransportError> {
        match request {
            Request::GetCapabilities => Ok(Reply::Capabilities(ProductCapabilities {
                supports_master_slave: true,
                supports_remote_focus: false,
                max_slaves: 3,
            })),
            Request::GetRole => Ok(Reply::Role {
                role: Role::Master,
                connected: true,
            }),
            Request::GetSlaveList => Ok(Reply::SlaveList(self.slaves.clone())),
            _ => Ok(Reply::Ack),
        }
    }

    async fn subscribe(
        &self,
        kind: TelemetryKind,
    ) -> Result<mpsc::Receiver<TelemetrySample>, TransportError> {
        let (sender, receiver) = mpsc::channel(16);
        self.channels.lock().await.insert(kind, sender);
        Ok(receiver)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

    let wing_one = RcIdentity::new(RcId(7)).with_name("WING-1");
    let wing_two = RcIdentity::new(RcId(8)).with_name("WING-2");
    let link = Arc::new(ScriptedLink::new(vec![wing_one.clone(), wing_two.clone()]));

    let controller =
        RemoteController::connect(link.clone(), RcIdentity::new(RcId(1)).with_name("LEAD"))
            .await?;
    let mut sessions = controller.subscribe_session_events();
    let mut requests = controller.subscribe_gimbal_requests();

    link.push(TelemetrySample::Session(SessionEvent::SlaveJoined(wing_one.clone())))
        .await;
    link.push(TelemetrySample::Session(SessionEvent::SlaveJoined(wing_two)))
        .await;
    // Both joins must land before the request names an attached slave.
    sessions.recv().await?;
    sessions.recv().await?;
    link.push(TelemetrySample::GimbalRequest(wing_one)).await;

    loop {
        if let ArbiterEvent::RequestPending(request) = requests.recv().await? {
            info!(requester = %request.requester.id, "granting the request");
            controller
                .respond_to_gimbal_request(request.requester.id, true)
                .await?;
            break;
        }
    }

    for slave in controller.slave_list().await? {
        info!(
            id = %slave.id,
            gimbal = slave.permissions.has_full_gimbal(),
            "attached slave"
        );
    }
    let own = controller.own_permissions().await;
    info!(?own, "after the grant");

    controller.revoke_gimbal_control().await?;
    let holder = controller.gimbal_holder().await;
    info!(%holder, "after the revoke");

    Ok(())
}
