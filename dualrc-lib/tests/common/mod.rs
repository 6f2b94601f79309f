//! Common test utilities and shared imports

// Allow unused imports and dead code since this is a shared module
// used across multiple test files - not all items are used in every test file
#[allow(unused_imports)]
pub use std::sync::Arc;
#[allow(unused_imports)]
pub use std::time::Duration;

#[allow(unused_imports)]
pub use async_trait::async_trait;
#[allow(unused_imports)]
pub use tokio::sync::{Mutex, mpsc};

#[allow(unused_imports)]
pub use dualrc_lib::RemoteController;
#[allow(unused_imports)]
pub use dualrc_lib::arbiter::{ArbiterConfig, ArbiterEvent, GimbalArbiter, GimbalControlResult};
#[allow(unused_imports)]
pub use dualrc_lib::constants::DEFAULT_RESPONSE_WINDOW;
#[allow(unused_imports)]
pub use dualrc_lib::control::{ControlMode, GimbalControlSpeed, GimbalDialDirection};
#[allow(unused_imports)]
pub use dualrc_lib::error::RcError;
#[allow(unused_imports)]
pub use dualrc_lib::identity::{ControlPermission, RcId, RcIdentity};
#[allow(unused_imports)]
pub use dualrc_lib::pairing::PairingState;
#[allow(unused_imports)]
pub use dualrc_lib::session::{
    JoinMasterResult, MasterSearchState, ProductCapabilities, Role, SessionEvent, SessionManager,
};
#[allow(unused_imports)]
pub use dualrc_lib::telemetry::{
    BatteryInfo, GpsData, HardwareState, JoystickAxis, TelemetryKind, TelemetrySample,
};
#[allow(unused_imports)]
pub use dualrc_lib::transport::{Reply, Request, Transport, TransportError};

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex as StdMutex;

/// Transport double: replies are scripted ahead of time, every request is
/// recorded, and telemetry frames are injected with [`push_sample`].
///
/// [`push_sample`]: MockTransport::push_sample
pub struct MockTransport {
    replies: StdMutex<VecDeque<Result<Reply, TransportError>>>,
    sent: StdMutex<Vec<Request>>,
    telemetry: StdMutex<HashMap<TelemetryKind, mpsc::Sender<TelemetrySample>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        MockTransport {
            replies: StdMutex::new(VecDeque::new()),
            sent: StdMutex::new(Vec::new()),
            telemetry: StdMutex::new(HashMap::new()),
        }
    }

    /// Queue the reply for the next request.
    pub fn push_reply(&self, reply: Reply) {
        self.replies.lock().unwrap().push_back(Ok(reply));
    }

    /// Queue a link failure for the next request.
    #[allow(dead_code)]
    pub fn push_error(&self, error: TransportError) {
        self.replies.lock().unwrap().push_back(Err(error));
    }

    /// Every request seen so far, in send order.
    #[allow(dead_code)]
    pub fn sent(&self) -> Vec<Request> {
        self.sent.lock().unwrap().clone()
    }

    /// Requests sent after the connect handshake (capabilities and role).
    #[allow(dead_code)]
    pub fn sent_after_connect(&self) -> Vec<Request> {
        self.sent.lock().unwrap().iter().skip(2).cloned().collect()
    }

    /// Inject an unsolicited frame, as the hardware would push it.
    #[allow(dead_code)]
    pub async fn push_sample(&self, sample: TelemetrySample) {
        let sender = {
            let subscribers = self.telemetry.lock().unwrap();
            subscribers.get(&sample.kind()).cloned()
        };
        sender
            .expect("no subscriber for this telemetry kind")
            .send(sample)
            .await
            .expect("telemetry receiver dropped");
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send_request(&self, request: Request) -> Result<Reply, TransportError> {
        self.sent.lock().unwrap().push(request);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .expect("request sent with no scripted reply")
    }

    async fn subscribe(
        &self,
        kind: TelemetryKind,
    ) -> Result<mpsc::Receiver<TelemetrySample>, TransportError> {
        let (tx, rx) = mpsc::channel(64);
        self.telemetry.lock().unwrap().insert(kind, tx);
        Ok(rx)
    }
}

/// Capabilities of a product with full master/slave and focus support.
#[allow(dead_code)]
pub fn caps_full() -> ProductCapabilities {
    ProductCapabilities { supports_master_slave: true, supports_remote_focus: true, max_slaves: 3 }
}

/// Capabilities of a product without master/slave support.
#[allow(dead_code)]
pub fn caps_none() -> ProductCapabilities {
    ProductCapabilities { supports_master_slave: false, supports_remote_focus: false, max_slaves: 0 }
}

#[allow(dead_code)]
pub fn rc(id: u32, name: &str) -> RcIdentity {
    RcIdentity::new(RcId(id)).with_name(name)
}

/// Connect a controller whose hardware reports full support and `role`.
#[allow(dead_code)]
pub async fn connect_as(role: Role) -> (Arc<MockTransport>, RemoteController) {
    let transport = Arc::new(MockTransport::new());
    transport.push_reply(Reply::Capabilities(caps_full()));
    transport.push_reply(Reply::Role { role, connected: true });
    let controller = RemoteController::connect(transport.clone(), rc(1, "LOCAL"))
        .await
        .expect("connect failed");
    (transport, controller)
}

/// Yield until the telemetry pumps have drained what was just pushed.
#[allow(dead_code)]
pub async fn settle() {
    for _ in 0..50 {
        tokio::task::yield_now().await;
    }
}
