//! Per-topic fan-out of telemetry and session events.
//!
//! Every topic is its own broadcast channel: subscribers pick what they
//! care about, per-topic order is preserved, and delivery is at most once.
//! A subscriber that falls behind the channel capacity loses the oldest
//! items, never sees them out of order.

use tokio::sync::broadcast;

use crate::constants::EVENT_CHANNEL_CAPACITY;
use crate::pairing::PairingState;
use crate::session::SessionEvent;
use crate::telemetry::{BatteryInfo, GpsData, HardwareState, RemoteFocusState};

pub struct EventHub {
    hardware: broadcast::Sender<HardwareState>,
    gps: broadcast::Sender<GpsData>,
    battery: broadcast::Sender<BatteryInfo>,
    remote_focus: broadcast::Sender<RemoteFocusState>,
    session: broadcast::Sender<SessionEvent>,
    pairing: broadcast::Sender<PairingState>,
}

impl EventHub {
    pub fn new() -> Self {
        let (hardware, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (gps, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (battery, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (remote_focus, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (session, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (pairing, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        EventHub { hardware, gps, battery, remote_focus, session, pairing }
    }

    pub fn subscribe_hardware_state(&self) -> broadcast::Receiver<HardwareState> {
        self.hardware.subscribe()
    }

    pub fn subscribe_gps(&self) -> broadcast::Receiver<GpsData> {
        self.gps.subscribe()
    }

    pub fn subscribe_battery(&self) -> broadcast::Receiver<BatteryInfo> {
        self.battery.subscribe()
    }

    pub fn subscribe_remote_focus(&self) -> broadcast::Receiver<RemoteFocusState> {
        self.remote_focus.subscribe()
    }

    pub fn subscribe_session_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.session.subscribe()
    }

    pub fn subscribe_pairing_updates(&self) -> broadcast::Receiver<PairingState> {
        self.pairing.subscribe()
    }

    // Publishing never blocks and never fails: with no subscriber the item
    // is simply dropped.

    pub fn publish_hardware_state(&self, state: HardwareState) {
        let _ = self.hardware.send(state);
    }

    pub fn publish_gps(&self, data: GpsData) {
        let _ = self.gps.send(data);
    }

    pub fn publish_battery(&self, info: BatteryInfo) {
        let _ = self.battery.send(info);
    }

    pub fn publish_remote_focus(&self, state: RemoteFocusState) {
        let _ = self.remote_focus.send(state);
    }

    pub fn publish_session(&self, event: SessionEvent) {
        let _ = self.session.send(event);
    }

    pub fn publish_pairing(&self, state: PairingState) {
        let _ = self.pairing.send(state);
    }
}

impl Default for EventHub {
    fn default() -> Self {
        EventHub::new()
    }
}
