//! Drive handler
//!
//! Minimal handler for the command-line client: classifies simulator
//! messages by their `msg_type`, keeps the latest telemetry record and
//! logs lifecycle events.

use serde_json::Value;
use sim_client_core::{BridgeHandle, MessageHandler, MessageKind, StructuredMessage};
use tracing::{debug, info};

/// Handler that records the latest telemetry and logs everything else
#[derive(Debug, Default)]
pub struct DriveHandler {
    latest: StructuredMessage,
    telemetry_count: u64,
    car_loaded: bool,
}

impl DriveHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of telemetry messages seen so far
    pub fn telemetry_count(&self) -> u64 {
        self.telemetry_count
    }

    /// Whether the simulator reported the car as loaded
    pub fn car_loaded(&self) -> bool {
        self.car_loaded
    }
}

impl MessageHandler for DriveHandler {
    fn on_connect(&mut self, bridge: BridgeHandle) {
        info!(connected = bridge.is_connected(), "Simulator connection ready");
    }

    fn on_recv_message(&mut self, message: StructuredMessage) -> MessageKind {
        let kind = MessageKind::of(&message);

        match kind.as_str() {
            "telemetry" => {
                self.telemetry_count += 1;
                self.latest = message;
            }
            "car_loaded" => {
                self.car_loaded = true;
                info!("Car loaded");
            }
            "scene_selection_ready" | "scene_names" => {
                let scenes = message.get("scene_names").and_then(Value::as_array);
                info!(
                    kind = %kind,
                    scenes = scenes.map_or(0, Vec::len),
                    "Scene information received"
                );
            }
            "" => debug!("Message without msg_type"),
            other => debug!(kind = other, "Unhandled message"),
        }

        kind
    }

    fn get_telemetry(&self) -> StructuredMessage {
        self.latest.clone()
    }

    fn on_close(&mut self) {
        info!(
            telemetry_messages = self.telemetry_count(),
            car_loaded = self.car_loaded(),
            "Simulator session closed"
        );
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn object(value: Value) -> StructuredMessage {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_telemetry_is_kept() {
        let mut handler = DriveHandler::new();
        let record = object(json!({"msg_type": "telemetry", "x": 1.0, "z": 2.0, "speed": 3.0}));

        let kind = handler.on_recv_message(record.clone());

        assert_eq!(kind, MessageKind::Telemetry);
        assert_eq!(handler.get_telemetry(), record);
        assert_eq!(handler.telemetry_count(), 1);
    }

    #[test]
    fn test_other_messages_do_not_replace_telemetry() {
        let mut handler = DriveHandler::new();
        let record = object(json!({"msg_type": "telemetry", "x": 1.0, "z": 2.0, "speed": 3.0}));
        handler.on_recv_message(record.clone());

        let kind = handler.on_recv_message(object(json!({"msg_type": "car_loaded"})));

        assert_eq!(kind, MessageKind::Other("car_loaded".to_string()));
        assert!(handler.car_loaded());
        assert_eq!(handler.get_telemetry(), record);
    }

    #[test]
    fn test_missing_msg_type() {
        let mut handler = DriveHandler::new();

        let kind = handler.on_recv_message(object(json!({"x": 1.0})));

        assert_eq!(kind, MessageKind::Other(String::new()));
        assert_eq!(handler.telemetry_count(), 0);
        assert!(handler.get_telemetry().is_empty());
    }
}
