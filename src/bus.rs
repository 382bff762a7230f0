use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{Mutex, Notify, mpsc};

/// One user message as published by the chat backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundMessage {
    pub conversation_id: String,
    pub message_id: String,
    pub user_id: String,
    pub text: String,
    /// Raw profile signals; normalized per turn.
    #[serde(default)]
    pub user_profile: Option<Value>,
}

pub struct MessageBus {
    inbound_tx: mpsc::Sender<InboundMessage>,
    inbound_rx: Mutex<mpsc::Receiver<InboundMessage>>,
    closed: AtomicBool,
    shutdown: Notify,
}

impl MessageBus {
    pub fn new(buffer: usize) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::channel(buffer.max(1));
        Self {
            inbound_tx,
            inbound_rx: Mutex::new(inbound_rx),
            closed: AtomicBool::new(false),
            shutdown: Notify::new(),
        }
    }

    pub fn inbound_sender(&self) -> mpsc::Sender<InboundMessage> {
        self.inbound_tx.clone()
    }

    /// Stop accepting messages. Already queued messages are still handed
    /// out by `recv_inbound`, which returns `None` once they are drained.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.shutdown.notify_one();
    }

    pub async fn recv_inbound(&self) -> Option<InboundMessage> {
        let mut rx = self.inbound_rx.lock().await;
        if !self.closed.load(Ordering::Acquire) {
            tokio::select! {
                msg = rx.recv() => return msg,
                _ = self.shutdown.notified() => {}
            }
        }
        rx.close();
        rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inbound_wire_format() {
        let msg: InboundMessage = serde_json::from_value(serde_json::json!({
            "conversationId": "c1",
            "messageId": "m1",
            "userId": "u1",
            "text": "Hello",
            "userProfile": { "personalityColor": "green" }
        }))
        .unwrap();
        assert_eq!(msg.conversation_id, "c1");
        assert_eq!(msg.user_profile.unwrap()["personalityColor"], "green");

        let msg: InboundMessage = serde_json::from_str(
            r#"{"conversationId":"c","messageId":"m","userId":"u","text":"t"}"#,
        )
        .unwrap();
        assert!(msg.user_profile.is_none());
    }

    #[tokio::test]
    async fn test_bus_delivers_in_order() {
        let bus = MessageBus::new(4);
        let tx = bus.inbound_sender();
        for id in ["m1", "m2"] {
            tx.send(InboundMessage {
                conversation_id: "c".into(),
                message_id: id.into(),
                user_id: "u".into(),
                text: "hi".into(),
                user_profile: None,
            })
            .await
            .unwrap();
        }
        assert_eq!(bus.recv_inbound().await.unwrap().message_id, "m1");
        assert_eq!(bus.recv_inbound().await.unwrap().message_id, "m2");
    }

    fn inbound(id: &str) -> InboundMessage {
        InboundMessage {
            conversation_id: "c".into(),
            message_id: id.into(),
            user_id: "u".into(),
            text: "hi".into(),
            user_profile: None,
        }
    }

    #[tokio::test]
    async fn test_close_drains_queued_then_ends() {
        let bus = MessageBus::new(4);
        let tx = bus.inbound_sender();
        tx.send(inbound("m1")).await.unwrap();
        tx.send(inbound("m2")).await.unwrap();

        bus.close();
        assert_eq!(bus.recv_inbound().await.unwrap().message_id, "m1");
        assert!(tx.try_send(inbound("late")).is_err());
        assert_eq!(bus.recv_inbound().await.unwrap().message_id, "m2");
        assert!(bus.recv_inbound().await.is_none());
        assert!(bus.recv_inbound().await.is_none());
    }

    #[tokio::test]
    async fn test_close_wakes_idle_receiver() {
        let bus = std::sync::Arc::new(MessageBus::new(4));
        let receiver = tokio::spawn({
            let bus = bus.clone();
            async move { bus.recv_inbound().await }
        });
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        bus.close();
        let received = tokio::time::timeout(std::time::Duration::from_secs(1), receiver)
            .await
            .unwrap()
            .unwrap();
        assert!(received.is_none());
    }
}
