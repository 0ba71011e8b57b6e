//! A [`Handler`] that sends a fixed number of messages and closes the
//! connection once all of them are accepted

use oxamqp_codec::{primitives::OrderedMap, Value};
use oxamqp_types::{definitions, messaging::Message};
use tracing::{error, info, trace, warn};

use crate::{
    dispatch::Handler,
    event::Level,
    link::{DeliveryUpdate, LinkHandle},
    ConnectionEngine,
};

/// Default link name
pub const DEFAULT_NAME: &str = "my_sender";

/// Default target address
pub const DEFAULT_TARGET: &str = "example";

/// Default number of messages
pub const DEFAULT_COUNT: u32 = 100;

/// Builder of a [`BatchSender`]
#[derive(Debug, Clone)]
pub struct Builder {
    /// Link name
    pub name: String,

    /// Target address
    pub target: String,

    /// Number of messages to send
    pub count: u32,
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder {
    /// Creates a builder with default values
    pub fn new() -> Self {
        Self {
            name: String::from(DEFAULT_NAME),
            target: String::from(DEFAULT_TARGET),
            count: DEFAULT_COUNT,
        }
    }

    /// Sets the link name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the target address
    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    /// Sets the number of messages
    pub fn count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }

    /// Creates the sender
    pub fn build(self) -> BatchSender {
        BatchSender {
            name: self.name,
            target: self.target,
            total: self.count,
            link: None,
            sent: 0,
            acknowledged: 0,
            close_requested: false,
        }
    }
}

/// Sends `count` messages as credit allows.
///
/// Message `n` (counting from 1) carries message id `n` and the body
/// `{"sequence": n}`.
#[derive(Debug)]
pub struct BatchSender {
    name: String,
    target: String,
    total: u32,
    link: Option<LinkHandle>,
    sent: u32,
    acknowledged: u32,
    close_requested: bool,
}

impl BatchSender {
    /// Creates a [`Builder`]
    pub fn builder() -> Builder {
        Builder::new()
    }

    /// Number of messages sent
    pub fn sent(&self) -> u32 {
        self.sent
    }

    /// Number of messages the peer accepted
    pub fn acknowledged(&self) -> u32 {
        self.acknowledged
    }

    /// Number of messages to send
    pub fn total(&self) -> u32 {
        self.total
    }

    /// Whether every message was accepted
    pub fn is_complete(&self) -> bool {
        self.acknowledged == self.total
    }

    /// The link the messages go out on, once it is allocated
    pub fn link(&self) -> Option<LinkHandle> {
        self.link
    }

    fn message(n: u32) -> Message {
        let mut body = OrderedMap::new();
        body.insert(Value::from("sequence"), Value::Long(i64::from(n)));
        Message::builder()
            .message_id(u64::from(n))
            .value(Value::Map(body))
            .build()
    }

    fn complete(&mut self, engine: &mut ConnectionEngine) {
        if self.close_requested {
            return;
        }
        info!("{} messages sent and acknowledged", self.acknowledged);
        self.close_requested = true;
        engine.close(None);
    }
}

impl Handler for BatchSender {
    fn on_connection_init(&mut self, engine: &mut ConnectionEngine) {
        let result = engine
            .open()
            .and_then(|_| engine.begin_session())
            .and_then(|session| engine.attach_sender(session, self.name.clone(), self.target.clone()));

        match result {
            Ok(link) => self.link = Some(link),
            Err(err) => {
                error!(%err, "cannot set up the sending link");
                engine.close(Some(err.condition()));
            }
        }
    }

    fn on_link_remote_open(&mut self, engine: &mut ConnectionEngine, link: LinkHandle) {
        if self.link == Some(link) && self.total == 0 {
            self.complete(engine);
        }
    }

    fn on_link_flow(&mut self, engine: &mut ConnectionEngine, link: LinkHandle) {
        if self.link != Some(link) || self.close_requested {
            return;
        }

        while engine.credit(link) > 0 && self.sent < self.total {
            let n = self.sent + 1;
            match engine.send(link, Self::message(n)) {
                Ok(tag) => {
                    trace!(n, ?tag, "sent");
                    self.sent = n;
                }
                Err(err) => {
                    warn!(%err, "cannot send message {}", n);
                    break;
                }
            }
        }

        if engine.drain_requested(link) {
            engine.drained(link);
        }
    }

    fn on_delivery(&mut self, engine: &mut ConnectionEngine, update: DeliveryUpdate) {
        if self.link != Some(update.link) {
            return;
        }

        if update.status.is_accepted() {
            self.acknowledged += 1;
            if self.acknowledged == self.total {
                self.complete(engine);
            }
        } else if update.status.is_terminal() {
            warn!(
                delivery_id = update.delivery_id,
                status = ?update.status,
                "message was not accepted"
            );
        }
    }

    fn on_transport_error(&mut self, _engine: &mut ConnectionEngine, condition: definitions::Error) {
        error!(
            condition = condition.condition.as_str(),
            description = ?condition.description,
            "transport error"
        );
    }

    fn on_remote_close(
        &mut self,
        engine: &mut ConnectionEngine,
        level: Level,
        condition: Option<definitions::Error>,
    ) {
        if let Some(condition) = condition {
            error!(
                ?level,
                condition = condition.condition.as_str(),
                description = ?condition.description,
                "remote close"
            );
        }
        engine.close(None);
    }
}

#[cfg(test)]
mod tests {
    use oxamqp_codec::Value;
    use oxamqp_types::messaging::{Body, MessageId};

    use super::{BatchSender, Builder};

    #[test]
    fn builder_defaults() {
        let sender = Builder::new().build();
        assert_eq!(sender.total(), 100);
        assert_eq!(sender.name, "my_sender");
        assert_eq!(sender.target, "example");
        assert!(sender.link().is_none());
    }

    #[test]
    fn message_carries_its_sequence_number() {
        let message = BatchSender::message(7);
        let id = message.properties.as_ref().and_then(|p| p.message_id.clone());
        assert_eq!(id, Some(MessageId::ULong(7)));
        match message.body {
            Body::Value(Value::Map(map)) => {
                assert_eq!(map.get(&Value::from("sequence")), Some(&Value::Long(7)));
            }
            body => panic!("unexpected body {:?}", body),
        }
    }
}
