//! Dispatches engine events to application reactions

use oxamqp_types::definitions;
use tracing::trace;

use crate::{
    event::{Event, Level},
    link::{DeliveryUpdate, LinkHandle},
    session::SessionHandle,
    ConnectionEngine,
};

/// Reactions to engine events.
///
/// Every method has an empty default, so an implementation only overrides
/// the events it cares about. Reactions run synchronously and may call any
/// operation on the engine. Whatever they queue is dispatched within the same
/// drain.
pub trait Handler {
    /// The engine was created
    fn on_connection_init(&mut self, engine: &mut ConnectionEngine) {
        let _ = engine;
    }

    /// The peer's open arrived
    fn on_connection_remote_open(&mut self, engine: &mut ConnectionEngine) {
        let _ = engine;
    }

    /// The peer answered a begin
    fn on_session_remote_open(&mut self, engine: &mut ConnectionEngine, session: SessionHandle) {
        let _ = (engine, session);
    }

    /// The peer answered an attach
    fn on_link_remote_open(&mut self, engine: &mut ConnectionEngine, link: LinkHandle) {
        let _ = (engine, link);
    }

    /// The credit of a link changed
    fn on_link_flow(&mut self, engine: &mut ConnectionEngine, link: LinkHandle) {
        let _ = (engine, link);
    }

    /// The peer updated a delivery
    fn on_delivery(&mut self, engine: &mut ConnectionEngine, update: DeliveryUpdate) {
        let _ = (engine, update);
    }

    /// The transport failed
    fn on_transport_error(&mut self, engine: &mut ConnectionEngine, condition: definitions::Error) {
        let _ = (engine, condition);
    }

    /// The peer closed an endpoint
    fn on_remote_close(
        &mut self,
        engine: &mut ConnectionEngine,
        level: Level,
        condition: Option<definitions::Error>,
    ) {
        let _ = (engine, level, condition);
    }

    /// Both directions of the transport are closed
    fn on_transport_closed(&mut self, engine: &mut ConnectionEngine) {
        let _ = engine;
    }

    /// Routes an event to its reaction
    fn on_event(&mut self, engine: &mut ConnectionEngine, event: Event) {
        match event {
            Event::ConnectionInit => self.on_connection_init(engine),
            Event::ConnectionRemoteOpen => self.on_connection_remote_open(engine),
            Event::SessionRemoteOpen(session) => self.on_session_remote_open(engine, session),
            Event::LinkRemoteOpen(link) => self.on_link_remote_open(engine, link),
            Event::LinkFlow(link) => self.on_link_flow(engine, link),
            Event::Delivery(update) => self.on_delivery(engine, update),
            Event::TransportError(condition) => self.on_transport_error(engine, condition),
            Event::RemoteClose { level, condition } => {
                self.on_remote_close(engine, level, condition)
            }
            Event::TransportClosed => self.on_transport_closed(engine),
        }
    }
}

/// Pulls events from `engine` in arrival order until the queue is empty,
/// handing each to `handler`.
///
/// Returns the number of events dispatched.
pub fn dispatch_all<H: Handler + ?Sized>(engine: &mut ConnectionEngine, handler: &mut H) -> usize {
    let mut count = 0;
    while let Some(event) = engine.next_event() {
        trace!(event = event.name());
        handler.on_event(engine, event);
        count += 1;
    }
    count
}

#[cfg(test)]
mod tests {
    use crate::{event::Event, ConnectionEngine};

    use super::{dispatch_all, Handler};

    #[derive(Default)]
    struct Recorder {
        events: Vec<Event>,
        abort_on_init: bool,
    }

    impl Handler for Recorder {
        fn on_event(&mut self, engine: &mut ConnectionEngine, event: Event) {
            if event == Event::ConnectionInit && self.abort_on_init {
                engine.close(None);
                engine.write_close();
            }
            self.events.push(event);
        }
    }

    struct Ignoring;

    impl Handler for Ignoring {}

    #[test]
    fn drains_every_event() {
        let mut engine = ConnectionEngine::builder().container_id("c").build();
        let mut recorder = Recorder::default();
        assert_eq!(dispatch_all(&mut engine, &mut recorder), 1);
        assert_eq!(recorder.events, vec![Event::ConnectionInit]);
        assert_eq!(dispatch_all(&mut engine, &mut recorder), 0);
    }

    #[test]
    fn events_queued_by_reactions_are_dispatched_in_the_same_drain() {
        let mut engine = ConnectionEngine::builder().container_id("c").build();
        let mut recorder = Recorder {
            abort_on_init: true,
            ..Default::default()
        };
        assert_eq!(dispatch_all(&mut engine, &mut recorder), 3);
        assert!(engine.is_finished());
        assert_eq!(recorder.events.first(), Some(&Event::ConnectionInit));
        assert!(matches!(recorder.events[1], Event::TransportError(_)));
        assert_eq!(recorder.events.last(), Some(&Event::TransportClosed));
    }

    #[test]
    fn unhandled_events_are_ignored() {
        let mut engine = ConnectionEngine::builder().container_id("c").build();
        engine.write_close();
        engine.read_close();
        assert!(engine.dispatch(&mut Ignoring) >= 3);
        assert!(engine.is_finished());
    }
}
