//! Drives the engine by hand, without any IO

use bytes::BytesMut;
use oxamqp::{
    event::{Event, Level},
    frames::amqp::{Frame, FrameBody, FrameCodec},
    link::{DeliveryStatus, LinkHandle, SendError},
    types::{
        definitions::{Handle, LinkError, Role},
        messaging::{DeliveryState, Message, Released},
        performatives::{Detach, Disposition, Open},
        states::{ConnectionState, LinkState},
    },
    ConnectionEngine, Error,
};
use tokio_util::codec::{Decoder, Encoder};

mod common;

use common::{begin_reply, link_flow, HEADER};

fn encode(frames: Vec<(u16, FrameBody)>) -> Vec<u8> {
    let mut codec = FrameCodec::new(u32::MAX);
    codec.set_remote_max_frame_size(u32::MAX);
    let mut buf = BytesMut::new();
    for (channel, body) in frames {
        codec.encode(Frame::new(channel, body), &mut buf).unwrap();
    }
    buf.to_vec()
}

fn take_output(engine: &mut ConnectionEngine) -> Vec<FrameBody> {
    let mut buf = BytesMut::from(engine.write_buffer());
    let n = buf.len();
    engine.write_done(n);
    if buf.starts_with(HEADER) {
        let _ = buf.split_to(HEADER.len());
    }

    let mut codec = FrameCodec::new(u32::MAX);
    let mut bodies = Vec::new();
    while let Some(frame) = codec.decode(&mut buf).unwrap() {
        bodies.push(frame.into_body());
    }
    bodies
}

fn events(engine: &mut ConnectionEngine) -> Vec<Event> {
    std::iter::from_fn(|| engine.next_event()).collect()
}

fn open_with(max_frame_size: u32) -> (ConnectionEngine, LinkHandle) {
    let mut engine = ConnectionEngine::builder().container_id("engine").build();
    engine.open().unwrap();
    let session = engine.begin_session().unwrap();
    let link = engine.attach_sender(session, "sender", "q").unwrap();

    let mut open = Open::new("peer");
    open.max_frame_size = max_frame_size.into();
    let mut input = HEADER.to_vec();
    input.extend(encode(vec![
        (0, FrameBody::Open(open)),
        (0, FrameBody::Begin(begin_reply())),
    ]));
    engine.feed(&input);

    let mut attach = take_output(&mut engine)
        .into_iter()
        .find_map(|body| match body {
            FrameBody::Attach(attach) => Some(attach),
            _ => None,
        })
        .unwrap();
    attach.role = Role::Receiver;
    attach.handle = Handle(0);
    engine.feed(&encode(vec![(0, FrameBody::Attach(attach))]));
    assert_eq!(engine.link_state(link), Some(LinkState::Attached));
    let _ = events(&mut engine);
    (engine, link)
}

fn open() -> (ConnectionEngine, LinkHandle) {
    open_with(u32::MAX)
}

#[test]
fn credit_never_goes_negative() {
    let (mut engine, link) = open();
    engine.feed(&encode(vec![(0, FrameBody::Flow(link_flow(0, 3)))]));

    for expected in (0..3).rev() {
        engine.send(link, Message::default()).unwrap();
        assert_eq!(engine.credit(link), expected);
    }
    assert!(matches!(
        engine.send(link, Message::default()),
        Err(SendError::InsufficientCredit)
    ));
    assert_eq!(engine.credit(link), 0);
    assert_eq!(engine.delivery_count(link), Some(3));
}

#[test]
fn flow_is_absolute_not_additive() {
    let (mut engine, link) = open();
    engine.feed(&encode(vec![(0, FrameBody::Flow(link_flow(0, 4)))]));
    engine.feed(&encode(vec![(0, FrameBody::Flow(link_flow(0, 4)))]));
    assert_eq!(engine.credit(link), 4);

    engine.feed(&encode(vec![(0, FrameBody::Flow(link_flow(0, 1)))]));
    assert_eq!(engine.credit(link), 1);

    let flows = events(&mut engine)
        .into_iter()
        .filter(|event| *event == Event::LinkFlow(link))
        .count();
    assert_eq!(flows, 3);
}

#[test]
fn large_message_is_split_by_the_remote_max_frame_size() {
    let (mut engine, link) = open_with(512);
    engine.feed(&encode(vec![(0, FrameBody::Flow(link_flow(0, 1)))]));

    let message = Message::builder().data(vec![7u8; 2000]).build();
    engine.send(link, message).unwrap();

    let transfers: Vec<bool> = take_output(&mut engine)
        .into_iter()
        .filter_map(|body| match body {
            FrameBody::Transfer { performative, .. } => Some(performative.more),
            _ => None,
        })
        .collect();
    assert!(transfers.len() >= 4);
    assert_eq!(transfers.last(), Some(&false));
    assert!(transfers[..transfers.len() - 1].iter().all(|more| *more));
}

#[test]
fn dispositions_update_deliveries_in_order() {
    let (mut engine, link) = open();
    engine.feed(&encode(vec![(0, FrameBody::Flow(link_flow(0, 3)))]));
    let tags: Vec<_> = (0..3)
        .map(|_| engine.send(link, Message::default()).unwrap())
        .collect();
    let _ = events(&mut engine);

    let released = Disposition {
        role: Role::Receiver,
        first: 0,
        last: Some(2),
        settled: true,
        state: Some(DeliveryState::Released(Released {})),
        batchable: false,
    };
    engine.feed(&encode(vec![(0, FrameBody::Disposition(released))]));

    let updates: Vec<_> = events(&mut engine)
        .into_iter()
        .filter_map(|event| match event {
            Event::Delivery(update) => Some(update),
            _ => None,
        })
        .collect();
    assert_eq!(updates.len(), 3);
    for (i, update) in updates.iter().enumerate() {
        assert_eq!(update.delivery_id, i as u32);
        assert_eq!(update.delivery_tag, tags[i]);
        assert_eq!(update.status, DeliveryStatus::Released);
        assert!(update.remote_settled);
    }
    assert_eq!(engine.unsettled_count(link), 0);
}

#[test]
fn remote_detach_is_answered() {
    let (mut engine, link) = open();
    let detach = Detach {
        handle: Handle(0),
        closed: true,
        error: Some(LinkError::DetachForced.into()),
    };
    engine.feed(&encode(vec![(0, FrameBody::Detach(detach))]));

    match events(&mut engine).as_slice() {
        [Event::RemoteClose {
            level: Level::Link(closed),
            condition: Some(condition),
        }] => {
            assert_eq!(*closed, link);
            assert_eq!(condition.condition.as_str(), "amqp:link:detach-forced");
        }
        other => panic!("unexpected events {:?}", other),
    }
    assert!(matches!(
        take_output(&mut engine).as_slice(),
        [FrameBody::Detach(Detach { closed: true, .. })]
    ));
    assert_eq!(engine.link_state(link), Some(LinkState::Detached));
    assert!(matches!(
        engine.send(link, Message::default()),
        Err(SendError::IllegalState(_))
    ));
}

#[test]
fn truncated_frame_at_end_of_stream_is_a_transport_error() {
    let mut engine = ConnectionEngine::builder().container_id("engine").build();
    engine.open().unwrap();
    let _ = take_output(&mut engine);

    // The size prefix announces more bytes than will ever arrive
    let mut input = HEADER.to_vec();
    input.extend_from_slice(&[0x00, 0x00, 0x01, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00]);
    engine.feed(&input);
    assert!(events(&mut engine)
        .iter()
        .all(|event| !matches!(event, Event::TransportError(_))));

    engine.read_close();
    let events = events(&mut engine);
    match events.first() {
        Some(Event::TransportError(condition)) => {
            assert_eq!(condition.condition.as_str(), "amqp:connection:framing-error")
        }
        other => panic!("unexpected event {:?}", other),
    }
    assert!(engine.is_read_closed());
    assert_eq!(engine.connection_state(), ConnectionState::CloseSent);
}

#[test]
fn channel_max_is_negotiated() {
    let mut engine = ConnectionEngine::builder()
        .container_id("engine")
        .channel_max(10)
        .build();
    engine.open().unwrap();

    let mut open = Open::new("peer");
    open.channel_max = 1.into();
    let mut input = HEADER.to_vec();
    input.extend(encode(vec![(0, FrameBody::Open(open))]));
    engine.feed(&input);
    assert_eq!(engine.channel_max(), 1);

    engine.begin_session().unwrap();
    engine.begin_session().unwrap();
    assert!(matches!(
        engine.begin_session(),
        Err(Error::ChannelMaxReached)
    ));
}
