use std::{collections::HashSet, time::Duration};

use oxamqp::{
    frames::amqp::FrameBody,
    sender::{self, BatchSender},
    transport::Driver,
    types::{
        definitions::{ConnectionError, Role},
        messaging::{Body, Message, MessageId},
        performatives::Close,
    },
    ConnectionEngine, Error,
};
use oxamqp_codec::{primitives::Binary, Value};
use tokio::{io::duplex, task::JoinHandle};

mod common;

use common::Peer;

type Outcome = (Result<(), Error>, ConnectionEngine, BatchSender);

fn spawn_client(count: u32) -> (JoinHandle<Outcome>, Peer) {
    let (client, server) = duplex(64 * 1024);
    let mut engine = ConnectionEngine::builder()
        .container_id("send-test")
        .build();
    let mut sender = sender::Builder::new().target("q1").count(count).build();

    let handle = tokio::spawn(async move {
        let result = Driver::new(client).run(&mut engine, &mut sender).await;
        (result, engine, sender)
    });
    (handle, Peer::new(server))
}

/// Receives `n` transfers and returns their tags and decoded messages
async fn recv_transfers(peer: &mut Peer, n: usize) -> Vec<(Binary, Message)> {
    let mut transfers = Vec::new();
    for _ in 0..n {
        match peer.recv_body().await {
            FrameBody::Transfer {
                performative,
                payload,
            } => {
                let tag = performative.delivery_tag.unwrap();
                transfers.push((tag, Message::from_slice(&payload).unwrap()));
            }
            body => panic!("expecting transfer, found {:?}", body),
        }
    }
    transfers
}

async fn assert_silent(peer: &mut Peer) {
    let next = tokio::time::timeout(Duration::from_millis(50), peer.recv()).await;
    assert!(next.is_err(), "unexpected frame {:?}", next);
}

#[tokio::test]
async fn sends_only_as_much_as_credit_allows() {
    let (client, mut peer) = spawn_client(5);
    let attach = peer.accept_sender().await;
    assert_eq!(attach.role, Role::Sender);
    assert_eq!(
        attach.target.and_then(|t| t.address).as_deref(),
        Some("q1")
    );

    peer.grant(0, 2).await;
    let mut transfers = recv_transfers(&mut peer, 2).await;
    assert_silent(&mut peer).await;

    peer.accept(0, 1, true).await;
    assert_silent(&mut peer).await;

    peer.grant(2, 10).await;
    transfers.extend(recv_transfers(&mut peer, 3).await);
    peer.accept(2, 4, true).await;

    match peer.recv_body().await {
        FrameBody::Close(close) => assert!(close.error.is_none()),
        body => panic!("expecting close, found {:?}", body),
    }
    peer.send(0, FrameBody::Close(Close::new(None))).await;
    assert!(peer.recv().await.is_none());

    let (result, engine, sender) = client.await.unwrap();
    result.unwrap();
    assert!(engine.is_finished());
    assert_eq!(sender.sent(), 5);
    assert_eq!(sender.acknowledged(), 5);

    let tags: HashSet<_> = transfers.iter().map(|(tag, _)| tag.clone()).collect();
    assert_eq!(tags.len(), 5);

    for (n, (_, message)) in transfers.into_iter().enumerate() {
        let n = n as u64 + 1;
        let id = message.properties.and_then(|p| p.message_id);
        assert_eq!(id, Some(MessageId::ULong(n)));
        match message.body {
            Body::Value(Value::Map(map)) => {
                assert_eq!(
                    map.get(&Value::from("sequence")),
                    Some(&Value::Long(n as i64))
                );
            }
            body => panic!("unexpected body {:?}", body),
        }
    }
}

#[tokio::test]
async fn no_sends_after_completion() {
    let (client, mut peer) = spawn_client(2);
    peer.accept_sender().await;

    peer.grant(0, 2).await;
    recv_transfers(&mut peer, 2).await;
    peer.accept(0, 1, true).await;

    match peer.recv_body().await {
        FrameBody::Close(_) => {}
        body => panic!("expecting close, found {:?}", body),
    }

    // More credit after the close must not produce transfers nor a second close
    peer.grant(2, 50).await;
    assert_silent(&mut peer).await;
    peer.send(0, FrameBody::Close(Close::new(None))).await;
    assert!(peer.recv().await.is_none());

    let (result, _, sender) = client.await.unwrap();
    result.unwrap();
    assert_eq!(sender.sent(), 2);
    assert!(sender.is_complete());
}

#[tokio::test]
async fn unsettled_outcome_is_settled_by_the_sender() {
    let (client, mut peer) = spawn_client(1);
    peer.accept_sender().await;

    peer.grant(0, 1).await;
    recv_transfers(&mut peer, 1).await;
    peer.accept(0, 0, false).await;

    match peer.recv_body().await {
        FrameBody::Disposition(disposition) => {
            assert_eq!(disposition.role, Role::Sender);
            assert_eq!(disposition.first, 0);
            assert!(disposition.settled);
        }
        body => panic!("expecting disposition, found {:?}", body),
    }
    match peer.recv_body().await {
        FrameBody::Close(_) => {}
        body => panic!("expecting close, found {:?}", body),
    }
    peer.send(0, FrameBody::Close(Close::new(None))).await;

    let (result, _, sender) = client.await.unwrap();
    result.unwrap();
    assert_eq!(sender.acknowledged(), 1);
}

#[tokio::test]
async fn drain_uses_up_remaining_credit() {
    let (client, mut peer) = spawn_client(3);
    peer.accept_sender().await;

    let mut flow = common::link_flow(0, 10);
    flow.drain = true;
    peer.send(0, FrameBody::Flow(flow)).await;
    recv_transfers(&mut peer, 3).await;

    match peer.recv_body().await {
        FrameBody::Flow(flow) => {
            assert_eq!(flow.delivery_count, Some(10));
            assert_eq!(flow.link_credit, Some(0));
        }
        body => panic!("expecting flow, found {:?}", body),
    }

    peer.accept(0, 2, true).await;
    match peer.recv_body().await {
        FrameBody::Close(_) => {}
        body => panic!("expecting close, found {:?}", body),
    }
    peer.send(0, FrameBody::Close(Close::new(None))).await;
    client.await.unwrap().0.unwrap();
}

#[tokio::test]
async fn remote_close_with_error_is_reported() {
    let (client, mut peer) = spawn_client(3);
    peer.accept_sender().await;

    let error = ConnectionError::ConnectionForced.into();
    peer.send(0, FrameBody::Close(Close::new(Some(error)))).await;

    match peer.recv_body().await {
        FrameBody::Close(close) => assert!(close.error.is_none()),
        body => panic!("expecting close, found {:?}", body),
    }
    assert!(peer.recv().await.is_none());

    let (result, engine, sender) = client.await.unwrap();
    match result {
        Err(Error::Remote(condition)) => {
            assert_eq!(condition.condition.as_str(), "amqp:connection:forced")
        }
        other => panic!("unexpected result {:?}", other),
    }
    assert!(engine.is_finished());
    assert_eq!(sender.sent(), 0);
}

#[tokio::test]
async fn malformed_frame_is_a_framing_error() {
    let (client, mut peer) = spawn_client(3);
    peer.exchange_header().await;
    match peer.recv_body().await {
        FrameBody::Open(_) => {}
        body => panic!("expecting open, found {:?}", body),
    }

    // A size prefix smaller than the frame header
    peer.send_raw(&[0x00, 0x00, 0x00, 0x04, 0x02, 0x00, 0x00, 0x00])
        .await;

    match peer.recv_body().await {
        FrameBody::Close(close) => {
            let error = close.error.unwrap();
            assert_eq!(error.condition.as_str(), "amqp:connection:framing-error");
        }
        body => panic!("expecting close, found {:?}", body),
    }
    assert!(peer.recv().await.is_none());

    let (result, engine, _) = client.await.unwrap();
    assert!(matches!(result, Err(Error::Local(_))));
    assert!(engine.is_finished());
}

#[tokio::test]
async fn peer_hanging_up_aborts_the_connection() {
    let (client, mut peer) = spawn_client(3);
    peer.accept_sender().await;
    drop(peer);

    let (result, engine, _) = client.await.unwrap();
    match result {
        Err(Error::Local(condition)) => {
            assert_eq!(condition.description.as_deref(), Some("connection aborted"))
        }
        other => panic!("unexpected result {:?}", other),
    }
    assert!(engine.is_finished());
}
