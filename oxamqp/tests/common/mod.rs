#![allow(dead_code)]

use bytes::BytesMut;
use oxamqp::{
    frames::amqp::{Frame, FrameBody, FrameCodec},
    types::{
        definitions::{DeliveryNumber, Handle, Role},
        messaging::{Accepted, DeliveryState},
        performatives::{Attach, Begin, Disposition, Flow, Open},
    },
};
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio_util::codec::{Decoder, Encoder};

pub const HEADER: &[u8; 8] = b"AMQP\x00\x01\x00\x00";

/// A scripted receiving peer on the other end of a duplex pipe
pub struct Peer {
    io: DuplexStream,
    codec: FrameCodec,
    read_buf: BytesMut,
}

impl Peer {
    pub fn new(io: DuplexStream) -> Self {
        let mut codec = FrameCodec::new(u32::MAX);
        codec.set_remote_max_frame_size(u32::MAX);
        Self {
            io,
            codec,
            read_buf: BytesMut::new(),
        }
    }

    pub async fn exchange_header(&mut self) {
        let mut header = [0u8; 8];
        self.io.read_exact(&mut header).await.unwrap();
        assert_eq!(&header, HEADER);
        self.io.write_all(HEADER).await.unwrap();
    }

    /// Next non-heartbeat frame, or `None` at end of stream
    pub async fn recv(&mut self) -> Option<Frame> {
        loop {
            while let Some(frame) = self.codec.decode(&mut self.read_buf).unwrap() {
                if !matches!(frame.body, FrameBody::Empty) {
                    return Some(frame);
                }
            }
            let n = self.io.read_buf(&mut self.read_buf).await.unwrap();
            if n == 0 {
                return None;
            }
        }
    }

    pub async fn recv_body(&mut self) -> FrameBody {
        self.recv().await.expect("unexpected end of stream").into_body()
    }

    pub async fn send(&mut self, channel: u16, body: FrameBody) {
        let mut buf = BytesMut::new();
        self.codec.encode(Frame::new(channel, body), &mut buf).unwrap();
        self.io.write_all(&buf).await.unwrap();
    }

    pub async fn send_raw(&mut self, bytes: &[u8]) {
        self.io.write_all(bytes).await.unwrap();
    }

    /// Answers the client's open, begin and attach. Returns the client's
    /// attach.
    pub async fn accept_sender(&mut self) -> Attach {
        self.exchange_header().await;

        match self.recv_body().await {
            FrameBody::Open(_) => {}
            body => panic!("expecting open, found {:?}", body),
        }
        self.send(0, FrameBody::Open(Open::new("peer"))).await;

        match self.recv_body().await {
            FrameBody::Begin(begin) => assert_eq!(begin.remote_channel, None),
            body => panic!("expecting begin, found {:?}", body),
        }
        self.send(0, FrameBody::Begin(begin_reply())).await;

        let attach = match self.recv_body().await {
            FrameBody::Attach(attach) => attach,
            body => panic!("expecting attach, found {:?}", body),
        };
        let mut reply = attach.clone();
        reply.role = Role::Receiver;
        reply.handle = Handle(0);
        self.send(0, FrameBody::Attach(reply)).await;
        attach
    }

    pub async fn grant(&mut self, delivery_count: u32, credit: u32) {
        self.send(0, FrameBody::Flow(link_flow(delivery_count, credit)))
            .await;
    }

    pub async fn accept(&mut self, first: DeliveryNumber, last: DeliveryNumber, settled: bool) {
        let disposition = Disposition {
            role: Role::Receiver,
            first,
            last: Some(last),
            settled,
            state: Some(DeliveryState::Accepted(Accepted {})),
            batchable: false,
        };
        self.send(0, FrameBody::Disposition(disposition)).await;
    }
}

pub fn begin_reply() -> Begin {
    Begin {
        remote_channel: Some(0),
        next_outgoing_id: 0,
        incoming_window: 1000,
        outgoing_window: 1000,
        handle_max: Handle(u32::MAX),
        offered_capabilities: None,
        desired_capabilities: None,
        properties: None,
    }
}

/// A flow granting `credit` on handle 0 after `delivery_count` deliveries
pub fn link_flow(delivery_count: u32, credit: u32) -> Flow {
    Flow {
        next_incoming_id: Some(delivery_count),
        incoming_window: 1000,
        next_outgoing_id: 0,
        outgoing_window: 1000,
        handle: Some(Handle(0)),
        delivery_count: Some(delivery_count),
        link_credit: Some(credit),
        ..Default::default()
    }
}
