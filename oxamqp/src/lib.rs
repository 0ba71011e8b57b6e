#![deny(missing_debug_implementations)]

//! A minimal AMQP 1.0 send path.
//!
//! The crate is split the same way the protocol is layered:
//!
//! - [`frames`] turns bytes into length prefixed AMQP frames and back
//! - [`connection`], [`session`] and [`link`] hold the endpoint state machines
//! - [`ConnectionEngine`] ties them together without doing any IO itself and
//!   queues an [`Event`] for every meaningful transition
//! - [`dispatch`] drains the event queue into a [`Handler`]
//! - [`transport::Driver`] moves bytes between the engine and any tokio IO
//!
//! # Quick start
//!
//! ```rust,no_run
//! use oxamqp::{
//!     connection::{ConnectionEngine, Endpoint},
//!     sender,
//!     transport::{self, Driver},
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), oxamqp::Error> {
//!     let endpoint: Endpoint = "amqp://localhost:5672/q1".parse()?;
//!     let mut engine = ConnectionEngine::builder()
//!         .container_id("send-example")
//!         .build();
//!     let mut sender = sender::Builder::new()
//!         .target(endpoint.address.clone())
//!         .count(10)
//!         .build();
//!
//!     let stream = transport::connect(&endpoint).await?;
//!     Driver::new(stream).run(&mut engine, &mut sender).await?;
//!     assert_eq!(sender.acknowledged(), 10);
//!     Ok(())
//! }
//! ```

pub mod connection;
pub mod dispatch;
pub mod event;
pub mod frames;
pub mod link;
pub mod sender;
pub mod session;
pub mod transport;

mod error;

pub use connection::ConnectionEngine;
pub use dispatch::Handler;
pub use error::Error;
pub use event::Event;

/// Encoded message bytes carried by transfer frames
pub type Payload = bytes::Bytes;

/// Re-export of the protocol types
pub mod types {
    pub use oxamqp_types::*;
}
