#![doc(html_root_url = "https://docs.rs/bearerbox/latest")]
//! Client library for the bearerbox box protocol.
//!
//! A box connects to the gateway over TCP, identifies itself and exchanges
//! length-delimited messages. Outbound sms requests are correlated with the
//! gateway's acks through a bounded [`Window`](window::Window), so at most a
//! configured number of requests are in flight at once.
//!
//! - [`message`]: the message model;
//! - [`codec`]: wire encoding and framing;
//! - [`window`]: the correlation window and request promises;
//! - [`transport`]: the connection abstraction and its framed implementation;
//! - [`session`]: session lifecycle, request sending and inbound dispatch;
//! - [`client`]: the TCP connector.

pub mod byte_order;
pub mod client;
pub mod codec;
pub mod error;
pub mod message;
pub mod metrics;
pub mod session;
pub mod transport;
pub mod window;

pub use client::{Client, ClientError};
pub use error::{Error, Result};
pub use message::{Ack, Admin, Datagram, HeartBeat, Message, Sms};
pub use metrics::{Direction, ERRORS_TOTAL, FRAMES_PROCESSED, SESSIONS_ACTIVE};
pub use session::{DefaultSessionHandler, Session, SessionConfig, SessionHandler, SessionState};
pub use window::{RequestError, RequestPromise, Window};
