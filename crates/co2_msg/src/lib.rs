//! This library provides the message buffer *Conquer Online* packets are built in.
//!
//! A [`Msg`] is a zero filled buffer of fixed length with a write cursor. Integers are written
//! little-endian, strings as UTF-8 with an optional one byte length prefix. Every packet starts
//! with a [`MsgHeader`] holding its length and its type.
//!
//! | Offset (bytes) | Field                  | Description                                                |
//! |----------------|------------------------|------------------------------------------------------------|
//! | 0x0000         | Length                 | 2 bytes: Length of the whole packet                        |
//! | 0x0002         | Type                   | 2 bytes: Packet type                                       |
//! | 0x0004         | Payload                | Length - 4 bytes                                           |
//!
//! [`Msg`] also implements [`std::io::Read`], [`std::io::Write`] and [`std::io::Seek`], so the
//! `byteorder` extension traits work on it as well.

pub mod error;
pub mod msg;

pub use msg::{Msg, MsgHeader, MsgSeek};
