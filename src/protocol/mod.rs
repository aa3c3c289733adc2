//! GDB Remote Serial Protocol framing, parsing and encoding.
//!
//! Nothing in here knows about targets or sessions: packets come in as raw
//! byte buffers, get validated and parsed into a [`Command`](commands::Command), and replies are
//! framed by a [`ResponseWriter`].

mod packet;
mod recv_packet;
mod response_writer;

pub(crate) mod commands;
pub(crate) mod common;

pub(crate) use packet::{Packet, PacketParseError};
pub(crate) use recv_packet::{RecvPacketBlocking, RecvPacketError};
pub(crate) use response_writer::{Error as ResponseWriterError, ResponseWriter};

#[cfg(test)]
pub(crate) use response_writer::frame;
