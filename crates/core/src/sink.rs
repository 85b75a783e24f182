//! Destinations for emitted packets.
//!
//! The packetizer hands every packet it completes to a [`PacketSink`], in
//! packet-number order. The sink runs on the packetizer's thread, outside
//! the buffer lock.

use std::sync::mpsc::Sender;

use crate::packet::Packet;

/// Receives packets as the packetizer emits them.
pub trait PacketSink {
    fn emit(&mut self, packet: Packet);
}

/// Collect every packet.
impl PacketSink for Vec<Packet> {
    fn emit(&mut self, packet: Packet) {
        self.push(packet);
    }
}

/// Forward packets to another thread. Packets sent after the receiver is
/// gone are discarded.
impl PacketSink for Sender<Packet> {
    fn emit(&mut self, packet: Packet) {
        if self.send(packet).is_err() {
            tracing::warn!("packet receiver dropped; discarding packet");
        }
    }
}

impl<S: PacketSink + ?Sized> PacketSink for &mut S {
    fn emit(&mut self, packet: Packet) {
        (**self).emit(packet);
    }
}

/// Adapter turning a closure into a sink.
pub struct FnSink<F>(F);

/// Build a sink from a closure.
pub fn from_fn<F>(f: F) -> FnSink<F>
where
    F: FnMut(Packet),
{
    FnSink(f)
}

impl<F: FnMut(Packet)> PacketSink for FnSink<F> {
    fn emit(&mut self, packet: Packet) {
        (self.0)(packet);
    }
}
