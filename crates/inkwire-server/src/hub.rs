//! The relay hub: one task that owns every routing group.
//!
//! Connections talk to the hub only through [`HubCommand`]s on a single
//! channel. The hub handles each command to completion before taking the
//! next, so membership changes and relays never interleave and the routing
//! table needs no locking.
//!
//! Relay is best effort. Frames from one connection reach peers in the order
//! they were sent; frames from different connections have no ordering, and a
//! peer that has gone away simply misses them. Each peer has a bounded
//! outbound queue; while it is full, frames for that peer are dropped.
//! The hub never waits on a slow reader.

use axum::extract::ws::Utf8Bytes;
use inkwire_core::protocol::EventKind;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::error::HubClosed;
use crate::routing::{ConnectionId, RoutingId, RoutingTable};

/// Frames the hub pushes to one connection's writer.
pub type Outbound = mpsc::Sender<Utf8Bytes>;

/// Something a connection did.
#[derive(Debug)]
pub enum InboundEvent {
    /// A `drawing` (or legacy `draw`) frame, relayed verbatim.
    Stroke(Utf8Bytes),
    /// A `chat` frame, relayed verbatim.
    Chat(Utf8Bytes),
    /// The transport closed.
    Disconnect,
}

impl InboundEvent {
    /// Wrap a relayable frame according to its event kind.
    pub fn relay(kind: EventKind, frame: Utf8Bytes) -> Self {
        match kind {
            EventKind::Drawing => InboundEvent::Stroke(frame),
            EventKind::Chat => InboundEvent::Chat(frame),
        }
    }
}

/// Commands processed by the hub loop.
#[derive(Debug)]
pub enum HubCommand {
    /// A connection passed the handshake.
    Join {
        conn: ConnectionId,
        routing_id: RoutingId,
        outbound: Outbound,
    },
    /// An event from an active connection.
    Event { conn: ConnectionId, event: InboundEvent },
    /// Report the size of a group.
    GroupLen {
        routing_id: RoutingId,
        reply: oneshot::Sender<usize>,
    },
}

/// Cheap, cloneable handle for sending commands to the hub.
#[derive(Debug, Clone)]
pub struct HubHandle {
    tx: mpsc::Sender<HubCommand>,
}

impl HubHandle {
    pub async fn join(
        &self,
        conn: ConnectionId,
        routing_id: RoutingId,
        outbound: Outbound,
    ) -> Result<(), HubClosed> {
        self.send(HubCommand::Join {
            conn,
            routing_id,
            outbound,
        })
        .await
    }

    pub async fn event(&self, conn: ConnectionId, event: InboundEvent) -> Result<(), HubClosed> {
        self.send(HubCommand::Event { conn, event }).await
    }

    pub async fn disconnect(&self, conn: ConnectionId) -> Result<(), HubClosed> {
        self.event(conn, InboundEvent::Disconnect).await
    }

    /// Number of active connections in the group for `routing_id`.
    pub async fn group_len(&self, routing_id: RoutingId) -> Result<usize, HubClosed> {
        let (reply, rx) = oneshot::channel();
        self.send(HubCommand::GroupLen { routing_id, reply }).await?;
        rx.await.map_err(|_| HubClosed)
    }

    async fn send(&self, command: HubCommand) -> Result<(), HubClosed> {
        self.tx.send(command).await.map_err(|_| HubClosed)
    }
}

/// Owner of the routing table.
pub struct RelayHub {
    table: RoutingTable<Outbound>,
    rx: mpsc::Receiver<HubCommand>,
}

impl RelayHub {
    /// Start the hub loop on the current runtime.
    pub fn spawn(capacity: usize) -> HubHandle {
        let (tx, rx) = mpsc::channel(capacity);
        let hub = RelayHub {
            table: RoutingTable::new(),
            rx,
        };
        tokio::spawn(hub.run());
        HubHandle { tx }
    }

    /// Process commands until every handle is dropped.
    async fn run(mut self) {
        while let Some(command) = self.rx.recv().await {
            self.handle(command);
        }
        debug!("Relay hub stopped");
    }

    fn handle(&mut self, command: HubCommand) {
        match command {
            HubCommand::Join {
                conn,
                routing_id,
                outbound,
            } => {
                if self.table.join(conn, routing_id.clone(), outbound) {
                    info!(
                        "Connection {} joined group {} ({} members)",
                        conn,
                        routing_id,
                        self.table.group_len(&routing_id)
                    );
                }
            }
            HubCommand::Event { conn, event } => match event {
                InboundEvent::Stroke(frame) | InboundEvent::Chat(frame) => {
                    let delivered = self.relay(conn, &frame);
                    debug!("Relayed frame from {} to {} peers", conn, delivered);
                }
                InboundEvent::Disconnect => {
                    // Peers are not told about departures
                    if let Some(routing_id) = self.table.leave(conn) {
                        info!("Connection {} left group {}", conn, routing_id);
                    }
                }
            },
            HubCommand::GroupLen { routing_id, reply } => {
                let _ = reply.send(self.table.group_len(&routing_id));
            }
        }
    }

    /// Push `frame` to every other member of `from`'s group. Returns how
    /// many peers accepted it.
    fn relay(&self, from: ConnectionId, frame: &Utf8Bytes) -> usize {
        let mut delivered = 0;
        for (peer, outbound) in self.table.peers(from) {
            match outbound.try_send(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    debug!("Outbound queue full, dropping frame for {}", peer);
                }
                Err(TrySendError::Closed(_)) => {}
            }
        }
        delivered
    }
}
