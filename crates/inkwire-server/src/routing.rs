//! Routing groups: which connections hear each other.
//!
//! A group is every live connection that shares a routing identifier (the
//! user id from the handshake, compared byte for byte). A connection joins
//! exactly one group when it becomes active and leaves it when it closes.

use std::collections::HashMap;
use std::fmt;

use uuid::Uuid;

/// Identifier that groups connections for broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoutingId(String);

impl RoutingId {
    /// Routing id from the handshake value. Absent or blank ids are rejected;
    /// anything else is kept exactly as given.
    pub fn from_handshake(value: Option<&str>) -> Option<Self> {
        value
            .filter(|v| !v.trim().is_empty())
            .map(|v| RoutingId(v.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoutingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Server-side identity of one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        ConnectionId(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Group membership, keyed by routing id, with one sink per connection.
#[derive(Debug)]
pub struct RoutingTable<S> {
    groups: HashMap<RoutingId, HashMap<ConnectionId, S>>,
    membership: HashMap<ConnectionId, RoutingId>,
}

impl<S> Default for RoutingTable<S> {
    fn default() -> Self {
        Self {
            groups: HashMap::new(),
            membership: HashMap::new(),
        }
    }
}

impl<S> RoutingTable<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `conn` to the group for `routing_id`.
    ///
    /// A connection never changes group: joining again is refused and
    /// returns false.
    pub fn join(&mut self, conn: ConnectionId, routing_id: RoutingId, sink: S) -> bool {
        if self.membership.contains_key(&conn) {
            return false;
        }
        self.groups
            .entry(routing_id.clone())
            .or_default()
            .insert(conn, sink);
        self.membership.insert(conn, routing_id);
        true
    }

    /// Remove `conn`, returning the group it was in. Empty groups are dropped.
    pub fn leave(&mut self, conn: ConnectionId) -> Option<RoutingId> {
        let routing_id = self.membership.remove(&conn)?;
        if let Some(members) = self.groups.get_mut(&routing_id) {
            members.remove(&conn);
            if members.is_empty() {
                self.groups.remove(&routing_id);
            }
        }
        Some(routing_id)
    }

    pub fn group_of(&self, conn: ConnectionId) -> Option<&RoutingId> {
        self.membership.get(&conn)
    }

    /// Number of connections in the group for `routing_id`.
    pub fn group_len(&self, routing_id: &RoutingId) -> usize {
        self.groups.get(routing_id).map_or(0, HashMap::len)
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn connection_count(&self) -> usize {
        self.membership.len()
    }

    /// Sinks of every other member of `conn`'s group. Empty when `conn` is
    /// not a member.
    pub fn peers(&self, conn: ConnectionId) -> impl Iterator<Item = (ConnectionId, &S)> {
        self.membership
            .get(&conn)
            .and_then(|id| self.groups.get(id))
            .into_iter()
            .flat_map(|members| members.iter())
            .filter(move |(id, _)| **id != conn)
            .map(|(id, sink)| (*id, sink))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rid(s: &str) -> RoutingId {
        RoutingId::from_handshake(Some(s)).unwrap()
    }

    fn peer_tags(table: &RoutingTable<&'static str>, conn: ConnectionId) -> Vec<&'static str> {
        let mut tags: Vec<&'static str> = table.peers(conn).map(|(_, s)| *s).collect();
        tags.sort();
        tags
    }

    #[test]
    fn test_handshake_id() {
        assert_eq!(RoutingId::from_handshake(Some("42")).unwrap().as_str(), "42");
        assert!(RoutingId::from_handshake(None).is_none());
        assert!(RoutingId::from_handshake(Some("")).is_none());
        assert!(RoutingId::from_handshake(Some("  ")).is_none());
        assert_eq!(RoutingId::from_handshake(Some(" 42 ")).unwrap().as_str(), " 42 ");
    }

    #[test]
    fn test_padded_id_is_a_different_group() {
        let mut table = RoutingTable::new();
        let (a, b) = (ConnectionId::new(), ConnectionId::new());
        table.join(a, rid("42"), "a");
        table.join(b, rid(" 42"), "b");

        assert!(peer_tags(&table, a).is_empty());
        assert!(peer_tags(&table, b).is_empty());
        assert_eq!(table.group_count(), 2);
    }

    #[test]
    fn test_peers_exclude_sender() {
        let mut table = RoutingTable::new();
        let (a, b, c) = (ConnectionId::new(), ConnectionId::new(), ConnectionId::new());
        table.join(a, rid("42"), "a");
        table.join(b, rid("42"), "b");
        table.join(c, rid("42"), "c");

        assert_eq!(peer_tags(&table, a), vec!["b", "c"]);
        assert_eq!(peer_tags(&table, b), vec!["a", "c"]);
        assert_eq!(table.group_len(&rid("42")), 3);
    }

    #[test]
    fn test_groups_are_isolated() {
        let mut table = RoutingTable::new();
        let (a, b, c) = (ConnectionId::new(), ConnectionId::new(), ConnectionId::new());
        table.join(a, rid("42"), "a");
        table.join(b, rid("42"), "b");
        table.join(c, rid("7"), "c");

        assert_eq!(peer_tags(&table, a), vec!["b"]);
        assert!(peer_tags(&table, c).is_empty());
        assert_eq!(table.group_count(), 2);
    }

    #[test]
    fn test_no_regrouping() {
        let mut table = RoutingTable::new();
        let a = ConnectionId::new();
        assert!(table.join(a, rid("42"), "a"));
        assert!(!table.join(a, rid("7"), "a2"));
        assert_eq!(table.group_of(a), Some(&rid("42")));
        assert_eq!(table.group_len(&rid("7")), 0);
    }

    #[test]
    fn test_leave_drops_empty_group() {
        let mut table = RoutingTable::new();
        let (a, b) = (ConnectionId::new(), ConnectionId::new());
        table.join(a, rid("42"), "a");
        table.join(b, rid("42"), "b");

        assert_eq!(table.leave(a), Some(rid("42")));
        assert!(peer_tags(&table, b).is_empty());
        assert_eq!(table.group_len(&rid("42")), 1);

        assert_eq!(table.leave(b), Some(rid("42")));
        assert_eq!(table.group_count(), 0);
        assert_eq!(table.connection_count(), 0);
        assert_eq!(table.leave(b), None);
    }

    #[test]
    fn test_unknown_connection_has_no_peers() {
        let mut table = RoutingTable::new();
        table.join(ConnectionId::new(), rid("42"), "a");
        assert_eq!(table.peers(ConnectionId::new()).count(), 0);
    }
}
