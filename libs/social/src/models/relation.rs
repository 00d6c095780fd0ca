//! Relationship views between users
//!
//! Every user keeps its own view of each peer it is connected to. A pending
//! request shows up as `Outgoing` on the requester and `Incoming` on the
//! recipient; a friendship shows up as `Friend` on both sides.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::user::UserId;

/// One user's relation to a single peer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    Friend,
    /// Pending request sent to the peer
    Outgoing,
    /// Pending request received from the peer
    Incoming,
}

impl Relation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Relation::Friend => "friend",
            Relation::Outgoing => "outgoing",
            Relation::Incoming => "incoming",
        }
    }

    /// The relation the peer must hold for this one to be consistent
    pub fn mirrored(&self) -> Relation {
        match self {
            Relation::Friend => Relation::Friend,
            Relation::Outgoing => Relation::Incoming,
            Relation::Incoming => Relation::Outgoing,
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Relation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "friend" => Ok(Relation::Friend),
            "outgoing" => Ok(Relation::Outgoing),
            "incoming" => Ok(Relation::Incoming),
            other => Err(format!("unknown relation kind '{}'", other)),
        }
    }
}

/// A user's relationship sets, each in insertion order
///
/// The three lists are kept disjoint: setting a relation toward a peer
/// removes the peer from whichever list held it before.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationSets {
    pub friends: Vec<UserId>,
    pub outgoing_requests: Vec<UserId>,
    pub incoming_requests: Vec<UserId>,
}

impl RelationSets {
    /// Current relation toward `peer`, if any
    pub fn get(&self, peer: UserId) -> Option<Relation> {
        if self.friends.contains(&peer) {
            Some(Relation::Friend)
        } else if self.outgoing_requests.contains(&peer) {
            Some(Relation::Outgoing)
        } else if self.incoming_requests.contains(&peer) {
            Some(Relation::Incoming)
        } else {
            None
        }
    }

    /// Replace the relation toward `peer`.
    ///
    /// A peer keeps its position when the relation is unchanged and moves to
    /// the end of the new list otherwise.
    pub fn set(&mut self, peer: UserId, relation: Option<Relation>) {
        if self.get(peer) == relation {
            return;
        }

        self.friends.retain(|id| *id != peer);
        self.outgoing_requests.retain(|id| *id != peer);
        self.incoming_requests.retain(|id| *id != peer);

        if let Some(relation) = relation {
            self.list_mut(relation).push(peer);
        }
    }

    pub fn list(&self, relation: Relation) -> &[UserId] {
        match relation {
            Relation::Friend => &self.friends,
            Relation::Outgoing => &self.outgoing_requests,
            Relation::Incoming => &self.incoming_requests,
        }
    }

    fn list_mut(&mut self, relation: Relation) -> &mut Vec<UserId> {
        match relation {
            Relation::Friend => &mut self.friends,
            Relation::Outgoing => &mut self.outgoing_requests,
            Relation::Incoming => &mut self.incoming_requests,
        }
    }
}
