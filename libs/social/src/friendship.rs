//! Friend request state machine
//!
//! ```text
//!             send_request               accept_request
//!   (none) ----------------> pending ------------------> friends
//!     ^                        |                           |
//!     |   decline / cancel     |        remove_friend      |
//!     +------------------------+---------------------------+
//! ```
//!
//! Every transition rewrites both users' views of each other through a
//! single [`UserDirectory::update_pair`] call, so the pair is never observed
//! half-updated and the preconditions are checked under the same lock that
//! applies the change.

use crate::directory::UserDirectory;
use crate::error::{SocialError, SocialResult};
use crate::models::{Relation, UserId, UserSummary};

/// Enforces the friendship rules over a user directory
#[derive(Clone)]
pub struct FriendshipEngine<D> {
    directory: D,
}

impl<D: UserDirectory> FriendshipEngine<D> {
    pub fn new(directory: D) -> Self {
        Self { directory }
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    /// Send a friend request from `actor` to `target`.
    ///
    /// Any existing edge between the two, including a pending request in the
    /// opposite direction, is a `DuplicateRequest`; it is never turned into a
    /// friendship implicitly.
    pub async fn send_request(&self, actor: UserId, target: UserId) -> SocialResult<()> {
        if actor == target {
            return Err(SocialError::InvalidTarget(target));
        }

        self.directory
            .update_pair(actor, target, |mine, theirs| {
                if mine.is_some() || theirs.is_some() {
                    return Err(SocialError::DuplicateRequest(target));
                }
                *mine = Some(Relation::Outgoing);
                *theirs = Some(Relation::Incoming);
                Ok(())
            })
            .await
            .map_err(|e| match e {
                SocialError::UserNotFound(id) if id == target => SocialError::InvalidTarget(target),
                other => other,
            })
    }

    /// Accept the pending request `requester` sent to `actor`.
    ///
    /// Retrying after a success fails with `RequestNotFound` and changes
    /// nothing.
    pub async fn accept_request(&self, actor: UserId, requester: UserId) -> SocialResult<()> {
        self.resolve_pending(actor, requester, Relation::Incoming, Some(Relation::Friend))
            .await
    }

    /// Decline the pending request `requester` sent to `actor`
    pub async fn decline_request(&self, actor: UserId, requester: UserId) -> SocialResult<()> {
        self.resolve_pending(actor, requester, Relation::Incoming, None)
            .await
    }

    /// Withdraw the pending request `actor` sent to `target`
    pub async fn cancel_request(&self, actor: UserId, target: UserId) -> SocialResult<()> {
        self.resolve_pending(actor, target, Relation::Outgoing, None)
            .await
    }

    /// End the friendship between `actor` and `friend`
    pub async fn remove_friend(&self, actor: UserId, friend: UserId) -> SocialResult<()> {
        if actor == friend {
            return Err(SocialError::NotFriends(friend));
        }

        self.directory
            .update_pair(actor, friend, |mine, theirs| {
                if *mine != Some(Relation::Friend) || *theirs != Some(Relation::Friend) {
                    return Err(SocialError::NotFriends(friend));
                }
                *mine = None;
                *theirs = None;
                Ok(())
            })
            .await
            .map_err(|e| match e {
                SocialError::UserNotFound(id) if id == friend => SocialError::NotFriends(friend),
                other => other,
            })
    }

    pub async fn list_friends(&self, actor: UserId) -> SocialResult<Vec<UserSummary>> {
        self.directory.peers(actor, Relation::Friend).await
    }

    /// Users who sent `actor` a request that is still pending
    pub async fn list_incoming_requests(&self, actor: UserId) -> SocialResult<Vec<UserSummary>> {
        self.directory.peers(actor, Relation::Incoming).await
    }

    /// Users `actor` sent a request to that is still pending
    pub async fn list_outgoing_requests(&self, actor: UserId) -> SocialResult<Vec<UserSummary>> {
        self.directory.peers(actor, Relation::Outgoing).await
    }

    /// Close a pending edge where `actor` holds `expected` toward `peer`,
    /// leaving both sides at `outcome`.
    async fn resolve_pending(
        &self,
        actor: UserId,
        peer: UserId,
        expected: Relation,
        outcome: Option<Relation>,
    ) -> SocialResult<()> {
        if actor == peer {
            return Err(SocialError::RequestNotFound(peer));
        }

        self.directory
            .update_pair(actor, peer, |mine, theirs| {
                if *mine != Some(expected) || *theirs != Some(expected.mirrored()) {
                    return Err(SocialError::RequestNotFound(peer));
                }
                *mine = outcome;
                *theirs = outcome.map(|relation| relation.mirrored());
                Ok(())
            })
            .await
            .map_err(|e| match e {
                SocialError::UserNotFound(id) if id == peer => SocialError::RequestNotFound(peer),
                other => other,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::MemoryDirectory;
    use crate::models::{NewUser, RelationSets};

    struct Fixture {
        directory: MemoryDirectory,
        engine: FriendshipEngine<MemoryDirectory>,
    }

    impl Fixture {
        fn new() -> Self {
            let directory = MemoryDirectory::new();
            Self {
                engine: FriendshipEngine::new(directory.clone()),
                directory,
            }
        }

        async fn user(&self, name: &str) -> UserId {
            self.directory
                .create_user(NewUser::named(name))
                .await
                .unwrap()
                .id
        }

        async fn sets(&self, id: UserId) -> RelationSets {
            self.directory.relations(id).await.unwrap()
        }
    }

    #[tokio::test]
    async fn test_send_request_records_both_sides() {
        let fx = Fixture::new();
        let a = fx.user("a").await;
        let b = fx.user("b").await;

        fx.engine.send_request(a, b).await.unwrap();

        let (sa, sb) = (fx.sets(a).await, fx.sets(b).await);
        assert_eq!(sa.outgoing_requests, vec![b]);
        assert_eq!(sb.incoming_requests, vec![a]);
        assert!(sa.friends.is_empty());
        assert!(sb.friends.is_empty());
    }

    #[tokio::test]
    async fn test_send_request_to_self_is_invalid() {
        let fx = Fixture::new();
        let a = fx.user("a").await;

        let err = fx.engine.send_request(a, a).await.unwrap_err();
        assert!(matches!(err, SocialError::InvalidTarget(id) if id == a));
        assert_eq!(fx.sets(a).await, RelationSets::default());
    }

    #[tokio::test]
    async fn test_send_request_to_unknown_user_is_invalid() {
        let fx = Fixture::new();
        let a = fx.user("a").await;
        let ghost = UserId::new();

        let err = fx.engine.send_request(a, ghost).await.unwrap_err();
        assert!(matches!(err, SocialError::InvalidTarget(id) if id == ghost));
    }

    #[tokio::test]
    async fn test_send_request_from_unknown_actor() {
        let fx = Fixture::new();
        let b = fx.user("b").await;
        let ghost = UserId::new();

        let err = fx.engine.send_request(ghost, b).await.unwrap_err();
        assert!(matches!(err, SocialError::UserNotFound(id) if id == ghost));
    }

    #[tokio::test]
    async fn test_duplicate_and_reverse_requests_are_rejected() {
        let fx = Fixture::new();
        let a = fx.user("a").await;
        let b = fx.user("b").await;

        fx.engine.send_request(a, b).await.unwrap();

        let err = fx.engine.send_request(a, b).await.unwrap_err();
        assert!(matches!(err, SocialError::DuplicateRequest(_)));

        let err = fx.engine.send_request(b, a).await.unwrap_err();
        assert!(matches!(err, SocialError::DuplicateRequest(_)));

        // Still a single pending edge from a to b.
        assert_eq!(fx.sets(a).await.outgoing_requests, vec![b]);
        assert!(fx.sets(b).await.outgoing_requests.is_empty());
    }

    #[tokio::test]
    async fn test_accept_makes_mutual_friends() {
        let fx = Fixture::new();
        let a = fx.user("a").await;
        let b = fx.user("b").await;

        fx.engine.send_request(a, b).await.unwrap();
        fx.engine.accept_request(b, a).await.unwrap();

        let (sa, sb) = (fx.sets(a).await, fx.sets(b).await);
        assert_eq!(sa.friends, vec![b]);
        assert_eq!(sb.friends, vec![a]);
        assert!(sa.outgoing_requests.is_empty() && sa.incoming_requests.is_empty());
        assert!(sb.outgoing_requests.is_empty() && sb.incoming_requests.is_empty());
    }

    #[tokio::test]
    async fn test_accept_twice_fails_without_changes() {
        let fx = Fixture::new();
        let a = fx.user("a").await;
        let b = fx.user("b").await;

        fx.engine.send_request(a, b).await.unwrap();
        fx.engine.accept_request(b, a).await.unwrap();
        let before = (fx.sets(a).await, fx.sets(b).await);

        let err = fx.engine.accept_request(b, a).await.unwrap_err();
        assert!(matches!(err, SocialError::RequestNotFound(id) if id == a));
        assert_eq!((fx.sets(a).await, fx.sets(b).await), before);
    }

    #[tokio::test]
    async fn test_requester_cannot_accept_own_request() {
        let fx = Fixture::new();
        let a = fx.user("a").await;
        let b = fx.user("b").await;

        fx.engine.send_request(a, b).await.unwrap();

        let err = fx.engine.accept_request(a, b).await.unwrap_err();
        assert!(matches!(err, SocialError::RequestNotFound(_)));
        assert_eq!(fx.sets(a).await.outgoing_requests, vec![b]);
    }

    #[tokio::test]
    async fn test_decline_clears_request() {
        let fx = Fixture::new();
        let a = fx.user("a").await;
        let b = fx.user("b").await;

        fx.engine.send_request(a, b).await.unwrap();
        fx.engine.decline_request(b, a).await.unwrap();

        assert_eq!(fx.sets(a).await, RelationSets::default());
        assert_eq!(fx.sets(b).await, RelationSets::default());

        let err = fx.engine.decline_request(b, a).await.unwrap_err();
        assert!(matches!(err, SocialError::RequestNotFound(_)));

        // A declined request can be sent again.
        fx.engine.send_request(a, b).await.unwrap();
    }

    #[tokio::test]
    async fn test_cancel_withdraws_outgoing_request() {
        let fx = Fixture::new();
        let a = fx.user("a").await;
        let b = fx.user("b").await;

        fx.engine.send_request(a, b).await.unwrap();

        let err = fx.engine.cancel_request(b, a).await.unwrap_err();
        assert!(matches!(err, SocialError::RequestNotFound(_)));

        fx.engine.cancel_request(a, b).await.unwrap();
        assert_eq!(fx.sets(a).await, RelationSets::default());
        assert_eq!(fx.sets(b).await, RelationSets::default());
    }

    #[tokio::test]
    async fn test_remove_friend_clears_both_sides() {
        let fx = Fixture::new();
        let a = fx.user("a").await;
        let b = fx.user("b").await;

        fx.engine.send_request(a, b).await.unwrap();
        fx.engine.accept_request(b, a).await.unwrap();
        fx.engine.remove_friend(a, b).await.unwrap();

        assert_eq!(fx.sets(a).await, RelationSets::default());
        assert_eq!(fx.sets(b).await, RelationSets::default());

        let err = fx.engine.remove_friend(b, a).await.unwrap_err();
        assert!(matches!(err, SocialError::NotFriends(id) if id == a));
    }

    #[tokio::test]
    async fn test_remove_requires_friendship() {
        let fx = Fixture::new();
        let a = fx.user("a").await;
        let b = fx.user("b").await;

        fx.engine.send_request(a, b).await.unwrap();

        let err = fx.engine.remove_friend(a, b).await.unwrap_err();
        assert!(matches!(err, SocialError::NotFriends(_)));
        assert_eq!(fx.sets(a).await.outgoing_requests, vec![b]);

        let err = fx.engine.remove_friend(a, a).await.unwrap_err();
        assert!(matches!(err, SocialError::NotFriends(_)));

        let err = fx.engine.remove_friend(a, UserId::new()).await.unwrap_err();
        assert!(matches!(err, SocialError::NotFriends(_)));
    }

    #[tokio::test]
    async fn test_request_to_existing_friend_is_duplicate() {
        let fx = Fixture::new();
        let a = fx.user("a").await;
        let b = fx.user("b").await;

        fx.engine.send_request(a, b).await.unwrap();
        fx.engine.accept_request(b, a).await.unwrap();

        for (from, to) in [(a, b), (b, a)] {
            let err = fx.engine.send_request(from, to).await.unwrap_err();
            assert!(matches!(err, SocialError::DuplicateRequest(_)));
        }
        assert_eq!(fx.sets(a).await.friends, vec![b]);
    }

    #[tokio::test]
    async fn test_listings_return_summaries_in_insertion_order() {
        let fx = Fixture::new();
        let me = fx.user("me").await;
        let carol = fx.user("carol").await;
        let dave = fx.user("dave").await;
        let erin = fx.user("erin").await;

        fx.engine.send_request(dave, me).await.unwrap();
        fx.engine.send_request(carol, me).await.unwrap();
        fx.engine.send_request(me, erin).await.unwrap();

        let incoming = fx.engine.list_incoming_requests(me).await.unwrap();
        let names: Vec<_> = incoming.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["dave", "carol"]);

        let outgoing = fx.engine.list_outgoing_requests(me).await.unwrap();
        assert_eq!(outgoing.len(), 1);
        assert_eq!(outgoing[0].id, erin);

        fx.engine.accept_request(me, carol).await.unwrap();
        fx.engine.accept_request(me, dave).await.unwrap();

        let friends = fx.engine.list_friends(me).await.unwrap();
        let ids: Vec<_> = friends.iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![carol, dave]);
        assert!(fx.engine.list_incoming_requests(me).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_listing_unknown_actor() {
        let fx = Fixture::new();
        let ghost = UserId::new();

        let err = fx.engine.list_friends(ghost).await.unwrap_err();
        assert!(matches!(err, SocialError::UserNotFound(id) if id == ghost));
    }
}
