//! The voter record store: the only shared mutable state in the service.
//!
//! Each operation is individually atomic. The engine relies on
//! [`VoterStore::conditional_set_vote`] evaluating its predicate and its
//! write as one step; nothing above this layer takes a lock.

use std::collections::HashMap;
use std::ops::Deref;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rocket::{
    request::{self, FromRequest, Request},
    State,
};

use crate::error::Result;
use crate::model::{
    role::Role,
    voter::{Email, Voter},
};

mod errors;
mod memory;
mod mongo;

pub use self::memory::MemoryVoterStore;
pub use self::mongo::{ensure_indexes_exist, MongoVoterStore};

/// Which active voters to count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoterFilter {
    /// Every active voter.
    All,
    /// Active voters who have voted for at least one role.
    VotedForAny,
}

impl VoterFilter {
    /// Does `voter` satisfy this filter? Activity is not considered.
    pub fn matches(&self, voter: &Voter) -> bool {
        match self {
            Self::All => true,
            Self::VotedForAny => voter.votes.any_voted(),
        }
    }
}

#[rocket::async_trait]
pub trait VoterStore: Send + Sync {
    /// Insert a new voter. Fails with `VoterExists` if the email is taken.
    async fn insert_voter(&self, voter: &Voter) -> Result<()>;

    /// Find a voter regardless of whether they are active.
    #[cfg(test)]
    async fn find_voter(&self, email: &Email) -> Result<Option<Voter>>;

    /// Find an active voter.
    async fn find_active_voter(&self, email: &Email) -> Result<Option<Voter>>;

    /// Set `role` to voted for `candidate` at `at`, iff the voter exists, is
    /// active, and has not voted for `role`. Returns the number of records
    /// matched, which is 0 or 1.
    async fn conditional_set_vote(
        &self,
        email: &Email,
        role: Role,
        candidate: &str,
        at: DateTime<Utc>,
    ) -> Result<u64>;

    /// Activate or deactivate a voter. Vote history is kept either way.
    /// Returns the number of records matched.
    async fn set_active(&self, email: &Email, active: bool) -> Result<u64>;

    /// Count active voters satisfying `filter`.
    async fn count_active_voters(&self, filter: VoterFilter) -> Result<u64>;

    /// Count, per candidate name, the active voters who voted for `role`.
    /// Candidates with no votes are absent.
    async fn tally_votes(&self, role: Role) -> Result<HashMap<String, u64>>;
}

/// A handle on the voter record store, shared by every request.
#[derive(Clone)]
pub struct Store(Arc<dyn VoterStore>);

impl Store {
    pub fn new(store: impl VoterStore + 'static) -> Self {
        Self(Arc::new(store))
    }

    /// A fresh, empty in-memory store.
    pub fn memory() -> Self {
        Self::new(MemoryVoterStore::default())
    }
}

impl Deref for Store {
    type Target = dyn VoterStore;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Store {
    type Error = ();

    /// Get the store handle from the managed state.
    ///
    /// Panics iff the [`Store`] is not managed by [`rocket::Rocket`].
    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let store = req.guard::<&State<Store>>().await.unwrap();
        request::Outcome::Success(store.inner().clone())
    }
}
