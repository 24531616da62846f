//! Vote casting and vote status queries.

use chrono::{DateTime, Utc};
use rocket::{
    outcome::try_outcome,
    request::{self, FromRequest, Request},
};

use crate::error::{Error, Result};
use crate::model::{
    candidates::CandidateDirectory, role::Role, vote_status::VoteStatus, voter::Email,
};
use crate::store::Store;

/// A vote exactly as it was persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedVote {
    pub role: Role,
    pub candidate: String,
    pub at: DateTime<Utc>,
}

impl From<RecordedVote> for VoteStatus {
    fn from(vote: RecordedVote) -> Self {
        VoteStatus::voted(vote.candidate, vote.at)
    }
}

/// The ballot box: records votes against the voter store.
///
/// Holds only shared handles, so it is cheap to obtain per request.
#[derive(Clone)]
pub struct BallotBox {
    store: Store,
    directory: CandidateDirectory,
}

impl BallotBox {
    pub fn new(store: Store, directory: CandidateDirectory) -> Self {
        Self { store, directory }
    }

    /// Record `email`'s vote for `candidate` in `role`.
    ///
    /// At most one call per voter and role ever succeeds, however many run
    /// concurrently. Every other call, including one that lost a race, fails
    /// with [`Error::AlreadyVoted`] and writes nothing.
    pub async fn cast_vote(
        &self,
        email: &Email,
        role: Role,
        candidate: &str,
    ) -> Result<RecordedVote> {
        if candidate.is_empty() {
            return Err(Error::MissingCandidate);
        }
        if !self.directory.contains(role, candidate) {
            return Err(Error::InvalidCandidate {
                role,
                candidate: candidate.to_string(),
            });
        }

        let voter = self
            .store
            .find_active_voter(email)
            .await?
            .ok_or(Error::VoterNotFound)?;
        // Saves a write for the common case. Not authoritative: the
        // conditional write below is.
        if voter.votes.get(role).has_voted() {
            return Err(Error::AlreadyVoted(role));
        }

        let at = crate::model::bson::now();
        let matched = self
            .store
            .conditional_set_vote(email, role, candidate, at)
            .await?;
        if matched == 0 {
            debug!("Conditional vote for {role} by {email} matched nothing");
            return Err(Error::AlreadyVoted(role));
        }

        info!("Recorded vote for {role} by {email}");
        Ok(RecordedVote {
            role,
            candidate: candidate.to_string(),
            at,
        })
    }

    /// The latest committed vote status of `email` for `role`.
    pub async fn vote_status(&self, email: &Email, role: Role) -> Result<VoteStatus> {
        let voter = self
            .store
            .find_active_voter(email)
            .await?
            .ok_or(Error::VoterNotFound)?;
        Ok(voter.votes.get(role).clone())
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for BallotBox {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let store = try_outcome!(req.guard::<Store>().await);
        let directory = try_outcome!(req.guard::<CandidateDirectory>().await);
        request::Outcome::Success(Self::new(store, directory))
    }
}
