//! Turnout and per-candidate vote counts.
//!
//! Figures are read without a lock, so votes may commit while they are
//! being computed. Each figure reflects the store at the moment it was read;
//! the set is not a transactional snapshot. A voter deactivated between the
//! reads can leave the counted votes above the voter total, so the reported
//! total is raised to the number of counted votes.

use rocket::{
    futures::future::try_join_all,
    outcome::try_outcome,
    request::{self, FromRequest, Request},
};

use crate::error::Result;
use crate::model::{
    candidates::CandidateDirectory,
    role::Role,
    stats::{share, turnout, CandidateStats, ElectionStats, OverallStats, RoleStats},
};
use crate::store::{Store, VoterFilter};

#[derive(Clone)]
pub struct Tally {
    store: Store,
    directory: CandidateDirectory,
}

impl Tally {
    pub fn new(store: Store, directory: CandidateDirectory) -> Self {
        Self { store, directory }
    }

    /// Turnout and per-candidate counts for `role`. Every candidate on the
    /// slate is listed, in slate order, including those with no votes.
    pub async fn role_stats(&self, role: Role) -> Result<RoleStats> {
        // Tally first: votes committing afterwards cannot push the counts
        // past the voter total read below. Deactivation still can.
        let mut tally = self.store.tally_votes(role).await?;
        let total_voters = self.store.count_active_voters(VoterFilter::All).await?;

        let slate = self.directory.slate(role);
        let counts = slate
            .iter()
            .map(|name| (name, tally.remove(name).unwrap_or(0)))
            .collect::<Vec<_>>();
        if !tally.is_empty() {
            warn!("Ignoring votes for {role} cast for candidates no longer on the slate: {tally:?}");
        }

        let voted_voters: u64 = counts.iter().map(|(_, count)| count).sum();
        let total_voters = total_voters.max(voted_voters);
        let candidate_stats = counts
            .into_iter()
            .map(|(name, count)| CandidateStats {
                name: name.clone(),
                count,
                percentage: share(count, voted_voters),
            })
            .collect();

        Ok(RoleStats {
            role,
            total_voters,
            voted_voters,
            voting_percentage: turnout(voted_voters, total_voters),
            candidate_stats,
            candidates: slate.to_vec(),
        })
    }

    /// Overall turnout plus [`Self::role_stats`] for every role.
    ///
    /// A voter who voted for any number of roles counts once in the overall
    /// turnout.
    pub async fn election_stats(&self) -> Result<ElectionStats> {
        let per_role = try_join_all(Role::ALL.map(|role| self.role_stats(role))).await?;

        let voted_voters = self
            .store
            .count_active_voters(VoterFilter::VotedForAny)
            .await?;
        let total_voters = self
            .store
            .count_active_voters(VoterFilter::All)
            .await?
            .max(voted_voters);

        Ok(ElectionStats {
            overall: OverallStats {
                total_voters,
                voted_voters,
                voting_percentage: turnout(voted_voters, total_voters),
            },
            role_stats: per_role.into_iter().map(|stats| (stats.role, stats)).collect(),
        })
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Tally {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let store = try_outcome!(req.guard::<Store>().await);
        let directory = try_outcome!(req.guard::<CandidateDirectory>().await);
        request::Outcome::Success(Self::new(store, directory))
    }
}
