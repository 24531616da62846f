use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rocket::tokio::sync::RwLock;

use crate::error::{Error, Result};
use crate::model::{
    role::Role,
    voter::{Email, Voter},
};

use super::{VoterFilter, VoterStore};

/// A voter store held in process memory.
///
/// Every mutation happens under the write lock, so the predicate check and
/// the write of [`VoterStore::conditional_set_vote`] cannot interleave with
/// another writer.
#[derive(Debug, Default)]
pub struct MemoryVoterStore {
    voters: RwLock<HashMap<Email, Voter>>,
}

#[rocket::async_trait]
impl VoterStore for MemoryVoterStore {
    async fn insert_voter(&self, voter: &Voter) -> Result<()> {
        let mut voters = self.voters.write().await;
        if voters.contains_key(&voter.email) {
            return Err(Error::VoterExists);
        }
        voters.insert(voter.email.clone(), voter.clone());
        Ok(())
    }

    #[cfg(test)]
    async fn find_voter(&self, email: &Email) -> Result<Option<Voter>> {
        Ok(self.voters.read().await.get(email).cloned())
    }

    async fn find_active_voter(&self, email: &Email) -> Result<Option<Voter>> {
        let voters = self.voters.read().await;
        Ok(voters.get(email).filter(|voter| voter.is_active).cloned())
    }

    async fn conditional_set_vote(
        &self,
        email: &Email,
        role: Role,
        candidate: &str,
        at: DateTime<Utc>,
    ) -> Result<u64> {
        let mut voters = self.voters.write().await;
        let recorded = match voters.get_mut(email) {
            Some(voter) if voter.is_active => voter.votes.record(role, candidate, at),
            _ => false,
        };
        Ok(u64::from(recorded))
    }

    async fn set_active(&self, email: &Email, active: bool) -> Result<u64> {
        let mut voters = self.voters.write().await;
        Ok(match voters.get_mut(email) {
            Some(voter) => {
                voter.is_active = active;
                1
            }
            None => 0,
        })
    }

    async fn count_active_voters(&self, filter: VoterFilter) -> Result<u64> {
        let voters = self.voters.read().await;
        let count = voters
            .values()
            .filter(|voter| voter.is_active && filter.matches(voter))
            .count();
        Ok(count as u64)
    }

    async fn tally_votes(&self, role: Role) -> Result<HashMap<String, u64>> {
        let voters = self.voters.read().await;
        let mut tally = HashMap::new();
        for voter in voters.values().filter(|voter| voter.is_active) {
            if let Some(candidate) = voter.votes.get(role).voted_for() {
                *tally.entry(candidate.to_string()).or_insert(0) += 1;
            }
        }
        Ok(tally)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email(raw: &str) -> Email {
        Email::try_from(raw).unwrap()
    }

    #[rocket::async_test]
    async fn insert_rejects_duplicates() {
        let store = MemoryVoterStore::default();
        store.insert_voter(&Voter::example("v1@example.com")).await.unwrap();
        let again = store.insert_voter(&Voter::example("V1@example.com")).await;
        assert!(matches!(again, Err(Error::VoterExists)));
    }

    #[rocket::async_test]
    async fn conditional_set_vote_is_write_once() {
        let store = MemoryVoterStore::default();
        let v1 = email("v1@example.com");
        store.insert_voter(&Voter::example(&v1)).await.unwrap();

        let at = Utc::now();
        let first = store.conditional_set_vote(&v1, Role::President, "Alice", at);
        assert_eq!(1, first.await.unwrap());
        let second = store.conditional_set_vote(&v1, Role::President, "Bob", Utc::now());
        assert_eq!(0, second.await.unwrap());

        let voter = store.find_voter(&v1).await.unwrap().unwrap();
        assert_eq!(Some("Alice"), voter.votes.get(Role::President).voted_for());
        assert_eq!(Some(at), voter.votes.get(Role::President).voted_at());
        assert!(!voter.votes.get(Role::Secretary).has_voted());
    }

    #[rocket::async_test]
    async fn conditional_set_vote_requires_active_voter() {
        let store = MemoryVoterStore::default();
        let v1 = email("v1@example.com");
        let missing = store.conditional_set_vote(&v1, Role::President, "Alice", Utc::now());
        assert_eq!(0, missing.await.unwrap());

        store.insert_voter(&Voter::example(&v1)).await.unwrap();
        assert_eq!(1, store.set_active(&v1, false).await.unwrap());
        let inactive = store.conditional_set_vote(&v1, Role::President, "Alice", Utc::now());
        assert_eq!(0, inactive.await.unwrap());
        assert!(store.find_active_voter(&v1).await.unwrap().is_none());
        assert!(store.find_voter(&v1).await.unwrap().is_some());
    }

    #[rocket::async_test]
    async fn counts_and_tallies_skip_inactive_voters() {
        let store = MemoryVoterStore::default();
        for (raw, candidate) in [
            ("v1@example.com", Some("Alice")),
            ("v2@example.com", Some("Alice")),
            ("v3@example.com", Some("Bob")),
            ("v4@example.com", None),
        ] {
            let e = email(raw);
            store.insert_voter(&Voter::example(&e)).await.unwrap();
            if let Some(candidate) = candidate {
                let set = store.conditional_set_vote(&e, Role::President, candidate, Utc::now());
                assert_eq!(1, set.await.unwrap());
            }
        }
        store.set_active(&email("v3@example.com"), false).await.unwrap();

        assert_eq!(3, store.count_active_voters(VoterFilter::All).await.unwrap());
        let voted = VoterFilter::VotedForAny;
        assert_eq!(2, store.count_active_voters(voted).await.unwrap());

        let tally = store.tally_votes(Role::President).await.unwrap();
        assert_eq!(HashMap::from([("Alice".to_string(), 2)]), tally);
    }
}
