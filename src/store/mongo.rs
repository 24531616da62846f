use std::collections::HashMap;

use chrono::{DateTime, Utc};
use mongodb::{
    bson::{doc, to_bson, Document},
    error::Error as DbError,
    options::IndexOptions,
    Collection, Database, IndexModel,
};
use rocket::futures::TryStreamExt;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::model::{
    role::Role,
    vote_status::VoteStatus,
    voter::{Email, Voter},
};

use super::{errors::is_duplicate_key_error, VoterFilter, VoterStore};

const VOTERS: &str = "voters";

/// A voter store backed by a MongoDB collection, one document per voter.
#[derive(Clone)]
pub struct MongoVoterStore {
    voters: Collection<Voter>,
}

impl MongoVoterStore {
    /// Get a handle on the voter collection in the given database.
    pub fn from_db(db: &Database) -> Self {
        Self {
            voters: db.collection(VOTERS),
        }
    }
}

/// Ensure that all the required indexes exist on the given database.
///
/// This operation is idempotent.
pub async fn ensure_indexes_exist(db: &Database) -> std::result::Result<(), DbError> {
    debug!("Ensuring collection indexes exist");
    let voters = db.collection::<Voter>(VOTERS);

    let unique = IndexOptions::builder().unique(true).build();
    let email_index = IndexModel::builder()
        .keys(doc! {"email": 1})
        .options(unique)
        .build();
    voters.create_index(email_index, None).await?;

    let mut indexes = vec![IndexModel::builder().keys(doc! {"isActive": 1}).build()];
    for role in Role::ALL {
        indexes.push(
            IndexModel::builder()
                .keys(doc! {has_voted_field(role): 1})
                .build(),
        );
    }
    voters.create_indexes(indexes, None).await?;

    Ok(())
}

fn has_voted_field(role: Role) -> String {
    format!("{}.hasVoted", role.vote_field())
}

fn voted_for_field(role: Role) -> String {
    format!("{}.votedFor", role.vote_field())
}

fn email_filter(email: &Email) -> Document {
    doc! {"email": email.as_str()}
}

fn active_filter(email: &Email) -> Document {
    doc! {"email": email.as_str(), "isActive": true}
}

/// Matches the voter only while they are active and unvoted for `role`.
fn unvoted_filter(email: &Email, role: Role) -> Document {
    let mut filter = active_filter(email);
    filter.insert(has_voted_field(role), doc! {"$ne": true});
    filter
}

fn count_filter(filter: VoterFilter) -> Document {
    let mut doc = doc! {"isActive": true};
    match filter {
        VoterFilter::All => {}
        VoterFilter::VotedForAny => {
            let any = Role::ALL
                .iter()
                .map(|role| doc! {has_voted_field(*role): true})
                .collect::<Vec<_>>();
            doc.insert("$or", any);
        }
    }
    doc
}

fn tally_pipeline(role: Role) -> Vec<Document> {
    vec![
        doc! {"$match": {has_voted_field(role): true, "isActive": true}},
        doc! {"$group": {"_id": format!("${}", voted_for_field(role)), "count": {"$sum": 1}}},
    ]
}

/// One row of the tally aggregation.
#[derive(Deserialize)]
struct TallyRow {
    #[serde(rename = "_id")]
    candidate: Option<String>,
    count: i64,
}

#[rocket::async_trait]
impl VoterStore for MongoVoterStore {
    async fn insert_voter(&self, voter: &Voter) -> Result<()> {
        match self.voters.insert_one(voter, None).await {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key_error(&e) => Err(Error::VoterExists),
            Err(e) => Err(e.into()),
        }
    }

    #[cfg(test)]
    async fn find_voter(&self, email: &Email) -> Result<Option<Voter>> {
        Ok(self.voters.find_one(email_filter(email), None).await?)
    }

    async fn find_active_voter(&self, email: &Email) -> Result<Option<Voter>> {
        Ok(self.voters.find_one(active_filter(email), None).await?)
    }

    async fn conditional_set_vote(
        &self,
        email: &Email,
        role: Role,
        candidate: &str,
        at: DateTime<Utc>,
    ) -> Result<u64> {
        let status = to_bson(&VoteStatus::voted(candidate, at))
            .map_err(|e| Error::StoreUnavailable(e.into()))?;
        let update = doc! {"$set": {role.vote_field(): status}};
        let result = self
            .voters
            .update_one(unvoted_filter(email, role), update, None)
            .await?;
        Ok(result.matched_count)
    }

    async fn set_active(&self, email: &Email, active: bool) -> Result<u64> {
        let update = doc! {"$set": {"isActive": active}};
        let result = self
            .voters
            .update_one(email_filter(email), update, None)
            .await?;
        Ok(result.matched_count)
    }

    async fn count_active_voters(&self, filter: VoterFilter) -> Result<u64> {
        Ok(self
            .voters
            .count_documents(count_filter(filter), None)
            .await?)
    }

    async fn tally_votes(&self, role: Role) -> Result<HashMap<String, u64>> {
        let rows = self
            .voters
            .aggregate(tally_pipeline(role), None)
            .await?
            .try_collect::<Vec<_>>()
            .await?;
        let mut tally = HashMap::new();
        for document in rows {
            let row: TallyRow = mongodb::bson::from_document(document)
                .map_err(|e| Error::StoreUnavailable(e.into()))?;
            if let Some(candidate) = row.candidate {
                tally.insert(candidate, row.count.max(0) as u64);
            }
        }
        Ok(tally)
    }
}
