use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::bson::optional_chrono_datetime_as_bson_datetime;
use super::role::Role;

/// Whether, when and for whom a voter voted for one role.
///
/// Either all three of `has_voted`, `voted_at` and `voted_for` are set, or
/// none are. Deserialization rejects any other combination. `voted_at` is
/// stored as a BSON date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "VoteStatusFields")]
pub struct VoteStatus {
    has_voted: bool,
    #[serde(with = "optional_chrono_datetime_as_bson_datetime")]
    voted_at: Option<DateTime<Utc>>,
    voted_for: Option<String>,
}

impl VoteStatus {
    /// The state of a role the voter has not yet voted for.
    pub fn unvoted() -> Self {
        Self {
            has_voted: false,
            voted_at: None,
            voted_for: None,
        }
    }

    /// The state after a vote for `candidate` was recorded at `at`.
    pub fn voted(candidate: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            has_voted: true,
            voted_at: Some(at),
            voted_for: Some(candidate.into()),
        }
    }

    pub fn has_voted(&self) -> bool {
        self.has_voted
    }

    pub fn voted_at(&self) -> Option<DateTime<Utc>> {
        self.voted_at
    }

    pub fn voted_for(&self) -> Option<&str> {
        self.voted_for.as_deref()
    }
}

impl Default for VoteStatus {
    fn default() -> Self {
        Self::unvoted()
    }
}

/// Unchecked wire form of [`VoteStatus`].
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VoteStatusFields {
    #[serde(default)]
    has_voted: bool,
    #[serde(default, with = "optional_chrono_datetime_as_bson_datetime")]
    voted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    voted_for: Option<String>,
}

impl TryFrom<VoteStatusFields> for VoteStatus {
    type Error = &'static str;

    fn try_from(fields: VoteStatusFields) -> Result<Self, Self::Error> {
        match (fields.has_voted, fields.voted_at, fields.voted_for) {
            (false, None, None) => Ok(Self::unvoted()),
            (true, Some(at), Some(candidate)) => Ok(Self::voted(candidate, at)),
            _ => Err("vote status fields must be all set or all unset"),
        }
    }
}

/// A voter's vote status for every role.
///
/// Entries missing from a stored document are filled in as unvoted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Votes {
    #[serde(default)]
    president: VoteStatus,
    #[serde(default)]
    vice_president: VoteStatus,
    #[serde(default)]
    secretary: VoteStatus,
    #[serde(default)]
    treasury: VoteStatus,
}

impl Votes {
    pub fn get(&self, role: Role) -> &VoteStatus {
        match role {
            Role::President => &self.president,
            Role::VicePresident => &self.vice_president,
            Role::Secretary => &self.secretary,
            Role::Treasury => &self.treasury,
        }
    }

    /// Has a vote been recorded for any role?
    pub fn any_voted(&self) -> bool {
        Role::ALL.iter().any(|role| self.get(*role).has_voted())
    }

    /// Record a vote for `role` if none has been recorded yet.
    ///
    /// Returns whether the status changed. Only the store calls this, while
    /// holding exclusive access to the record.
    pub(crate) fn record(&mut self, role: Role, candidate: &str, at: DateTime<Utc>) -> bool {
        let status = match role {
            Role::President => &mut self.president,
            Role::VicePresident => &mut self.vice_president,
            Role::Secretary => &mut self.secretary,
            Role::Treasury => &mut self.treasury,
        };
        if status.has_voted() {
            return false;
        }
        *status = VoteStatus::voted(candidate, at);
        true
    }
}
