use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use rocket::{
    request::{self, FromRequest, Request},
    State,
};
use serde::{Serialize, Serializer};

use crate::error::{Error, Result};

use super::role::Role;

/// The fixed candidate slate for every role.
///
/// Loaded once at ignite and never mutated; cloning shares the slate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateDirectory(Arc<BTreeMap<Role, Vec<String>>>);

impl CandidateDirectory {
    /// Build a directory, checking that every role has a non-empty slate of
    /// distinct, non-blank names.
    pub fn new(slates: BTreeMap<Role, Vec<String>>) -> Result<Self> {
        for role in Role::ALL {
            let slate = slates
                .get(&role)
                .ok_or_else(|| Error::InvalidDirectory(format!("no candidates for {role}")))?;
            if slate.is_empty() {
                return Err(Error::InvalidDirectory(format!("empty slate for {role}")));
            }
            let mut seen = HashSet::new();
            for name in slate {
                if name.trim().is_empty() {
                    return Err(Error::InvalidDirectory(format!("blank candidate for {role}")));
                }
                if !seen.insert(name.as_str()) {
                    return Err(Error::InvalidDirectory(format!(
                        "duplicate candidate '{name}' for {role}"
                    )));
                }
            }
        }
        Ok(Self(Arc::new(slates)))
    }

    /// The ordered slate for `role`.
    pub fn slate(&self, role: Role) -> &[String] {
        // Every role is present, enforced by `new`.
        self.0.get(&role).map(Vec::as_slice).unwrap_or_default()
    }

    /// Is `candidate` on the slate for `role`?
    pub fn contains(&self, role: Role, candidate: &str) -> bool {
        self.slate(role).iter().any(|name| name == candidate)
    }
}

impl Default for CandidateDirectory {
    /// The slate the election was originally run with.
    fn default() -> Self {
        let slate = |names: &[&str]| names.iter().map(|n| n.to_string()).collect::<Vec<_>>();
        let slates = BTreeMap::from([
            (Role::President, slate(&["John Doe", "Jane Smith", "Robert Lee"])),
            (Role::VicePresident, slate(&["Alice Cooper", "Mark Taylor"])),
            (Role::Secretary, slate(&["Sara White", "David Kim"])),
            (Role::Treasury, slate(&["Emma Johnson", "Chris Evans"])),
        ]);
        Self(Arc::new(slates))
    }
}

impl Serialize for CandidateDirectory {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for CandidateDirectory {
    type Error = ();

    /// Clone the directory out of managed state.
    ///
    /// Panics iff the directory is not managed by [`rocket::Rocket`].
    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let directory = req.guard::<&State<CandidateDirectory>>().await.unwrap();
        request::Outcome::Success(directory.inner().clone())
    }
}
