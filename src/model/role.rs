use std::fmt::{Display, Formatter};
use std::str::FromStr;

use rocket::request::FromParam;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// One of the contested offices.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    President,
    VicePresident,
    Secretary,
    Treasury,
}

impl Role {
    /// Every role, in ballot order.
    pub const ALL: [Role; 4] = [
        Role::President,
        Role::VicePresident,
        Role::Secretary,
        Role::Treasury,
    ];

    /// The wire name of this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::President => "president",
            Self::VicePresident => "vicePresident",
            Self::Secretary => "secretary",
            Self::Treasury => "treasury",
        }
    }

    /// Path of this role's vote status within a stored voter document.
    pub fn vote_field(&self) -> &'static str {
        match self {
            Self::President => "votes.president",
            Self::VicePresident => "votes.vicePresident",
            Self::Secretary => "votes.secretary",
            Self::Treasury => "votes.treasury",
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| Error::InvalidRole(s.to_string()))
    }
}

/// Routes take `Result<Role, Error>` so that an unknown role is reported
/// as [`Error::InvalidRole`] rather than falling through to a 404.
impl<'a> FromParam<'a> for Role {
    type Error = Error;

    fn from_param(param: &'a str) -> Result<Self, Self::Error> {
        param.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_known_roles() {
        for role in Role::ALL {
            assert_eq!(role, role.as_str().parse::<Role>().unwrap());
        }
        assert_eq!(Role::VicePresident, "vicePresident".parse().unwrap());
    }

    #[test]
    fn reject_unknown_roles() {
        for bad in ["", "mayor", "President", "vice_president", "treasurer"] {
            match bad.parse::<Role>() {
                Err(Error::InvalidRole(name)) => assert_eq!(bad, name),
                other => panic!("expected InvalidRole for {bad:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn serde_uses_wire_names() {
        for role in Role::ALL {
            let json = rocket::serde::json::serde_json::to_string(&role).unwrap();
            assert_eq!(format!("\"{}\"", role.as_str()), json);
        }
    }

    #[test]
    fn vote_fields_are_distinct() {
        let fields: std::collections::HashSet<_> =
            Role::ALL.iter().map(Role::vote_field).collect();
        assert_eq!(Role::ALL.len(), fields.len());
        assert!(fields.iter().all(|f| f.starts_with("votes.")));
    }
}
