use std::collections::BTreeMap;

use serde::Serialize;

use super::role::Role;

/// Vote count for one candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateStats {
    pub name: String,
    pub count: u64,
    /// Share of the role's votes, in percent to one decimal place.
    pub percentage: f64,
}

/// Turnout and per-candidate counts for one role.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleStats {
    pub role: Role,
    pub total_voters: u64,
    pub voted_voters: u64,
    /// Turnout in percent, formatted to two decimal places.
    pub voting_percentage: String,
    pub candidate_stats: Vec<CandidateStats>,
    pub candidates: Vec<String>,
}

/// Turnout across all roles.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallStats {
    pub total_voters: u64,
    /// Voters who voted for at least one role.
    pub voted_voters: u64,
    pub voting_percentage: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionStats {
    pub overall: OverallStats,
    pub role_stats: BTreeMap<Role, RoleStats>,
}

/// `part / whole` as a percentage rounded to one decimal place; zero when
/// `whole` is zero.
pub fn share(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    (part as f64 / whole as f64 * 1000.0).round() / 10.0
}

/// `part / whole` as a percentage string with two decimal places; `"0.00"`
/// when `whole` is zero.
pub fn turnout(part: u64, whole: u64) -> String {
    if whole == 0 {
        return "0.00".to_string();
    }
    format!("{:.2}", part as f64 / whole as f64 * 100.0)
}
