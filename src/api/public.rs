use rocket::{serde::json::Json, Route};
use serde::Serialize;

use crate::{
    error::Result,
    model::{
        candidates::CandidateDirectory,
        role::Role,
        stats::{ElectionStats, RoleStats},
    },
    tally::Tally,
};

pub fn routes() -> Vec<Route> {
    routes![candidates, role_stats, election_stats]
}

#[derive(Debug, Serialize)]
pub struct CandidateList {
    pub success: bool,
    pub candidates: CandidateDirectory,
}

#[derive(Debug, Serialize)]
pub struct ElectionStatsResponse {
    pub success: bool,
    #[serde(flatten)]
    pub stats: ElectionStats,
}

#[get("/candidates")]
pub async fn candidates(directory: CandidateDirectory) -> Json<CandidateList> {
    Json(CandidateList {
        success: true,
        candidates: directory,
    })
}

#[get("/stats/<role>")]
pub async fn role_stats(role: Result<Role>, tally: Tally) -> Result<Json<RoleStats>> {
    let stats = tally.role_stats(role?).await?;
    Ok(Json(stats))
}

#[get("/stats")]
pub async fn election_stats(tally: Tally) -> Result<Json<ElectionStatsResponse>> {
    let stats = tally.election_stats().await?;
    Ok(Json(ElectionStatsResponse {
        success: true,
        stats,
    }))
}
