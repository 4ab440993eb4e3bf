use std::sync::Arc;

use rocket::{request::FromParam, serde::json::Json, Route, State};

use crate::error::Result;
use crate::model::{
    api::{
        auth::AuthToken,
        candidate::CandidateDesc,
        tally::{CandidateTallyDesc, DistrictTallyDesc},
    },
    candidate::CandidateId,
    mongodb::Id,
};
use crate::voting::BallotBox;

pub fn routes() -> Vec<Route> {
    routes![candidates, candidate, candidate_tally, district_tally]
}

/// Candidates the caller may vote for, ordered by candidate ID.
#[get("/candidates")]
async fn candidates(
    token: AuthToken,
    core: &State<Arc<dyn BallotBox>>,
) -> Result<Json<Vec<CandidateDesc>>> {
    let candidates = core.candidates_for(token.user()).await?;
    Ok(Json(candidates.into_iter().map(Into::into).collect()))
}

#[get("/candidates/<candidate_id>")]
async fn candidate(
    _token: AuthToken,
    candidate_id: CandidateId,
    core: &State<Arc<dyn BallotBox>>,
) -> Result<Json<CandidateDesc>> {
    let candidate = core.candidate(&candidate_id).await?;
    Ok(Json(candidate.into()))
}

#[get("/tally/candidates/<candidate_id>")]
async fn candidate_tally(
    candidate_id: CandidateId,
    core: &State<Arc<dyn BallotBox>>,
) -> Result<Json<CandidateTallyDesc>> {
    let votes = core.count_votes(&candidate_id).await?;
    Ok(Json(CandidateTallyDesc {
        candidate_id,
        votes,
    }))
}

/// Tally for a district, in the given term or else the active one.
#[get("/tally/districts/<district_id>?<term>")]
async fn district_tally(
    district_id: Id,
    term: Option<&str>,
    core: &State<Arc<dyn BallotBox>>,
) -> Result<Json<DistrictTallyDesc>> {
    let term = term.map(Id::from_param).transpose()?;
    let tally = core.counts_by_district(district_id, term).await?;
    Ok(Json(tally.into()))
}
