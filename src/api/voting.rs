use chrono::{DateTime, Utc};
use rocket::{serde::json::Json, Route};
use serde::{Deserialize, Serialize};

use crate::{
    ballot::BallotBox,
    error::Result,
    model::{auth::AuthToken, role::Role, voter::Email},
};

pub fn routes() -> Vec<Route> {
    routes![cast_vote, user_status]
}

/// The candidate a voter chose for one role.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct VoteRequest {
    #[serde(default)]
    pub candidate: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteReceipt {
    pub message: String,
    pub role: Role,
    pub voted_for: String,
    pub voted_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStatus {
    pub email: Email,
    pub role: Role,
    pub has_voted: bool,
    pub voted_at: Option<DateTime<Utc>>,
    pub voted_for: Option<String>,
}

#[post("/vote/<role>", data = "<vote>")]
pub async fn cast_vote(
    role: Result<Role>,
    token: Result<AuthToken>,
    vote: Json<VoteRequest>,
    ballot_box: BallotBox,
) -> Result<Json<VoteReceipt>> {
    let role = role?;
    let token = token?;
    let vote = ballot_box
        .cast_vote(&token.email, role, &vote.candidate)
        .await?;
    Ok(Json(VoteReceipt {
        message: format!("Vote recorded successfully for {role}"),
        role: vote.role,
        voted_for: vote.candidate,
        voted_at: vote.at,
    }))
}

#[get("/user-status/<role>")]
pub async fn user_status(
    role: Result<Role>,
    token: Result<AuthToken>,
    ballot_box: BallotBox,
) -> Result<Json<UserStatus>> {
    let role = role?;
    let token = token?;
    let status = ballot_box.vote_status(&token.email, role).await?;
    Ok(Json(UserStatus {
        email: token.email,
        role,
        has_voted: status.has_voted(),
        voted_at: status.voted_at(),
        voted_for: status.voted_for().map(str::to_string),
    }))
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::{ContentType, Header, Status, StatusClass},
        local::asynchronous::Client,
        serde::json::{serde_json::json, Value},
    };

    use super::*;
    use crate::model::voter::Voter;
    use crate::store::Store;

    async fn vote(
        client: &Client,
        path: &'static str,
        auth: &Header<'static>,
        candidate: &str,
    ) -> (Status, Value) {
        let response = client
            .post(path)
            .header(ContentType::JSON)
            .header(auth.clone())
            .body(json!({ "candidate": candidate }).to_string())
            .dispatch()
            .await;
        let status = response.status();
        (status, response.into_json().await.unwrap())
    }

    async fn status_of(
        client: &Client,
        path: &'static str,
        auth: &Header<'static>,
    ) -> (Status, Value) {
        let response = client.get(path).header(auth.clone()).dispatch().await;
        let status = response.status();
        (status, response.into_json().await.unwrap())
    }

    #[backend_test(voter)]
    async fn vote_once(client: Client, auth: Header<'static>) {
        let (status, body) = vote(&client, "/api/vote/vote/president", &auth, "Alice").await;
        assert_eq!(Status::Ok, status);
        assert_eq!("Alice", body["votedFor"]);
        assert_eq!("president", body["role"]);
        let voted_at = body["votedAt"].clone();
        assert!(voted_at.is_string());

        let (status, body) = status_of(&client, "/api/vote/user-status/president", &auth).await;
        assert_eq!(Status::Ok, status);
        assert_eq!(true, body["hasVoted"]);
        assert_eq!("Alice", body["votedFor"]);
        assert_eq!(voted_at, body["votedAt"]);
        assert_eq!("voter@example.com", body["email"]);

        // A second attempt is refused and changes nothing.
        let (status, body) = vote(&client, "/api/vote/vote/president", &auth, "Bob").await;
        assert_eq!(Status::BadRequest, status);
        assert_eq!("alreadyVoted", body["error"]);
        let (_, body) = status_of(&client, "/api/vote/user-status/president", &auth).await;
        assert_eq!("Alice", body["votedFor"]);
        assert_eq!(voted_at, body["votedAt"]);
    }

    #[backend_test(mongo, voter)]
    async fn vote_once_in_database(client: Client, auth: Header<'static>) {
        let (status, body) = vote(&client, "/api/vote/vote/treasury", &auth, "Heidi").await;
        assert_eq!(Status::Ok, status);
        let voted_at = body["votedAt"].clone();

        // The stored timestamp reads back exactly as it was returned.
        let (_, body) = status_of(&client, "/api/vote/user-status/treasury", &auth).await;
        assert_eq!(true, body["hasVoted"]);
        assert_eq!("Heidi", body["votedFor"]);
        assert_eq!(voted_at, body["votedAt"]);

        let (status, body) = vote(&client, "/api/vote/vote/treasury", &auth, "Ivan").await;
        assert_eq!(Status::BadRequest, status);
        assert_eq!("alreadyVoted", body["error"]);
    }

    #[backend_test(voter)]
    async fn unvoted_status(client: Client, auth: Header<'static>) {
        let (status, body) = status_of(&client, "/api/vote/user-status/treasury", &auth).await;
        assert_eq!(Status::Ok, status);
        assert_eq!(false, body["hasVoted"]);
        assert!(body["votedAt"].is_null());
        assert!(body["votedFor"].is_null());
    }

    #[backend_test(voter)]
    async fn invalid_candidate_is_distinct_from_already_voted(client: Client, auth: Header<'static>) {
        let (status, body) = vote(&client, "/api/vote/vote/president", &auth, "Carol").await;
        assert_eq!(Status::BadRequest, status);
        assert_eq!("invalidCandidate", body["error"]);
        let message = body["message"].as_str().unwrap();
        assert!(message.contains("not valid for president"), "{message}");

        let (status, body) = vote(&client, "/api/vote/vote/president", &auth, "").await;
        assert_eq!(Status::BadRequest, status);
        assert_eq!("Candidate is required", body["message"]);

        let (_, body) = status_of(&client, "/api/vote/user-status/president", &auth).await;
        assert_eq!(false, body["hasVoted"]);
    }

    #[backend_test(voter)]
    async fn invalid_role(client: Client, auth: Header<'static>) {
        let (status, body) = vote(&client, "/api/vote/vote/mayor", &auth, "Alice").await;
        assert_eq!(Status::BadRequest, status);
        assert_eq!("invalidRole", body["error"]);

        let (status, body) = status_of(&client, "/api/vote/user-status/mayor", &auth).await;
        assert_eq!(Status::BadRequest, status);
        assert_eq!("invalidRole", body["error"]);
    }

    #[backend_test(voter)]
    async fn vote_without_content_type(client: Client, auth: Header<'static>) {
        let response = client
            .post("/api/vote/vote/secretary")
            .header(auth.clone())
            .body(json!({ "candidate": "Erin" }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let (_, body) = status_of(&client, "/api/vote/user-status/secretary", &auth).await;
        assert_eq!("Erin", body["votedFor"]);
    }

    #[backend_test(voter)]
    async fn unreadable_vote_body(client: Client, auth: Header<'static>) {
        let response = client
            .post("/api/vote/vote/president")
            .header(ContentType::JSON)
            .header(auth.clone())
            .body("{\"candidate\": ")
            .dispatch()
            .await;
        assert_eq!(StatusClass::ClientError, response.status().class());
        assert_ne!(Status::NotFound, response.status());
        let body: Value = response.into_json().await.unwrap();
        assert_eq!("badRequest", body["error"]);
        assert!(body["message"].is_string());

        let (_, body) = status_of(&client, "/api/vote/user-status/president", &auth).await;
        assert_eq!(false, body["hasVoted"]);
    }

    #[backend_test]
    async fn authentication_required(client: Client) {
        let response = client
            .post("/api/vote/vote/president")
            .header(ContentType::JSON)
            .body(json!({"candidate": "Alice"}).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Unauthorized, response.status());

        let forged = Header::new("Authorization", "Bearer not.a.token");
        let (status, body) = vote(&client, "/api/vote/vote/president", &forged, "Alice").await;
        assert_eq!(Status::Forbidden, status);
        assert_eq!("unauthorized", body["error"]);

        let basic = Header::new("Authorization", "Basic dm90ZXI6cGFzcw==");
        let (status, _) = status_of(&client, "/api/vote/user-status/president", &basic).await;
        assert_eq!(Status::Unauthorized, status);
    }

    #[backend_test]
    async fn token_for_unknown_voter(client: Client, store: Store) {
        let config = client.rocket().state::<crate::Config>().unwrap();
        let email = Email::try_from("ghost@example.com").unwrap();
        let token = AuthToken::new(email.clone()).encode(config).unwrap();
        let auth = Header::new("Authorization", format!("Bearer {token}"));

        let (status, body) = vote(&client, "/api/vote/vote/president", &auth, "Alice").await;
        assert_eq!(Status::NotFound, status);
        assert_eq!("voterNotFound", body["error"]);

        // Deactivated voters are treated as missing.
        store.insert_voter(&Voter::example(&email)).await.unwrap();
        store.set_active(&email, false).await.unwrap();
        let (status, _) = status_of(&client, "/api/vote/user-status/president", &auth).await;
        assert_eq!(Status::NotFound, status);
    }

    #[backend_test(voter)]
    async fn concurrent_requests_record_one_vote(client: Client, auth: Header<'static>, store: Store) {
        let requests = ["Alice", "Bob", "Alice", "Bob", "Alice", "Bob"]
            .map(|candidate| vote(&client, "/api/vote/vote/president", &auth, candidate));
        let responses = rocket::futures::future::join_all(requests).await;

        let accepted = responses
            .iter()
            .filter(|(status, _)| *status == Status::Ok)
            .collect::<Vec<_>>();
        assert_eq!(1, accepted.len());
        assert!(responses
            .iter()
            .filter(|(status, _)| *status != Status::Ok)
            .all(|(status, body)| *status == Status::BadRequest && body["error"] == "alreadyVoted"));

        let email = Email::try_from("voter@example.com").unwrap();
        let voter = store.find_active_voter(&email).await.unwrap().unwrap();
        let stored = voter.votes.get(Role::President);
        assert_eq!(accepted[0].1["votedFor"], stored.voted_for().unwrap());
    }
}
