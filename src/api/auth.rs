use rocket::{http::Status, serde::json::Json, Route, State};
use serde::Serialize;

use crate::{
    error::{Error, Result},
    model::{
        auth::AuthToken,
        voter::{Credentials, Email, Voter},
    },
    store::Store,
    Config,
};

pub fn routes() -> Vec<Route> {
    routes![register, login]
}

/// The voter a token was issued to.
#[derive(Debug, Serialize)]
pub struct VoterSummary {
    pub email: Email,
}

/// A freshly issued bearer token.
#[derive(Debug, Serialize)]
pub struct Session {
    pub message: String,
    pub token: String,
    pub user: VoterSummary,
}

impl Session {
    fn issue(message: &str, email: Email, config: &Config) -> Result<Self> {
        let token = AuthToken::new(email.clone()).encode(config)?;
        Ok(Self {
            message: message.to_string(),
            token,
            user: VoterSummary { email },
        })
    }
}

#[post("/register", data = "<credentials>")]
pub async fn register(
    credentials: Json<Credentials>,
    store: Store,
    config: &State<Config>,
) -> Result<(Status, Json<Session>)> {
    let voter = Voter::try_from(credentials.into_inner())?;
    store.insert_voter(&voter).await?;
    info!("Registered voter {}", voter.email);

    let session = Session::issue("Voter registered successfully", voter.email, config)?;
    Ok((Status::Created, Json(session)))
}

#[post("/login", data = "<credentials>")]
pub async fn login(
    credentials: Json<Credentials>,
    store: Store,
    config: &State<Config>,
) -> Result<Json<Session>> {
    let Credentials { email, password } = credentials.into_inner();
    if email.is_empty() || password.is_empty() {
        return Err(Error::BadRequest(
            "Email and password are required".to_string(),
        ));
    }
    let email = Email::try_from(email)?;

    let voter = store
        .find_active_voter(&email)
        .await?
        .ok_or(Error::VoterNotFound)?;
    if !voter.verify_password(password)? {
        return Err(Error::InvalidCredentials);
    }

    let session = Session::issue("Login successful", voter.email, config)?;
    Ok(Json(session))
}
