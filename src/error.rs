use argon2::Error as Argon2Error;
use jsonwebtoken::errors::Error as JwtError;
use mongodb::error::Error as DbError;
use rocket::{
    http::{Status, StatusClass},
    response::{self, Responder},
    serde::json::Json,
    Request,
};
use serde::Serialize;
use thiserror::Error;

use crate::logging::RequestId;
use crate::model::role::Role;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid role '{0}'")]
    InvalidRole(String),
    #[error("Candidate is required")]
    MissingCandidate,
    #[error("Candidate '{candidate}' is not valid for {role}")]
    InvalidCandidate { role: Role, candidate: String },
    #[error("Voter not found or inactive")]
    VoterNotFound,
    #[error("You have already voted for {0}")]
    AlreadyVoted(Role),
    #[error("Access denied: {0}")]
    Unauthenticated(&'static str),
    #[error("Invalid token")]
    Unauthorized(#[from] JwtError),
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Voter already exists")]
    VoterExists,
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Storage unavailable: {0}")]
    StoreUnavailable(#[from] DbError),
    #[error(transparent)]
    Argon2(#[from] Argon2Error),
    #[error("Invalid candidate directory: {0}")]
    InvalidDirectory(String),
}

impl Error {
    /// The HTTP status this error is reported with.
    pub fn status(&self) -> Status {
        match self {
            Self::InvalidRole(_)
            | Self::MissingCandidate
            | Self::InvalidCandidate { .. }
            | Self::AlreadyVoted(_)
            | Self::BadRequest(_) => Status::BadRequest,
            Self::Unauthenticated(_) | Self::InvalidCredentials => Status::Unauthorized,
            Self::Unauthorized(_) => Status::Forbidden,
            Self::VoterNotFound => Status::NotFound,
            Self::VoterExists => Status::Conflict,
            Self::StoreUnavailable(_) => Status::ServiceUnavailable,
            Self::Argon2(_) | Self::InvalidDirectory(_) => Status::InternalServerError,
        }
    }

    /// A stable machine-readable name for the failed precondition.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidRole(_) => "invalidRole",
            Self::MissingCandidate | Self::InvalidCandidate { .. } => "invalidCandidate",
            Self::VoterNotFound => "voterNotFound",
            Self::AlreadyVoted(_) => "alreadyVoted",
            Self::Unauthenticated(_) => "unauthenticated",
            Self::Unauthorized(_) => "unauthorized",
            Self::InvalidCredentials => "invalidCredentials",
            Self::VoterExists => "voterExists",
            Self::BadRequest(_) => "badRequest",
            Self::StoreUnavailable(_) => "storeUnavailable",
            Self::Argon2(_) | Self::InvalidDirectory(_) => "internal",
        }
    }
}

/// The JSON body of every failed request.
#[derive(Debug, Serialize)]
pub(crate) struct ErrorBody {
    pub(crate) error: &'static str,
    pub(crate) message: String,
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'o> {
        let status = self.status();
        // Internal details are logged, not returned.
        let message = match status.class() {
            StatusClass::ServerError => {
                error!("req{} {} {}: {self}", RequestId::of(req), req.method(), req.uri());
                if matches!(self, Self::StoreUnavailable(_)) {
                    "Storage unavailable, try again later".to_string()
                } else {
                    "Internal server error".to_string()
                }
            }
            _ => {
                debug!("req{} {} {}: {self}", RequestId::of(req), req.method(), req.uri());
                self.to_string()
            }
        };
        let body = ErrorBody {
            error: self.kind(),
            message,
        };
        (status, Json(body)).respond_to(req)
    }
}
