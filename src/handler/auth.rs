use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use derive_more::From;
use jsonwebtoken::{encode, Header};
use serde::Deserialize;
use time::OffsetDateTime;
use tokio::task;
use tracing::info;

use crate::{api, db, form};

use super::{
    internal, invalid, AppState, AuthClaims, CurrentUser, SharedAppState,
};

#[derive(Deserialize)]
pub struct AuthInput {
    login: String,
    password: String,
}

pub async fn auth(
    State(state): State<SharedAppState>,
    Json(AuthInput { login, password }): Json<AuthInput>,
) -> Result<String, AuthError> {
    use AuthError as E;

    let user = state
        .store
        .get_user_by_username(&login)
        .await?
        .ok_or(E::WrongLoginOrPassword)?;

    let hash = user.password_hash.clone();
    let verified = task::spawn_blocking(move || hash.verify(&password))
        .await
        .map_err(|_| E::Hashing)?;
    if !verified {
        return Err(E::WrongLoginOrPassword);
    }

    info!(user = %user.username, "signed in");
    issue_token(&state, user.id).map_err(|_| E::TokenNotIssued)
}

#[derive(Debug, From)]
pub enum AuthError {
    #[from]
    DbError(db::Error),
    Hashing,
    TokenNotIssued,
    WrongLoginOrPassword,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            Self::DbError(e) => internal(&e),
            Self::Hashing | Self::TokenNotIssued => {
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
            Self::WrongLoginOrPassword => StatusCode::FORBIDDEN.into_response(),
        }
    }
}

/// Creates an account and signs it in, answering with an access token.
pub async fn register(
    State(state): State<SharedAppState>,
    Json(registration): Json<form::Registration>,
) -> Result<String, RegisterError> {
    use RegisterError as E;

    let account = registration.clean()?;

    let password = account.password;
    let password_hash = task::spawn_blocking(move || {
        db::user::PasswordHash::new(&password)
    })
    .await
    .map_err(|_| E::Hashing)?
    .map_err(|_| E::Hashing)?;

    let created = state
        .store
        .create_user(db::user::NewUser {
            username: account.username,
            email: account.email,
            first_name: account.first_name,
            last_name: account.last_name,
            password_hash,
            is_superuser: false,
        })
        .await;
    let user = match created {
        Err(db::Error::AlreadyExists) => {
            return Err(E::Invalid(form::Errors::of(
                "username",
                "A user with that username already exists.",
            )));
        }
        created => created?,
    };

    info!(user = %user.username, id = %user.id, "registered");
    issue_token(&state, user.id).map_err(|_| E::TokenNotIssued)
}

#[derive(Debug, From)]
pub enum RegisterError {
    #[from]
    DbError(db::Error),
    Hashing,
    #[from]
    Invalid(form::Errors),
    TokenNotIssued,
}

impl IntoResponse for RegisterError {
    fn into_response(self) -> Response {
        match self {
            Self::DbError(e) => internal(&e),
            Self::Invalid(errors) => invalid(errors),
            Self::Hashing | Self::TokenNotIssued => {
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

pub async fn get_user(CurrentUser(my): CurrentUser) -> Json<api::User> {
    Json(api::User::from(&my))
}

fn issue_token(
    state: &AppState,
    user_id: db::user::Id,
) -> Result<String, jsonwebtoken::errors::Error> {
    let expires_at = OffsetDateTime::now_utc() + state.jwt_expiration_time;
    encode(
        &Header::default(),
        &AuthClaims {
            user_id,
            exp: expires_at.unix_timestamp(),
        },
        &state.jwt_encoding_key,
    )
}
