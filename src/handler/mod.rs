//! HTTP surface: routing, request guards and the handlers behind them.

pub mod auth;
pub mod home;
pub mod status;
pub mod ticket;
pub mod ticket_type;

use std::{
    collections::HashMap, convert::Infallible, sync::Arc, time::Duration,
};

use async_trait::async_trait;
use axum::{
    extract::{FromRequest, FromRequestParts, Request},
    http::{
        header::{CONTENT_TYPE, LOCATION},
        request, StatusCode,
    },
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, RequestPartsExt as _, Router,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use derive_more::From;
use jsonwebtoken::{decode, DecodingKey, EncodingKey, Validation};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

use crate::{api, config, db, policy::Actor};

pub type SharedAppState = Arc<AppState>;

pub struct AppState {
    pub store: Arc<dyn db::Store>,

    pub jwt_expiration_time: Duration,

    pub jwt_decoding_key: DecodingKey,

    pub jwt_encoding_key: EncodingKey,

    /// Rendered once at start-up and served as is.
    pub readme: String,
}

impl AppState {
    pub fn new(
        store: Arc<dyn db::Store>,
        jwt: &config::Jwt,
        readme: String,
    ) -> Self {
        Self {
            store,
            jwt_expiration_time: jwt.expiration_time,
            jwt_decoding_key: DecodingKey::from_secret(jwt.secret.as_bytes()),
            jwt_encoding_key: EncodingKey::from_secret(jwt.secret.as_bytes()),
            readme,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home::home))
        .route("/readme", get(home::readme))
        .route("/register", post(auth::register))
        .route("/auth", post(auth::auth))
        .route("/user", get(auth::get_user))
        .route("/ticket", get(ticket::list).post(ticket::create))
        .route("/ticket/:id", get(ticket::get).patch(ticket::update))
        .route(
            "/ticket/:id/delete",
            get(ticket::confirm_delete).post(ticket::delete),
        )
        .route("/status", get(status::list).post(status::create))
        .route("/status/:name", get(status::get).patch(status::update))
        .route(
            "/status/:name/delete",
            get(status::confirm_delete).post(status::delete),
        )
        .route("/type", get(ticket_type::list).post(ticket_type::create))
        .route(
            "/type/:name",
            get(ticket_type::get).patch(ticket_type::update),
        )
        .route(
            "/type/:name/delete",
            get(ticket_type::confirm_delete).post(ticket_type::delete),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Body of a delete request. Nothing is removed unless `delete` is set.
///
/// Accepts `{"delete": true}` as JSON or a form body carrying a `delete`
/// field. A missing or unreadable body counts as not confirmed.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DeleteInput {
    pub delete: bool,
}

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

#[async_trait]
impl<S: Send + Sync> FromRequest<S> for DeleteInput {
    type Rejection = Infallible;

    async fn from_request(
        req: Request,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with(FORM_CONTENT_TYPE));
        if is_form {
            let fields =
                Form::<HashMap<String, String>>::from_request(req, state).await;
            return Ok(Self {
                delete: fields
                    .is_ok_and(|Form(fields)| fields.contains_key("delete")),
            });
        }
        Ok(Json::<Self>::from_request(req, state)
            .await
            .map(|Json(input)| input)
            .unwrap_or_default())
    }
}

/// `303 See Other` carrying an optional message for the user.
pub(crate) fn see_other(
    location: &'static str,
    message: Option<String>,
) -> Response {
    (
        StatusCode::SEE_OTHER,
        [(LOCATION, location)],
        Json(api::Notice { message }),
    )
        .into_response()
}

pub(crate) fn invalid(errors: api::FormErrors) -> Response {
    (StatusCode::UNPROCESSABLE_ENTITY, Json(errors)).into_response()
}

pub(crate) fn internal(e: &db::Error) -> Response {
    tracing::error!(error = %e, "store request failed");
    StatusCode::INTERNAL_SERVER_ERROR.into_response()
}

/// Username of `id`, or [`api::UNKNOWN_REPORTER`] if the account is gone.
pub(crate) fn reporter_name(
    users: &HashMap<db::user::Id, db::User>,
    id: db::user::Id,
) -> String {
    users.get(&id).map_or_else(
        || api::UNKNOWN_REPORTER.to_owned(),
        |u| u.username.clone(),
    )
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct AuthClaims {
    pub user_id: db::user::Id,
    pub exp: i64,
}

/// Rejection of the request guards below.
#[derive(Debug, From)]
pub enum GuardError {
    #[from]
    DbError(db::Error),
    Unauthenticated,
    NotSuperuser,
}

impl IntoResponse for GuardError {
    fn into_response(self) -> Response {
        match self {
            Self::DbError(e) => internal(&e),
            Self::Unauthenticated => StatusCode::UNAUTHORIZED.into_response(),
            Self::NotSuperuser => StatusCode::FORBIDDEN.into_response(),
        }
    }
}

#[async_trait]
impl FromRequestParts<SharedAppState> for AuthClaims {
    type Rejection = GuardError;

    async fn from_request_parts(
        parts: &mut request::Parts,
        state: &SharedAppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| GuardError::Unauthenticated)?;
        let token_data = decode::<Self>(
            bearer.token(),
            &state.jwt_decoding_key,
            &Validation::default(),
        )
        .map_err(|_| GuardError::Unauthenticated)?;

        Ok(token_data.claims)
    }
}

/// Signed-in user, reloaded from the store on every request so that
/// privilege changes apply immediately.
#[derive(Clone, Debug)]
pub struct CurrentUser(pub db::User);

impl CurrentUser {
    pub fn actor(&self) -> Actor {
        Actor::from(&self.0)
    }
}

#[async_trait]
impl FromRequestParts<SharedAppState> for CurrentUser {
    type Rejection = GuardError;

    async fn from_request_parts(
        parts: &mut request::Parts,
        state: &SharedAppState,
    ) -> Result<Self, Self::Rejection> {
        let claims = AuthClaims::from_request_parts(parts, state).await?;
        state
            .store
            .get_user_by_id(claims.user_id)
            .await?
            .map(Self)
            .ok_or(GuardError::Unauthenticated)
    }
}

/// Signed-in user holding the superuser flag. Gates every delete.
#[derive(Clone, Debug)]
pub struct Superuser(pub db::User);

#[async_trait]
impl FromRequestParts<SharedAppState> for Superuser {
    type Rejection = GuardError;

    async fn from_request_parts(
        parts: &mut request::Parts,
        state: &SharedAppState,
    ) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state).await?;
        if !crate::policy::can_delete(user.actor()) {
            tracing::warn!(
                user = %user.0.username,
                path = %parts.uri.path(),
                "delete refused to non-superuser",
            );
            return Err(GuardError::NotSuperuser);
        }
        Ok(Self(user.0))
    }
}
