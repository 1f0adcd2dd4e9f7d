use axum::{
    extract::State,
    http::header::CONTENT_TYPE,
    response::{IntoResponse, Response},
    Json,
};
use derive_more::From;

use crate::{api, db};

use super::{internal, ticket, CurrentUser, GuardError, SharedAppState};

/// Tickets assigned to the caller. Anonymous visitors get an empty page,
/// but a failed user lookup is still an error.
pub async fn home(
    State(state): State<SharedAppState>,
    my: Result<CurrentUser, GuardError>,
) -> Result<Json<api::Home>, HomeError> {
    let my = match my {
        Ok(my) => my,
        Err(GuardError::Unauthenticated) => {
            return Ok(Json(api::Home {
                user: None,
                tickets: Vec::new(),
            }));
        }
        Err(e) => return Err(e.into()),
    };

    let assigned = state.store.get_tickets_assigned_to(my.0.id).await?;
    let tickets =
        ticket::render_all(&*state.store, my.actor(), assigned).await?;

    Ok(Json(api::Home {
        user: Some(api::User::from(&my.0)),
        tickets,
    }))
}

#[derive(Debug, From)]
pub enum HomeError {
    #[from]
    DbError(db::Error),
    #[from]
    Guard(GuardError),
}

impl IntoResponse for HomeError {
    fn into_response(self) -> Response {
        match self {
            Self::DbError(e) => internal(&e),
            Self::Guard(e) => e.into_response(),
        }
    }
}

pub async fn readme(State(state): State<SharedAppState>) -> Response {
    (
        [(CONTENT_TYPE, "text/markdown; charset=utf-8")],
        state.readme.clone(),
    )
        .into_response()
}
