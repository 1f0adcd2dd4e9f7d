use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use derive_more::From;
use itertools::Itertools as _;
use tracing::{info, warn};

use crate::{
    api, db, form,
    policy::{self, Actor},
};

use super::{
    internal, invalid, reporter_name, see_other, CurrentUser, DeleteInput,
    SharedAppState, Superuser,
};

const LIST: &str = "/status";

pub async fn list(
    State(state): State<SharedAppState>,
    my: CurrentUser,
) -> Result<Json<api::status::List>, StatusError> {
    let statuses = state.store.get_statuses().await?;

    let reporter_ids = statuses
        .iter()
        .map(|status| status.reporter_id)
        .unique()
        .collect::<Vec<_>>();
    let users = state.store.get_users_by_ids(&reporter_ids).await?;

    let actor = my.actor();
    let statuses = statuses
        .into_iter()
        .map(|status| api::Status {
            can_edit: policy::can_edit_simple_entity(actor, &status),
            reporter: reporter_name(&users, status.reporter_id),
            reporter_id: status.reporter_id,
            name: status.name,
            description: status.description,
        })
        .collect();

    Ok(Json(api::status::List { statuses }))
}

/// `name` arrives percent-decoded, so `In%20Progress` finds `In Progress`.
pub async fn get(
    State(state): State<SharedAppState>,
    my: CurrentUser,
    Path(name): Path<String>,
) -> Result<Json<api::Status>, StatusError> {
    let status = state
        .store
        .get_status(&name)
        .await?
        .ok_or(StatusError::NotFound)?;

    Ok(Json(render(&*state.store, my.actor(), status).await?))
}

pub async fn create(
    State(state): State<SharedAppState>,
    my: CurrentUser,
    Json(form): Json<form::StatusForm>,
) -> Result<Json<api::Status>, StatusError> {
    use StatusError as E;

    let form::Named { name, description } = form.clean()?;

    let actor = my.actor();
    let status = db::Status {
        name,
        description,
        reporter_id: policy::reporter_for(Some(actor)),
    };
    match state.store.create_status(&status).await {
        Err(db::Error::AlreadyExists) => {
            return Err(E::Invalid(form::Errors::of(
                "name",
                "Status with this Status name already exists.",
            )));
        }
        created => created?,
    }

    info!(status = %status.name, reporter = %my.0.username, "status created");

    Ok(Json(render(&*state.store, actor, status).await?))
}

/// Only the description changes. The name is the key and stays fixed.
pub async fn update(
    State(state): State<SharedAppState>,
    my: CurrentUser,
    Path(name): Path<String>,
    Json(form): Json<form::DescriptionForm>,
) -> Result<Json<api::Status>, StatusError> {
    use StatusError as E;

    let actor = my.actor();
    let mut status =
        state.store.get_status(&name).await?.ok_or(E::NotFound)?;
    if !policy::can_edit_simple_entity(actor, &status) {
        warn!(status = %name, user = %my.0.username, "status update refused");
        return Err(E::Forbidden);
    }

    status.description = form.clean()?;
    state.store.update_status(&status).await?;

    info!(status = %name, user = %my.0.username, "status updated");

    Ok(Json(render(&*state.store, actor, status).await?))
}

pub async fn confirm_delete(
    State(state): State<SharedAppState>,
    _: Superuser,
    Path(name): Path<String>,
) -> Result<Json<api::DeleteConfirmation>, StatusError> {
    let status = state
        .store
        .get_status(&name)
        .await?
        .ok_or(StatusError::NotFound)?;

    Ok(Json(api::DeleteConfirmation {
        model_name: "Status".into(),
        object_id: status.name,
    }))
}

/// Tickets in this status are removed along with it.
pub async fn delete(
    State(state): State<SharedAppState>,
    Superuser(my): Superuser,
    Path(name): Path<String>,
    DeleteInput { delete }: DeleteInput,
) -> Result<Response, StatusError> {
    use StatusError as E;

    if !delete {
        state.store.get_status(&name).await?.ok_or(E::NotFound)?;
        return Ok(see_other(LIST, None));
    }

    if !state.store.delete_status(&name).await? {
        return Err(E::NotFound);
    }
    info!(status = %name, user = %my.username, "status deleted");

    Ok(see_other(LIST, Some(format!("Status, {name}, deleted"))))
}

#[derive(Debug, From)]
pub enum StatusError {
    #[from]
    DbError(db::Error),
    Forbidden,
    #[from]
    Invalid(form::Errors),
    NotFound,
}

impl IntoResponse for StatusError {
    fn into_response(self) -> Response {
        match self {
            Self::DbError(e) => internal(&e),
            Self::Forbidden => see_other(
                LIST,
                Some(
                    "You are not an admin user or the user who created this \
                     status. You cannot update this status."
                        .into(),
                ),
            ),
            Self::Invalid(errors) => invalid(errors),
            Self::NotFound => StatusCode::NOT_FOUND.into_response(),
        }
    }
}

async fn render(
    store: &dyn db::Store,
    actor: Actor,
    status: db::Status,
) -> Result<api::Status, db::Error> {
    let reporter = store.get_user_by_id(status.reporter_id).await?;
    Ok(api::Status {
        can_edit: policy::can_edit_simple_entity(actor, &status),
        reporter: reporter.map_or_else(
            || api::UNKNOWN_REPORTER.to_owned(),
            |u| u.username,
        ),
        reporter_id: status.reporter_id,
        name: status.name,
        description: status.description,
    })
}
