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

const LIST: &str = "/type";

pub async fn list(
    State(state): State<SharedAppState>,
    my: CurrentUser,
) -> Result<Json<api::ticket_type::List>, TicketTypeError> {
    let ticket_types = state.store.get_ticket_types().await?;

    let reporter_ids = ticket_types
        .iter()
        .map(|ty| ty.reporter_id)
        .unique()
        .collect::<Vec<_>>();
    let users = state.store.get_users_by_ids(&reporter_ids).await?;

    let actor = my.actor();
    let ticket_types = ticket_types
        .into_iter()
        .map(|ty| api::TicketType {
            can_edit: policy::can_edit_simple_entity(actor, &ty),
            reporter: reporter_name(&users, ty.reporter_id),
            reporter_id: ty.reporter_id,
            name: ty.name,
            description: ty.description,
        })
        .collect();

    Ok(Json(api::ticket_type::List { ticket_types }))
}

pub async fn get(
    State(state): State<SharedAppState>,
    my: CurrentUser,
    Path(name): Path<String>,
) -> Result<Json<api::TicketType>, TicketTypeError> {
    let ty = state
        .store
        .get_ticket_type(&name)
        .await?
        .ok_or(TicketTypeError::NotFound)?;

    Ok(Json(render(&*state.store, my.actor(), ty).await?))
}

pub async fn create(
    State(state): State<SharedAppState>,
    my: CurrentUser,
    Json(form): Json<form::TicketTypeForm>,
) -> Result<Json<api::TicketType>, TicketTypeError> {
    use TicketTypeError as E;

    let form::Named { name, description } = form.clean()?;

    let actor = my.actor();
    let ty = db::TicketType {
        name,
        description,
        reporter_id: policy::reporter_for(Some(actor)),
    };
    match state.store.create_ticket_type(&ty).await {
        Err(db::Error::AlreadyExists) => {
            return Err(E::Invalid(form::Errors::of(
                "name",
                "Ticket type with this Type name already exists.",
            )));
        }
        created => created?,
    }

    info!(
        ticket_type = %ty.name,
        reporter = %my.0.username,
        "ticket type created",
    );

    Ok(Json(render(&*state.store, actor, ty).await?))
}

/// Only the description changes. The name is the key and stays fixed.
pub async fn update(
    State(state): State<SharedAppState>,
    my: CurrentUser,
    Path(name): Path<String>,
    Json(form): Json<form::DescriptionForm>,
) -> Result<Json<api::TicketType>, TicketTypeError> {
    use TicketTypeError as E;

    let actor = my.actor();
    let mut ty =
        state.store.get_ticket_type(&name).await?.ok_or(E::NotFound)?;
    if !policy::can_edit_simple_entity(actor, &ty) {
        warn!(
            ticket_type = %name,
            user = %my.0.username,
            "ticket type update refused",
        );
        return Err(E::Forbidden);
    }

    ty.description = form.clean()?;
    state.store.update_ticket_type(&ty).await?;

    info!(ticket_type = %name, user = %my.0.username, "ticket type updated");

    Ok(Json(render(&*state.store, actor, ty).await?))
}

pub async fn confirm_delete(
    State(state): State<SharedAppState>,
    _: Superuser,
    Path(name): Path<String>,
) -> Result<Json<api::DeleteConfirmation>, TicketTypeError> {
    let ty = state
        .store
        .get_ticket_type(&name)
        .await?
        .ok_or(TicketTypeError::NotFound)?;

    Ok(Json(api::DeleteConfirmation {
        model_name: "Ticket Type".into(),
        object_id: ty.name,
    }))
}

/// Tickets of this type are removed along with it.
pub async fn delete(
    State(state): State<SharedAppState>,
    Superuser(my): Superuser,
    Path(name): Path<String>,
    DeleteInput { delete }: DeleteInput,
) -> Result<Response, TicketTypeError> {
    use TicketTypeError as E;

    if !delete {
        state.store.get_ticket_type(&name).await?.ok_or(E::NotFound)?;
        return Ok(see_other(LIST, None));
    }

    if !state.store.delete_ticket_type(&name).await? {
        return Err(E::NotFound);
    }
    info!(ticket_type = %name, user = %my.username, "ticket type deleted");

    Ok(see_other(LIST, Some(format!("Type, {name}, deleted"))))
}

#[derive(Debug, From)]
pub enum TicketTypeError {
    #[from]
    DbError(db::Error),
    Forbidden,
    #[from]
    Invalid(form::Errors),
    NotFound,
}

impl IntoResponse for TicketTypeError {
    fn into_response(self) -> Response {
        match self {
            Self::DbError(e) => internal(&e),
            Self::Forbidden => see_other(
                LIST,
                Some(
                    "You are not an admin user or the user who created this \
                     ticket type. You cannot update this type."
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
    ty: db::TicketType,
) -> Result<api::TicketType, db::Error> {
    let reporter = store.get_user_by_id(ty.reporter_id).await?;
    Ok(api::TicketType {
        can_edit: policy::can_edit_simple_entity(actor, &ty),
        reporter: reporter.map_or_else(
            || api::UNKNOWN_REPORTER.to_owned(),
            |u| u.username,
        ),
        reporter_id: ty.reporter_id,
        name: ty.name,
        description: ty.description,
    })
}
