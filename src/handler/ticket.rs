use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use derive_more::From;
use futures::{future::OptionFuture, FutureExt as _};
use itertools::Itertools as _;
use serde::Deserialize;
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::{
    api, db, form,
    policy::{self, Actor},
};

use super::{
    internal, invalid, reporter_name, see_other, CurrentUser, DeleteInput,
    SharedAppState, Superuser,
};

const LIST: &str = "/ticket";

#[derive(Deserialize)]
pub struct ListTicketsInput {
    #[serde(default)]
    offset: usize,
    limit: Option<usize>,
}

pub async fn list(
    State(state): State<SharedAppState>,
    my: CurrentUser,
    Query(ListTicketsInput { offset, limit }): Query<ListTicketsInput>,
) -> Result<Json<api::ticket::List>, TicketError> {
    let page_fut = state.store.get_tickets_page(offset, limit);
    let total_count_fut = state.store.get_tickets_count();
    let (page, total_count) = tokio::try_join!(page_fut, total_count_fut)?;

    let tickets = render_all(&*state.store, my.actor(), page).await?;

    Ok(Json(api::ticket::List {
        tickets,
        total_count,
    }))
}

pub async fn get(
    State(state): State<SharedAppState>,
    my: CurrentUser,
    Path(id): Path<api::ticket::Id>,
) -> Result<Json<api::Ticket>, TicketError> {
    let ticket = state
        .store
        .get_ticket_by_id(id)
        .await?
        .ok_or(TicketError::NotFound)?;

    Ok(Json(render_one(&*state.store, my.actor(), ticket).await?))
}

pub async fn create(
    State(state): State<SharedAppState>,
    my: CurrentUser,
    Json(form): Json<form::TicketForm>,
) -> Result<Json<api::Ticket>, TicketError> {
    let fields = form.clean()?;
    check_choices(&*state.store, &fields).await?;

    let actor = my.actor();
    let ticket = state
        .store
        .create_ticket(db::ticket::NewTicket {
            title: fields.title,
            info: fields.info,
            assignee: fields.assignee,
            status: fields.status,
            ticket_type: fields.ticket_type,
            date_reported: OffsetDateTime::now_utc().date(),
            date_due: fields.date_due,
            reporter_id: policy::reporter_for(Some(actor)),
        })
        .await?;

    info!(ticket = %ticket.id, reporter = %my.0.username, "ticket logged");

    Ok(Json(render_one(&*state.store, actor, ticket).await?))
}

pub async fn update(
    State(state): State<SharedAppState>,
    my: CurrentUser,
    Path(id): Path<api::ticket::Id>,
    Json(form): Json<form::TicketForm>,
) -> Result<Json<api::Ticket>, TicketError> {
    use TicketError as E;

    let actor = my.actor();
    let mut ticket = state
        .store
        .get_ticket_by_id(id)
        .await?
        .ok_or(E::NotFound)?;
    if !policy::can_edit_ticket(actor, &ticket) {
        warn!(ticket = %id, user = %my.0.username, "ticket update refused");
        return Err(E::Forbidden);
    }

    let fields = form.clean()?;
    check_choices(&*state.store, &fields).await?;

    ticket.title = fields.title;
    ticket.info = fields.info;
    ticket.assignee = fields.assignee;
    ticket.status = fields.status;
    ticket.ticket_type = fields.ticket_type;
    ticket.date_due = fields.date_due;
    state.store.update_ticket(&ticket).await?;

    info!(ticket = %id, user = %my.0.username, "ticket updated");

    Ok(Json(render_one(&*state.store, actor, ticket).await?))
}

pub async fn confirm_delete(
    State(state): State<SharedAppState>,
    _: Superuser,
    Path(id): Path<api::ticket::Id>,
) -> Result<Json<api::DeleteConfirmation>, TicketError> {
    let ticket = state
        .store
        .get_ticket_by_id(id)
        .await?
        .ok_or(TicketError::NotFound)?;

    Ok(Json(api::DeleteConfirmation {
        model_name: "Ticket".into(),
        object_id: ticket.id.to_string(),
    }))
}

pub async fn delete(
    State(state): State<SharedAppState>,
    Superuser(my): Superuser,
    Path(id): Path<api::ticket::Id>,
    DeleteInput { delete }: DeleteInput,
) -> Result<Response, TicketError> {
    if !delete {
        state
            .store
            .get_ticket_by_id(id)
            .await?
            .ok_or(TicketError::NotFound)?;
        return Ok(see_other(LIST, None));
    }

    if !state.store.delete_ticket(id).await? {
        return Err(TicketError::NotFound);
    }
    info!(ticket = %id, user = %my.username, "ticket deleted");

    Ok(see_other(LIST, Some(format!("Ticket {id} deleted"))))
}

#[derive(Debug, From)]
pub enum TicketError {
    #[from]
    DbError(db::Error),
    Forbidden,
    #[from]
    Invalid(form::Errors),
    NotFound,
}

impl IntoResponse for TicketError {
    fn into_response(self) -> Response {
        match self {
            Self::DbError(e) => internal(&e),
            Self::Forbidden => see_other(
                LIST,
                Some(
                    "You are not an admin user, the assigned user or the \
                     user who created this ticket. You cannot update this \
                     ticket."
                        .into(),
                ),
            ),
            Self::Invalid(errors) => invalid(errors),
            Self::NotFound => StatusCode::NOT_FOUND.into_response(),
        }
    }
}

/// Rejects references to an assignee, status or type that doesn't exist.
async fn check_choices(
    store: &dyn db::Store,
    fields: &form::TicketFields,
) -> Result<(), TicketError> {
    let mut errors = form::Errors::new();
    if let Some(id) = fields.assignee {
        if store.get_user_by_id(id).await?.is_none() {
            errors.add("assignee", form::INVALID_CHOICE);
        }
    }
    if let Some(name) = &fields.status {
        if store.get_status(name).await?.is_none() {
            errors.add("status", form::INVALID_CHOICE);
        }
    }
    if let Some(name) = &fields.ticket_type {
        if store.get_ticket_type(name).await?.is_none() {
            errors.add("type", form::INVALID_CHOICE);
        }
    }
    Ok(errors.into_result(())?)
}

/// Resolves reporters and assignees of every ticket in one lookup.
pub(crate) async fn render_all(
    store: &dyn db::Store,
    actor: Actor,
    tickets: Vec<db::Ticket>,
) -> Result<Vec<api::Ticket>, db::Error> {
    let user_ids = tickets
        .iter()
        .map(|ticket| ticket.reporter_id)
        .chain(tickets.iter().filter_map(|ticket| ticket.assignee))
        .unique()
        .collect::<Vec<_>>();
    let users = store.get_users_by_ids(&user_ids).await?;

    Ok(tickets
        .into_iter()
        .map(|ticket| render(ticket, &users, actor))
        .collect())
}

async fn render_one(
    store: &dyn db::Store,
    actor: Actor,
    ticket: db::Ticket,
) -> Result<api::Ticket, db::Error> {
    let reporter_fut = store.get_user_by_id(ticket.reporter_id);
    let assignee_fut =
        OptionFuture::from(ticket.assignee.map(|id| store.get_user_by_id(id)))
            .map(Option::transpose);
    let (reporter, assignee) = tokio::try_join!(reporter_fut, assignee_fut)?;

    let users = reporter
        .into_iter()
        .chain(assignee.flatten())
        .map(|user| (user.id, user))
        .collect::<HashMap<_, _>>();

    Ok(render(ticket, &users, actor))
}

fn render(
    ticket: db::Ticket,
    users: &HashMap<db::user::Id, db::User>,
    actor: Actor,
) -> api::Ticket {
    let can_edit = policy::can_edit_ticket(actor, &ticket);
    api::Ticket {
        id: ticket.id,
        title: ticket.title,
        info: ticket.info,
        assignee: ticket
            .assignee
            .and_then(|id| users.get(&id))
            .map(api::User::from),
        status: ticket.status,
        ticket_type: ticket.ticket_type,
        date_reported: ticket.date_reported,
        date_due: ticket.date_due,
        reporter_id: ticket.reporter_id,
        reporter: reporter_name(users, ticket.reporter_id),
        can_edit,
    }
}
