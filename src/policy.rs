//! Who may change what. Every function here is a pure decision over an
//! explicit [`Actor`]; handlers consult them before mutating anything.

use crate::db::{self, user};

/// The acting user, as far as permissions are concerned.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Actor {
    pub id: user::Id,
    pub is_superuser: bool,
}

impl From<&db::User> for Actor {
    fn from(user: &db::User) -> Self {
        Self {
            id: user.id,
            is_superuser: user.is_superuser,
        }
    }
}

/// Records stamped with the id of the user who created them.
pub trait Reported {
    fn reporter_id(&self) -> user::Id;
}

impl Reported for db::Status {
    fn reporter_id(&self) -> user::Id {
        self.reporter_id
    }
}

impl Reported for db::TicketType {
    fn reporter_id(&self) -> user::Id {
        self.reporter_id
    }
}

impl Reported for db::Ticket {
    fn reporter_id(&self) -> user::Id {
        self.reporter_id
    }
}

/// Reporter, superuser or assignee. An unassigned ticket simply has no
/// assignee branch.
pub fn can_edit_ticket(actor: Actor, ticket: &db::Ticket) -> bool {
    actor.id == ticket.reporter_id
        || actor.is_superuser
        || ticket.assignee == Some(actor.id)
}

/// Reporter or superuser. Used for statuses and ticket types, which have no
/// assignee.
pub fn can_edit_simple_entity(actor: Actor, entity: &impl Reported) -> bool {
    actor.id == entity.reporter_id() || actor.is_superuser
}

pub fn can_delete(actor: Actor) -> bool {
    actor.is_superuser
}

/// Owner to stamp on a new record. Falls back to [`user::Id::UNKNOWN`] when
/// no actor is known, which leaves the record editable by superusers (and
/// the assignee, for tickets) only.
pub fn reporter_for(actor: Option<Actor>) -> user::Id {
    actor.map_or(user::Id::UNKNOWN, |a| a.id)
}
