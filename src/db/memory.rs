//! In-process [`Store`](super::Store) backing the integration tests. Mirrors
//! the PostgreSQL schema's unique keys and cascades.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{
    status::StatusRepo,
    ticket::{self, NewTicket, TicketRepo},
    ticket_type::TicketTypeRepo,
    user::{self, NewUser, UserRepo},
    Error, Status, Ticket, TicketType, User,
};

#[derive(Debug, Default)]
pub struct Memory(Mutex<Tables>);

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<user::Id, User>,
    statuses: BTreeMap<String, Status>,
    ticket_types: BTreeMap<String, TicketType>,
    tickets: BTreeMap<ticket::Id, Ticket>,
    last_user_id: i64,
    last_ticket_id: i64,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepo for Memory {
    async fn create_user(&self, user: NewUser) -> Result<User, Error> {
        let mut tables = self.0.lock().await;
        if tables.users.values().any(|u| u.username == user.username) {
            return Err(Error::AlreadyExists);
        }
        tables.last_user_id += 1;
        let user = user.with_id(user::Id::from(tables.last_user_id));
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<User>, Error> {
        let tables = self.0.lock().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn get_user_by_id(
        &self,
        id: user::Id,
    ) -> Result<Option<User>, Error> {
        Ok(self.0.lock().await.users.get(&id).cloned())
    }

    async fn get_users_by_ids(
        &self,
        ids: &[user::Id],
    ) -> Result<HashMap<user::Id, User>, Error> {
        let tables = self.0.lock().await;
        Ok(ids
            .iter()
            .filter_map(|id| tables.users.get(id))
            .map(|u| (u.id, u.clone()))
            .collect())
    }
}

#[async_trait]
impl StatusRepo for Memory {
    async fn create_status(&self, status: &Status) -> Result<(), Error> {
        let mut tables = self.0.lock().await;
        if tables.statuses.contains_key(&status.name) {
            return Err(Error::AlreadyExists);
        }
        tables.statuses.insert(status.name.clone(), status.clone());
        Ok(())
    }

    async fn get_status(&self, name: &str) -> Result<Option<Status>, Error> {
        Ok(self.0.lock().await.statuses.get(name).cloned())
    }

    async fn get_statuses(&self) -> Result<Vec<Status>, Error> {
        Ok(self.0.lock().await.statuses.values().cloned().collect())
    }

    async fn update_status(&self, status: &Status) -> Result<(), Error> {
        let mut tables = self.0.lock().await;
        if let Some(stored) = tables.statuses.get_mut(&status.name) {
            stored.description.clone_from(&status.description);
        }
        Ok(())
    }

    async fn delete_status(&self, name: &str) -> Result<bool, Error> {
        let mut tables = self.0.lock().await;
        if tables.statuses.remove(name).is_none() {
            return Ok(false);
        }
        tables
            .tickets
            .retain(|_, t| t.status.as_deref() != Some(name));
        Ok(true)
    }
}

#[async_trait]
impl TicketTypeRepo for Memory {
    async fn create_ticket_type(&self, ty: &TicketType) -> Result<(), Error> {
        let mut tables = self.0.lock().await;
        if tables.ticket_types.contains_key(&ty.name) {
            return Err(Error::AlreadyExists);
        }
        tables.ticket_types.insert(ty.name.clone(), ty.clone());
        Ok(())
    }

    async fn get_ticket_type(
        &self,
        name: &str,
    ) -> Result<Option<TicketType>, Error> {
        Ok(self.0.lock().await.ticket_types.get(name).cloned())
    }

    async fn get_ticket_types(&self) -> Result<Vec<TicketType>, Error> {
        Ok(self.0.lock().await.ticket_types.values().cloned().collect())
    }

    async fn update_ticket_type(&self, ty: &TicketType) -> Result<(), Error> {
        let mut tables = self.0.lock().await;
        if let Some(stored) = tables.ticket_types.get_mut(&ty.name) {
            stored.description.clone_from(&ty.description);
        }
        Ok(())
    }

    async fn delete_ticket_type(&self, name: &str) -> Result<bool, Error> {
        let mut tables = self.0.lock().await;
        if tables.ticket_types.remove(name).is_none() {
            return Ok(false);
        }
        tables
            .tickets
            .retain(|_, t| t.ticket_type.as_deref() != Some(name));
        Ok(true)
    }
}

#[async_trait]
impl TicketRepo for Memory {
    async fn create_ticket(&self, ticket: NewTicket) -> Result<Ticket, Error> {
        let mut tables = self.0.lock().await;
        tables.last_ticket_id += 1;
        let ticket = ticket.with_id(ticket::Id::from(tables.last_ticket_id));
        tables.tickets.insert(ticket.id, ticket.clone());
        Ok(ticket)
    }

    async fn get_ticket_by_id(
        &self,
        id: ticket::Id,
    ) -> Result<Option<Ticket>, Error> {
        Ok(self.0.lock().await.tickets.get(&id).cloned())
    }

    async fn get_tickets_page(
        &self,
        offset: usize,
        limit: Option<usize>,
    ) -> Result<Vec<Ticket>, Error> {
        let tables = self.0.lock().await;
        Ok(tables
            .tickets
            .values()
            .rev()
            .skip(offset)
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn get_tickets_count(&self) -> Result<usize, Error> {
        Ok(self.0.lock().await.tickets.len())
    }

    async fn get_tickets_assigned_to(
        &self,
        assignee: user::Id,
    ) -> Result<Vec<Ticket>, Error> {
        let tables = self.0.lock().await;
        Ok(tables
            .tickets
            .values()
            .rev()
            .filter(|t| t.assignee == Some(assignee))
            .cloned()
            .collect())
    }

    async fn update_ticket(&self, ticket: &Ticket) -> Result<(), Error> {
        let mut tables = self.0.lock().await;
        if let Some(stored) = tables.tickets.get_mut(&ticket.id) {
            *stored = Ticket {
                date_reported: stored.date_reported,
                reporter_id: stored.reporter_id,
                ..ticket.clone()
            };
        }
        Ok(())
    }

    async fn delete_ticket(&self, id: ticket::Id) -> Result<bool, Error> {
        Ok(self.0.lock().await.tickets.remove(&id).is_some())
    }
}
