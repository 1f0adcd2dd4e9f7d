use std::error::Error as StdError;

use async_trait::async_trait;
use derive_more::Display;
use serde::{Deserialize, Serialize};
use time::Date;
use tokio_postgres::{
    types::{
        accepts, private::BytesMut, to_sql_checked, FromSql, IsNull, ToSql,
        Type,
    },
    Row,
};

use super::{user, Client, Error};

#[derive(Clone, Debug, PartialEq)]
pub struct Ticket {
    pub id: Id,
    pub title: String,
    pub info: Option<String>,
    pub assignee: Option<user::Id>,
    pub status: Option<String>,
    pub ticket_type: Option<String>,
    /// Day the ticket was created. Never changes afterwards.
    pub date_reported: Date,
    pub date_due: Option<Date>,
    pub reporter_id: user::Id,
}

/// Ticket about to be inserted, before an [`Id`] is assigned.
#[derive(Clone, Debug)]
pub struct NewTicket {
    pub title: String,
    pub info: Option<String>,
    pub assignee: Option<user::Id>,
    pub status: Option<String>,
    pub ticket_type: Option<String>,
    pub date_reported: Date,
    pub date_due: Option<Date>,
    pub reporter_id: user::Id,
}

impl NewTicket {
    pub(crate) fn with_id(self, id: Id) -> Ticket {
        Ticket {
            id,
            title: self.title,
            info: self.info,
            assignee: self.assignee,
            status: self.status,
            ticket_type: self.ticket_type,
            date_reported: self.date_reported,
            date_due: self.date_due,
            reporter_id: self.reporter_id,
        }
    }
}

#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
pub struct Id(i64);

impl From<i64> for Id {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl FromSql<'_> for Id {
    accepts!(INT8);

    fn from_sql(
        ty: &Type,
        raw: &[u8],
    ) -> Result<Self, Box<dyn StdError + Sync + Send>> {
        i64::from_sql(ty, raw).map(Self)
    }
}

impl ToSql for Id {
    accepts!(INT8);

    to_sql_checked!();

    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn StdError + Sync + Send>> {
        self.0.to_sql(ty, out)
    }
}

#[async_trait]
pub trait TicketRepo {
    async fn create_ticket(&self, ticket: NewTicket) -> Result<Ticket, Error>;

    async fn get_ticket_by_id(&self, id: Id) -> Result<Option<Ticket>, Error>;

    /// Newest first. `None` limit returns everything after `offset`.
    async fn get_tickets_page(
        &self,
        offset: usize,
        limit: Option<usize>,
    ) -> Result<Vec<Ticket>, Error>;

    async fn get_tickets_count(&self) -> Result<usize, Error>;

    async fn get_tickets_assigned_to(
        &self,
        assignee: user::Id,
    ) -> Result<Vec<Ticket>, Error>;

    /// Writes every editable field. `date_reported` and `reporter_id` are
    /// left as they were stored.
    async fn update_ticket(&self, ticket: &Ticket) -> Result<(), Error>;

    async fn delete_ticket(&self, id: Id) -> Result<bool, Error>;
}

fn from_row(row: &Row) -> Ticket {
    Ticket {
        id: row.get("id"),
        title: row.get("title"),
        info: row.get("info"),
        assignee: row.get("assignee_id"),
        status: row.get("status_name"),
        ticket_type: row.get("type_name"),
        date_reported: row.get("date_reported"),
        date_due: row.get("date_due"),
        reporter_id: row.get("reporter_id"),
    }
}

fn to_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[async_trait]
impl TicketRepo for Client {
    async fn create_ticket(&self, ticket: NewTicket) -> Result<Ticket, Error> {
        const SQL: &str = "\
            INSERT INTO tickets (title, info, assignee_id, status_name, \
                                 type_name, date_reported, date_due, \
                                 reporter_id) \
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
            RETURNING id";

        let row = self
            .0
            .query_one(
                SQL,
                &[
                    &ticket.title,
                    &ticket.info,
                    &ticket.assignee,
                    &ticket.status,
                    &ticket.ticket_type,
                    &ticket.date_reported,
                    &ticket.date_due,
                    &ticket.reporter_id,
                ],
            )
            .await?;
        Ok(ticket.with_id(row.get("id")))
    }

    async fn get_ticket_by_id(&self, id: Id) -> Result<Option<Ticket>, Error> {
        const SQL: &str = "\
            SELECT id, title, info, assignee_id, status_name, type_name, \
                   date_reported, date_due, reporter_id \
            FROM tickets \
            WHERE id = $1";
        Ok(self.0.query_opt(SQL, &[&id]).await?.as_ref().map(from_row))
    }

    async fn get_tickets_page(
        &self,
        offset: usize,
        limit: Option<usize>,
    ) -> Result<Vec<Ticket>, Error> {
        // `LIMIT NULL` is the same as no limit.
        const SQL: &str = "\
            SELECT id, title, info, assignee_id, status_name, type_name, \
                   date_reported, date_due, reporter_id \
            FROM tickets \
            ORDER BY id DESC \
            OFFSET $1 LIMIT $2";

        let offset = to_i64(offset);
        let limit = limit.map(to_i64);
        Ok(self
            .0
            .query(SQL, &[&offset, &limit])
            .await?
            .iter()
            .map(from_row)
            .collect())
    }

    async fn get_tickets_count(&self) -> Result<usize, Error> {
        const SQL: &str = "SELECT COUNT(*) FROM tickets";
        let count = self.0.query_one(SQL, &[]).await?.get::<_, i64>(0);
        Ok(usize::try_from(count).unwrap_or_default())
    }

    async fn get_tickets_assigned_to(
        &self,
        assignee: user::Id,
    ) -> Result<Vec<Ticket>, Error> {
        const SQL: &str = "\
            SELECT id, title, info, assignee_id, status_name, type_name, \
                   date_reported, date_due, reporter_id \
            FROM tickets \
            WHERE assignee_id = $1 \
            ORDER BY id DESC";
        Ok(self
            .0
            .query(SQL, &[&assignee])
            .await?
            .iter()
            .map(from_row)
            .collect())
    }

    async fn update_ticket(&self, ticket: &Ticket) -> Result<(), Error> {
        const SQL: &str = "\
            UPDATE tickets \
            SET title = $2, \
                info = $3, \
                assignee_id = $4, \
                status_name = $5, \
                type_name = $6, \
                date_due = $7 \
            WHERE id = $1";

        self.0
            .execute(
                SQL,
                &[
                    &ticket.id,
                    &ticket.title,
                    &ticket.info,
                    &ticket.assignee,
                    &ticket.status,
                    &ticket.ticket_type,
                    &ticket.date_due,
                ],
            )
            .await
            .map(drop)
            .map_err(Error::from)
    }

    async fn delete_ticket(&self, id: Id) -> Result<bool, Error> {
        const SQL: &str = "DELETE FROM tickets WHERE id = $1";
        Ok(self.0.execute(SQL, &[&id]).await? > 0)
    }
}
