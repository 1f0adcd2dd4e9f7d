use async_trait::async_trait;
use tokio_postgres::Row;

use super::{user, Client, Error};

#[derive(Clone, Debug, PartialEq)]
pub struct TicketType {
    pub name: String,
    pub description: Option<String>,
    pub reporter_id: user::Id,
}

#[async_trait]
pub trait TicketTypeRepo {
    /// Fails with [`Error::AlreadyExists`] when the name is taken.
    async fn create_ticket_type(&self, ty: &TicketType) -> Result<(), Error>;

    async fn get_ticket_type(
        &self,
        name: &str,
    ) -> Result<Option<TicketType>, Error>;

    async fn get_ticket_types(&self) -> Result<Vec<TicketType>, Error>;

    async fn update_ticket_type(&self, ty: &TicketType) -> Result<(), Error>;

    /// Removes the type together with every ticket of that type.
    async fn delete_ticket_type(&self, name: &str) -> Result<bool, Error>;
}

fn from_row(row: &Row) -> TicketType {
    TicketType {
        name: row.get("name"),
        description: row.get("description"),
        reporter_id: row.get("reporter_id"),
    }
}

#[async_trait]
impl TicketTypeRepo for Client {
    async fn create_ticket_type(&self, ty: &TicketType) -> Result<(), Error> {
        const SQL: &str = "\
            INSERT INTO ticket_types (name, description, reporter_id) \
            VALUES ($1, $2, $3)";

        self.0
            .execute(SQL, &[&ty.name, &ty.description, &ty.reporter_id])
            .await
            .map(drop)
            .map_err(Error::from_write)
    }

    async fn get_ticket_type(
        &self,
        name: &str,
    ) -> Result<Option<TicketType>, Error> {
        const SQL: &str = "\
            SELECT name, description, reporter_id \
            FROM ticket_types \
            WHERE name = $1";
        Ok(self.0.query_opt(SQL, &[&name]).await?.as_ref().map(from_row))
    }

    async fn get_ticket_types(&self) -> Result<Vec<TicketType>, Error> {
        const SQL: &str = "\
            SELECT name, description, reporter_id \
            FROM ticket_types \
            ORDER BY name";
        Ok(self.0.query(SQL, &[]).await?.iter().map(from_row).collect())
    }

    async fn update_ticket_type(&self, ty: &TicketType) -> Result<(), Error> {
        const SQL: &str = "\
            UPDATE ticket_types \
            SET description = $2 \
            WHERE name = $1";
        self.0
            .execute(SQL, &[&ty.name, &ty.description])
            .await
            .map(drop)
            .map_err(Error::from)
    }

    async fn delete_ticket_type(&self, name: &str) -> Result<bool, Error> {
        const SQL: &str = "DELETE FROM ticket_types WHERE name = $1";
        Ok(self.0.execute(SQL, &[&name]).await? > 0)
    }
}
