use async_trait::async_trait;
use tokio_postgres::Row;

use super::{user, Client, Error};

/// Workflow state a ticket can be put in, keyed by its name.
#[derive(Clone, Debug, PartialEq)]
pub struct Status {
    pub name: String,
    pub description: Option<String>,
    pub reporter_id: user::Id,
}

#[async_trait]
pub trait StatusRepo {
    /// Fails with [`Error::AlreadyExists`] when the name is taken.
    async fn create_status(&self, status: &Status) -> Result<(), Error>;

    async fn get_status(&self, name: &str) -> Result<Option<Status>, Error>;

    async fn get_statuses(&self) -> Result<Vec<Status>, Error>;

    /// Rewrites the description only; names never change.
    async fn update_status(&self, status: &Status) -> Result<(), Error>;

    /// Removes the status together with every ticket referencing it.
    async fn delete_status(&self, name: &str) -> Result<bool, Error>;
}

fn from_row(row: &Row) -> Status {
    Status {
        name: row.get("name"),
        description: row.get("description"),
        reporter_id: row.get("reporter_id"),
    }
}

#[async_trait]
impl StatusRepo for Client {
    async fn create_status(&self, status: &Status) -> Result<(), Error> {
        const SQL: &str = "\
            INSERT INTO statuses (name, description, reporter_id) \
            VALUES ($1, $2, $3)";

        self.0
            .execute(
                SQL,
                &[&status.name, &status.description, &status.reporter_id],
            )
            .await
            .map(drop)
            .map_err(Error::from_write)
    }

    async fn get_status(&self, name: &str) -> Result<Option<Status>, Error> {
        const SQL: &str = "\
            SELECT name, description, reporter_id \
            FROM statuses \
            WHERE name = $1";
        Ok(self.0.query_opt(SQL, &[&name]).await?.as_ref().map(from_row))
    }

    async fn get_statuses(&self) -> Result<Vec<Status>, Error> {
        const SQL: &str = "\
            SELECT name, description, reporter_id \
            FROM statuses \
            ORDER BY name";
        Ok(self.0.query(SQL, &[]).await?.iter().map(from_row).collect())
    }

    async fn update_status(&self, status: &Status) -> Result<(), Error> {
        const SQL: &str = "\
            UPDATE statuses \
            SET description = $2 \
            WHERE name = $1";
        self.0
            .execute(SQL, &[&status.name, &status.description])
            .await
            .map(drop)
            .map_err(Error::from)
    }

    async fn delete_status(&self, name: &str) -> Result<bool, Error> {
        // Referencing tickets go with it through `ON DELETE CASCADE`.
        const SQL: &str = "DELETE FROM statuses WHERE name = $1";
        Ok(self.0.execute(SQL, &[&name]).await? > 0)
    }
}
