pub mod memory;
pub mod status;
pub mod ticket;
pub mod ticket_type;
pub mod user;

use std::fmt;

use crate::config;

use derive_more::{Display, From};
use tokio_postgres::{error::SqlState, tls::NoTlsStream, NoTls, Socket};

pub use self::{
    memory::Memory,
    status::{Status, StatusRepo},
    ticket::{Ticket, TicketRepo},
    ticket_type::{TicketType, TicketTypeRepo},
    user::{User, UserRepo},
};

pub type Connection = tokio_postgres::Connection<Socket, NoTlsStream>;

/// Everything the handlers need from persistence.
pub trait Store:
    UserRepo + StatusRepo + TicketTypeRepo + TicketRepo + Send + Sync
{
}

impl<T> Store for T where
    T: UserRepo + StatusRepo + TicketTypeRepo + TicketRepo + Send + Sync
{
}

#[derive(Debug, Display, From)]
pub enum Error {
    #[display("database failure: {_0}")]
    #[from]
    Postgres(tokio_postgres::Error),

    /// Unique key is already taken.
    #[display("record already exists")]
    AlreadyExists,
}

impl std::error::Error for Error {}

impl Error {
    /// Lifts unique violations out of a driver error.
    fn from_write(e: tokio_postgres::Error) -> Self {
        if e.code() == Some(&SqlState::UNIQUE_VIOLATION) {
            Self::AlreadyExists
        } else {
            Self::Postgres(e)
        }
    }
}

pub async fn connect(
    config: config::Db,
) -> Result<(Client, Connection), Error> {
    tokio_postgres::connect(&config.url, NoTls)
        .await
        .map(|(client, connection)| (Client(client), connection))
        .map_err(Error::from)
}

pub struct Client(tokio_postgres::Client);

impl Client {
    /// Creates missing tables. Safe to run on every start.
    pub async fn migrate(&self) -> Result<(), Error> {
        const SQL: &str = include_str!("../../migrations/0001_init.sql");
        Ok(self.0.batch_execute(SQL).await?)
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client").finish_non_exhaustive()
    }
}
