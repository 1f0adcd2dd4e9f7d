use std::{collections::HashMap, error::Error as StdError};

use argon2::{
    password_hash::{
        self, PasswordHasher as _, PasswordVerifier as _, SaltString,
    },
    Argon2,
};
use async_trait::async_trait;
use derive_more::Display;
use serde::{Deserialize, Serialize};
use tokio_postgres::{
    types::{
        accepts, private::BytesMut, to_sql_checked, FromSql, IsNull, ToSql,
        Type,
    },
    Row,
};
use uuid::Uuid;

use super::{Client, Error};

#[derive(Clone, Debug)]
pub struct User {
    pub id: Id,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: PasswordHash,
    pub is_superuser: bool,
}

/// User about to be inserted, before an [`Id`] is assigned.
#[derive(Clone, Debug)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: PasswordHash,
    pub is_superuser: bool,
}

impl NewUser {
    pub(crate) fn with_id(self, id: Id) -> User {
        User {
            id,
            username: self.username,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            password_hash: self.password_hash,
            is_superuser: self.is_superuser,
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

impl Id {
    /// Owner stamped when no acting user is known.
    pub const UNKNOWN: Self = Self(0);
}

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

/// Argon2 hash in PHC string format.
#[derive(Clone, Debug, PartialEq)]
pub struct PasswordHash(String);

impl PasswordHash {
    pub fn new(secret: &str) -> Result<Self, password_hash::Error> {
        let salt = SaltString::encode_b64(Uuid::new_v4().as_bytes())?;
        let hash = Argon2::default().hash_password(secret.as_bytes(), &salt)?;
        Ok(Self(hash.to_string()))
    }

    pub fn verify(&self, secret: &str) -> bool {
        password_hash::PasswordHash::new(&self.0)
            .and_then(|parsed| {
                Argon2::default().verify_password(secret.as_bytes(), &parsed)
            })
            .is_ok()
    }
}

impl FromSql<'_> for PasswordHash {
    accepts!(TEXT);

    fn from_sql(
        ty: &Type,
        raw: &[u8],
    ) -> Result<Self, Box<dyn StdError + Sync + Send>> {
        String::from_sql(ty, raw).map(Self)
    }
}

impl ToSql for PasswordHash {
    accepts!(TEXT);

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
pub trait UserRepo {
    /// Fails with [`Error::AlreadyExists`] when the username is taken.
    async fn create_user(&self, user: NewUser) -> Result<User, Error>;

    async fn get_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<User>, Error>;

    async fn get_user_by_id(&self, id: Id) -> Result<Option<User>, Error>;

    /// Ids without a matching user are left out of the map.
    async fn get_users_by_ids(
        &self,
        ids: &[Id],
    ) -> Result<HashMap<Id, User>, Error>;
}

fn from_row(row: &Row) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        password_hash: row.get("password_hash"),
        is_superuser: row.get("is_superuser"),
    }
}

#[async_trait]
impl UserRepo for Client {
    async fn create_user(&self, user: NewUser) -> Result<User, Error> {
        const SQL: &str = "\
            INSERT INTO users (username, email, first_name, last_name, \
                               password_hash, is_superuser) \
            VALUES ($1, $2, $3, $4, $5, $6) \
            RETURNING id";

        let row = self
            .0
            .query_one(
                SQL,
                &[
                    &user.username,
                    &user.email,
                    &user.first_name,
                    &user.last_name,
                    &user.password_hash,
                    &user.is_superuser,
                ],
            )
            .await
            .map_err(Error::from_write)?;
        Ok(user.with_id(row.get("id")))
    }

    async fn get_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<User>, Error> {
        const SQL: &str = "\
            SELECT id, username, email, first_name, last_name, \
                   password_hash, is_superuser \
            FROM users \
            WHERE username = $1 \
            LIMIT 1";
        Ok(self.0.query_opt(SQL, &[&username]).await?.as_ref().map(from_row))
    }

    async fn get_user_by_id(&self, id: Id) -> Result<Option<User>, Error> {
        const SQL: &str = "\
            SELECT id, username, email, first_name, last_name, \
                   password_hash, is_superuser \
            FROM users \
            WHERE id = $1 \
            LIMIT 1";
        Ok(self.0.query_opt(SQL, &[&id]).await?.as_ref().map(from_row))
    }

    async fn get_users_by_ids(
        &self,
        ids: &[Id],
    ) -> Result<HashMap<Id, User>, Error> {
        const SQL: &str = "\
            SELECT id, username, email, first_name, last_name, \
                   password_hash, is_superuser \
            FROM users \
            WHERE id = ANY($1)";

        Ok(self
            .0
            .query(SQL, &[&ids])
            .await?
            .iter()
            .map(|row| {
                let user = from_row(row);
                (user.id, user)
            })
            .collect())
    }
}
