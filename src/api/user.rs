use serde::{Deserialize, Serialize};

pub use crate::db::user::Id;

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Id,
    pub username: String,
    pub is_superuser: bool,
}

impl From<&crate::db::User> for User {
    fn from(user: &crate::db::User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            is_superuser: user.is_superuser,
        }
    }
}
