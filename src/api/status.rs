use serde::{Deserialize, Serialize};

use crate::api;

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    pub name: String,
    pub description: Option<String>,
    pub reporter_id: api::user::Id,
    pub reporter: String,
    pub can_edit: bool,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct List {
    pub statuses: Vec<Status>,
}
