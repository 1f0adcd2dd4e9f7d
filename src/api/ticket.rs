use serde::{Deserialize, Serialize};
use time::Date;

use crate::api;

pub use crate::db::ticket::Id;

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: Id,
    pub title: String,
    pub info: Option<String>,
    pub assignee: Option<api::User>,
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub ticket_type: Option<String>,
    pub date_reported: Date,
    pub date_due: Option<Date>,
    pub reporter_id: api::user::Id,
    /// Reporter's username, or [`api::UNKNOWN_REPORTER`].
    pub reporter: String,
    pub can_edit: bool,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct List {
    pub tickets: Vec<Ticket>,
    pub total_count: usize,
}
