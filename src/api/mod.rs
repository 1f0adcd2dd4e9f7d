pub mod status;
pub mod ticket;
pub mod ticket_type;
pub mod user;

use serde::{Deserialize, Serialize};

pub use self::{
    status::Status, ticket::Ticket, ticket_type::TicketType, user::User,
};
pub use crate::form::Errors as FormErrors;

/// Shown in place of a reporter whose account no longer exists.
pub const UNKNOWN_REPORTER: &str = "None";

/// User-facing message sent along with a redirect.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Notice {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// What is about to be removed, shown before a delete is confirmed.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteConfirmation {
    pub model_name: String,
    pub object_id: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Home {
    pub user: Option<User>,
    /// Tickets assigned to the signed-in user.
    pub tickets: Vec<Ticket>,
}
