//! Field validation applied to submitted forms before anything is written.
//!
//! Cleaning runs in a fixed order per field: surrounding whitespace is
//! trimmed, required fields are checked for presence, then length limits,
//! and only a field that passed those is checked against the
//! capital-letter rule.

use std::{collections::BTreeMap, sync::LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use time::Date;

use crate::db::user;

pub const STATUS_NAME_MAX_LEN: usize = 20;
pub const TYPE_NAME_MAX_LEN: usize = 20;
pub const DESCRIPTION_MAX_LEN: usize = 100;
pub const TITLE_MAX_LEN: usize = 100;
pub const INFO_MAX_LEN: usize = 2000;
pub const USERNAME_MAX_LEN: usize = 150;
pub const PERSON_NAME_MAX_LEN: usize = 150;
pub const EMAIL_MAX_LEN: usize = 254;

pub const REQUIRED: &str = "This field is required.";
pub const INVALID_CHOICE: &str =
    "Select a valid choice. That choice is not one of the available choices.";

static CAPITALISED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Z][\w\s]*$").expect("capital letter pattern is valid")
});

static USERNAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\w.@+-]+$").expect("username pattern is valid")
});

/// Whether `text` opens with an uppercase ASCII letter followed only by word
/// characters or whitespace.
pub fn starts_with_capital(text: &str) -> bool {
    CAPITALISED.is_match(text)
}

/// Messages keyed by the offending field.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Errors(BTreeMap<String, Vec<String>>);

impl Errors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-message errors, for checks made outside of a cleaner.
    pub fn of(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_owned())
            .or_default()
            .push(message.into());
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

fn too_long(max: usize, len: usize) -> String {
    format!("Ensure this value has at most {max} characters (it has {len}).")
}

fn capital_required(label: &str) -> String {
    format!("Please enter the {label} with the first letter as a Capital")
}

/// Trims and length-checks a mandatory field. `None` once an error is
/// recorded.
fn required(
    errors: &mut Errors,
    field: &str,
    value: &str,
    max: usize,
) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        errors.add(field, REQUIRED);
        return None;
    }
    let len = value.chars().count();
    if len > max {
        errors.add(field, too_long(max, len));
        return None;
    }
    Some(value.to_owned())
}

/// Trims and length-checks an optional field, mapping blanks to `None`.
fn optional(
    errors: &mut Errors,
    field: &str,
    value: Option<&str>,
    max: usize,
) -> Option<String> {
    let value = value.map(str::trim).filter(|v| !v.is_empty())?;
    let len = value.chars().count();
    if len > max {
        errors.add(field, too_long(max, len));
        return None;
    }
    Some(value.to_owned())
}

/// Mandatory field that must also start with a capital letter.
fn capitalised(
    errors: &mut Errors,
    field: &str,
    label: &str,
    value: &str,
    max: usize,
) -> Option<String> {
    let value = required(errors, field, value, max)?;
    if !starts_with_capital(&value) {
        errors.add(field, capital_required(label));
        return None;
    }
    Some(value)
}

/// Submitted when creating a status.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct StatusForm {
    pub name: String,
    pub description: Option<String>,
}

/// Submitted when creating a ticket type.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct TicketTypeForm {
    pub name: String,
    pub description: Option<String>,
}

/// Submitted when updating a status or a ticket type. Names are immutable
/// after creation, so only the description is accepted.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct DescriptionForm {
    pub description: Option<String>,
}

/// Validated name and description of a status or ticket type.
#[derive(Clone, Debug, PartialEq)]
pub struct Named {
    pub name: String,
    pub description: Option<String>,
}

impl StatusForm {
    pub fn clean(&self) -> Result<Named, Errors> {
        let mut errors = Errors::new();
        let name = capitalised(
            &mut errors,
            "name",
            "status name",
            &self.name,
            STATUS_NAME_MAX_LEN,
        );
        let description = optional(
            &mut errors,
            "description",
            self.description.as_deref(),
            DESCRIPTION_MAX_LEN,
        );
        match name {
            Some(name) => errors.into_result(Named { name, description }),
            None => Err(errors),
        }
    }
}

impl TicketTypeForm {
    pub fn clean(&self) -> Result<Named, Errors> {
        let mut errors = Errors::new();
        let name = capitalised(
            &mut errors,
            "name",
            "type name",
            &self.name,
            TYPE_NAME_MAX_LEN,
        );
        let description = optional(
            &mut errors,
            "description",
            self.description.as_deref(),
            DESCRIPTION_MAX_LEN,
        );
        match name {
            Some(name) => errors.into_result(Named { name, description }),
            None => Err(errors),
        }
    }
}

impl DescriptionForm {
    pub fn clean(&self) -> Result<Option<String>, Errors> {
        let mut errors = Errors::new();
        let description = optional(
            &mut errors,
            "description",
            self.description.as_deref(),
            DESCRIPTION_MAX_LEN,
        );
        errors.into_result(description)
    }
}

/// Submitted when creating or updating a ticket. Any client-supplied
/// report date is ignored: it isn't part of the form.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TicketForm {
    pub title: String,
    pub info: Option<String>,
    pub assignee: Option<user::Id>,
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub ticket_type: Option<String>,
    pub date_due: Option<Date>,
}

/// Validated ticket fields. References are not yet checked against the
/// store.
#[derive(Clone, Debug, PartialEq)]
pub struct TicketFields {
    pub title: String,
    pub info: Option<String>,
    pub assignee: Option<user::Id>,
    pub status: Option<String>,
    pub ticket_type: Option<String>,
    pub date_due: Option<Date>,
}

impl TicketForm {
    pub fn clean(&self) -> Result<TicketFields, Errors> {
        let mut errors = Errors::new();
        let title = capitalised(
            &mut errors,
            "title",
            "ticket title",
            &self.title,
            TITLE_MAX_LEN,
        );
        let info =
            optional(&mut errors, "info", self.info.as_deref(), INFO_MAX_LEN);
        let status = self
            .status
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned);
        let ticket_type = self
            .ticket_type
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned);

        match title {
            Some(title) => errors.into_result(TicketFields {
                title,
                info,
                assignee: self.assignee,
                status,
                ticket_type,
                date_due: self.date_due,
            }),
            None => Err(errors),
        }
    }
}

/// Submitted when signing up.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password1: String,
    pub password2: String,
}

/// Validated sign-up data. The password is still in plain text.
#[derive(Clone, Debug, PartialEq)]
pub struct Account {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

impl Registration {
    pub fn clean(&self) -> Result<Account, Errors> {
        let mut errors = Errors::new();

        let username = required(
            &mut errors,
            "username",
            &self.username,
            USERNAME_MAX_LEN,
        )
        .filter(|name| {
            let valid = USERNAME.is_match(name);
            if !valid {
                errors.add(
                    "username",
                    "Enter a valid username. This value may contain only \
                     letters, numbers, and @/./+/-/_ characters.",
                );
            }
            valid
        });

        let email = required(&mut errors, "email", &self.email, EMAIL_MAX_LEN)
            .filter(|email| {
                let valid = email
                    .split_once('@')
                    .is_some_and(|(l, d)| !l.is_empty() && !d.is_empty());
                if !valid {
                    errors.add("email", "Enter a valid email address.");
                }
                valid
            });

        let first_name = optional(
            &mut errors,
            "firstName",
            Some(self.first_name.as_str()),
            PERSON_NAME_MAX_LEN,
        )
        .unwrap_or_default();
        let last_name = optional(
            &mut errors,
            "lastName",
            Some(self.last_name.as_str()),
            PERSON_NAME_MAX_LEN,
        )
        .unwrap_or_default();

        if self.password1.is_empty() {
            errors.add("password1", REQUIRED);
        }
        if self.password2.is_empty() {
            errors.add("password2", REQUIRED);
        } else if self.password1 != self.password2 {
            errors.add("password2", "The two password fields didn't match.");
        }

        match (username, email) {
            (Some(username), Some(email)) => errors.into_result(Account {
                username,
                email,
                first_name,
                last_name,
                password: self.password1.clone(),
            }),
            _ => Err(errors),
        }
    }
}
