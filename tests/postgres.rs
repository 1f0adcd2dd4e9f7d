//! Store checks against a live PostgreSQL. Run with
//! `DATABASE_URL=postgres://... cargo test -- --ignored`; each test migrates
//! into a schema of its own and drops it when it passes.

use std::env;

use time::macros::date;
use ticket_desk::{
    config,
    db::{
        self,
        ticket::{self, NewTicket},
        user::{self, NewUser, PasswordHash},
        Status, StatusRepo as _, TicketRepo as _, TicketType,
        TicketTypeRepo as _, UserRepo as _,
    },
};
use tokio_postgres::NoTls;
use uuid::Uuid;

struct Scratch {
    store: db::Client,
    admin: tokio_postgres::Client,
    schema: String,
}

impl Scratch {
    async fn new() -> Self {
        let url = env::var("DATABASE_URL").expect("DATABASE_URL is not set");
        let schema = format!("scratch_{}", Uuid::new_v4().simple());

        let (admin, connection) = tokio_postgres::connect(&url, NoTls)
            .await
            .expect("failed to connect");
        tokio::spawn(connection);
        admin
            .batch_execute(&format!("CREATE SCHEMA {schema}"))
            .await
            .expect("failed to create a schema");

        let url = with_search_path(&url, &schema);
        let (store, connection) = db::connect(config::Db { url })
            .await
            .expect("failed to connect");
        tokio::spawn(connection);
        store.migrate().await.expect("failed to migrate");

        Self {
            store,
            admin,
            schema,
        }
    }

    async fn cleanup(self) {
        self.admin
            .batch_execute(&format!("DROP SCHEMA {} CASCADE", self.schema))
            .await
            .expect("failed to drop a schema");
    }
}

/// Points every session of `url` at `schema`.
fn with_search_path(url: &str, schema: &str) -> String {
    if url.starts_with("postgres://") || url.starts_with("postgresql://") {
        let sep = if url.contains('?') { '&' } else { '?' };
        format!("{url}{sep}options=-csearch_path%3D{schema}")
    } else {
        format!("{url} options=-csearch_path={schema}")
    }
}

fn new_ticket(
    title: &str,
    status: Option<&str>,
    ticket_type: Option<&str>,
) -> NewTicket {
    NewTicket {
        title: title.into(),
        info: None,
        assignee: None,
        status: status.map(Into::into),
        ticket_type: ticket_type.map(Into::into),
        date_reported: date!(2024 - 01 - 01),
        date_due: None,
        reporter_id: user::Id::UNKNOWN,
    }
}

fn status(name: &str) -> Status {
    Status {
        name: name.into(),
        description: None,
        reporter_id: user::Id::UNKNOWN,
    }
}

fn ticket_type(name: &str) -> TicketType {
    TicketType {
        name: name.into(),
        description: None,
        reporter_id: user::Id::UNKNOWN,
    }
}

async fn ticket_ids(store: &db::Client) -> Vec<ticket::Id> {
    store
        .get_tickets_page(0, None)
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.id)
        .collect()
}

#[tokio::test]
#[ignore = "needs PostgreSQL at DATABASE_URL"]
async fn cascades_status_delete_to_tickets() {
    let scratch = Scratch::new().await;
    let store = &scratch.store;
    store.create_status(&status("Open")).await.unwrap();
    store.create_status(&status("Closed")).await.unwrap();

    store
        .create_ticket(new_ticket("Pending", Some("Open"), None))
        .await
        .unwrap();
    let closed = store
        .create_ticket(new_ticket("Done", Some("Closed"), None))
        .await
        .unwrap();
    let loose = store
        .create_ticket(new_ticket("Loose", None, None))
        .await
        .unwrap();

    assert!(store.delete_status("Open").await.unwrap());
    assert_eq!(store.get_status("Open").await.unwrap(), None);
    assert_eq!(ticket_ids(store).await, [loose.id, closed.id]);
    assert!(!store.delete_status("Open").await.unwrap());

    scratch.cleanup().await;
}

#[tokio::test]
#[ignore = "needs PostgreSQL at DATABASE_URL"]
async fn cascades_ticket_type_delete_to_tickets() {
    let scratch = Scratch::new().await;
    let store = &scratch.store;
    store.create_ticket_type(&ticket_type("Bug")).await.unwrap();

    let bug = store
        .create_ticket(new_ticket("Crash", None, Some("Bug")))
        .await
        .unwrap();
    let loose = store
        .create_ticket(new_ticket("Loose", None, None))
        .await
        .unwrap();

    assert!(store.delete_ticket_type("Bug").await.unwrap());
    assert_eq!(store.get_ticket_by_id(bug.id).await.unwrap(), None);
    assert_eq!(ticket_ids(store).await, [loose.id]);

    scratch.cleanup().await;
}

#[tokio::test]
#[ignore = "needs PostgreSQL at DATABASE_URL"]
async fn reports_taken_keys() {
    let scratch = Scratch::new().await;
    let store = &scratch.store;

    store.create_status(&status("Open")).await.unwrap();
    let taken = store.create_status(&status("Open")).await;
    assert!(matches!(taken, Err(db::Error::AlreadyExists)), "{taken:?}");

    store.create_ticket_type(&ticket_type("Bug")).await.unwrap();
    let taken = store.create_ticket_type(&ticket_type("Bug")).await;
    assert!(matches!(taken, Err(db::Error::AlreadyExists)), "{taken:?}");

    let password_hash = PasswordHash::new("password").unwrap();
    let new_user = || NewUser {
        username: "alice".into(),
        email: "alice@example.com".into(),
        first_name: String::new(),
        last_name: String::new(),
        password_hash: password_hash.clone(),
        is_superuser: false,
    };
    let alice = store.create_user(new_user()).await.unwrap();
    let taken = store.create_user(new_user()).await;
    assert!(matches!(taken, Err(db::Error::AlreadyExists)), "{taken:?}");

    let users = store
        .get_users_by_ids(&[alice.id, user::Id::from(999)])
        .await
        .unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[&alice.id].username, "alice");

    scratch.cleanup().await;
}

#[tokio::test]
#[ignore = "needs PostgreSQL at DATABASE_URL"]
async fn pages_tickets_newest_first() {
    let scratch = Scratch::new().await;
    let store = &scratch.store;

    let mut ids = Vec::new();
    for n in 1..=4 {
        let ticket = store
            .create_ticket(new_ticket(&format!("Ticket {n}"), None, None))
            .await
            .unwrap();
        ids.push(ticket.id);
    }
    ids.reverse();

    assert_eq!(store.get_tickets_count().await.unwrap(), 4);
    assert_eq!(ticket_ids(store).await, ids);

    let page = store
        .get_tickets_page(1, Some(2))
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.id)
        .collect::<Vec<_>>();
    assert_eq!(page, ids[1..3]);

    scratch.cleanup().await;
}

#[tokio::test]
#[ignore = "needs PostgreSQL at DATABASE_URL"]
async fn keeps_report_stamp_on_update() {
    let scratch = Scratch::new().await;
    let store = &scratch.store;

    let mut ticket = store
        .create_ticket(new_ticket("Crash", None, None))
        .await
        .unwrap();
    ticket.title = "Crash on start".into();
    ticket.date_reported = date!(2030 - 12 - 31);
    ticket.reporter_id = user::Id::from(42);
    store.update_ticket(&ticket).await.unwrap();

    let stored = store.get_ticket_by_id(ticket.id).await.unwrap().unwrap();
    assert_eq!(stored.title, "Crash on start");
    assert_eq!(stored.date_reported, date!(2024 - 01 - 01));
    assert_eq!(stored.reporter_id, user::Id::UNKNOWN);

    scratch.cleanup().await;
}

#[tokio::test]
#[ignore = "needs PostgreSQL at DATABASE_URL"]
async fn updates_status_description_only() {
    let scratch = Scratch::new().await;
    let store = &scratch.store;
    store.create_status(&status("Open")).await.unwrap();

    store
        .update_status(&Status {
            name: "Open".into(),
            description: Some("Waiting for triage".into()),
            reporter_id: user::Id::from(42),
        })
        .await
        .unwrap();

    let stored = store.get_status("Open").await.unwrap().unwrap();
    assert_eq!(stored.description.as_deref(), Some("Waiting for triage"));
    assert_eq!(stored.reporter_id, user::Id::UNKNOWN);

    scratch.cleanup().await;
}
