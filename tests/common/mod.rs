#![allow(dead_code)]

use std::{
    sync::{Arc, LazyLock},
    time::Duration,
};

use reqwest::{
    header::{CONTENT_TYPE, LOCATION},
    redirect, RequestBuilder, StatusCode,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use time::OffsetDateTime;
use ticket_desk::{
    api, config,
    db::{self, UserRepo as _},
    handler,
};

pub const README: &str = "# Ticket Desk\n\nServed from memory.\n";

/// Hashing is slow, so every seeded account shares one hash of `password`.
static PASSWORD_HASH: LazyLock<db::user::PasswordHash> = LazyLock::new(|| {
    db::user::PasswordHash::new("password").expect("failed to hash password")
});

/// Router served on an ephemeral port over an in-process store seeded with
/// `alice` (id 1), `bob` (id 2) and the superuser `root` (id 3).
pub struct Server {
    base_url: String,
    pub store: Arc<db::Memory>,
}

impl Server {
    pub async fn spawn() -> Self {
        let store = Arc::new(db::Memory::new());
        for (username, is_superuser) in
            [("alice", false), ("bob", false), ("root", true)]
        {
            store
                .create_user(db::user::NewUser {
                    username: username.into(),
                    email: format!("{username}@example.com"),
                    first_name: String::new(),
                    last_name: String::new(),
                    password_hash: PASSWORD_HASH.clone(),
                    is_superuser,
                })
                .await
                .expect("failed to seed a user");
        }

        Self {
            base_url: serve(store.clone()).await,
            store,
        }
    }

    pub fn client(&self) -> Client {
        Client::new(self.base_url.clone())
    }

    pub async fn login(&self, login: &str) -> Client {
        self.client().auth(login, "password").await
    }
}

fn jwt() -> config::Jwt {
    config::Jwt {
        secret: "test-secret".into(),
        expiration_time: Duration::from_secs(3600),
    }
}

/// Serves the router over `store` on an ephemeral port, returning its base
/// URL.
pub async fn serve(store: Arc<dyn db::Store>) -> String {
    let state = handler::AppState::new(store, &jwt(), README.into());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind a listener");
    let addr = listener.local_addr().expect("failed to get an address");
    tokio::spawn(async move {
        axum::serve(listener, handler::router(state))
            .await
            .expect("server failed");
    });

    format!("http://{addr}")
}

/// Access token for `user_id`, signed the way `/auth` signs it.
pub fn token_for(user_id: db::user::Id) -> String {
    let jwt = jwt();
    let expires_at = OffsetDateTime::now_utc() + jwt.expiration_time;
    let claims = handler::AuthClaims {
        user_id,
        exp: expires_at.unix_timestamp(),
    };
    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(jwt.secret.as_bytes()),
    )
    .expect("failed to sign a token")
}

/// A `303 See Other` answer.
#[derive(Debug)]
pub struct Redirect {
    pub location: String,
    pub notice: api::Notice,
}

#[derive(Debug)]
pub enum Rejected {
    Invalid(api::FormErrors),
    Redirected(Redirect),
    Status(StatusCode),
}

impl Rejected {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Redirected(_) => StatusCode::SEE_OTHER,
            Self::Status(status) => *status,
        }
    }

    pub fn into_errors(self) -> api::FormErrors {
        match self {
            Self::Invalid(errors) => errors,
            other => panic!("expected form errors, found {other:?}"),
        }
    }

    pub fn into_redirect(self) -> Redirect {
        match self {
            Self::Redirected(redirect) => redirect,
            other => panic!("expected a redirect, found {other:?}"),
        }
    }
}

pub struct Client {
    inner: reqwest::Client,
    base_url: String,
    pub auth_token: Option<String>,
}

impl Client {
    pub fn new(base_url: String) -> Self {
        Self {
            inner: reqwest::Client::builder()
                .redirect(redirect::Policy::none())
                .build()
                .expect("failed to build a client"),
            base_url,
            auth_token: None,
        }
    }

    pub async fn auth(mut self, login: &str, password: &str) -> Self {
        self.auth_token = Some(
            self.try_auth(login, password)
                .await
                .expect("wrong status code"),
        );
        self
    }

    pub async fn try_auth(
        &self,
        login: &str,
        password: &str,
    ) -> Result<String, Rejected> {
        let req = self.inner.post(self.url("/auth")).json(&json!({
            "login": login,
            "password": password,
        }));
        self.text(req).await
    }

    pub async fn register(&self, form: Value) -> Result<String, Rejected> {
        let req = self.inner.post(self.url("/register")).json(&form);
        self.text(req).await
    }

    pub async fn user(&self) -> Result<api::User, Rejected> {
        self.send(self.inner.get(self.url("/user"))).await
    }

    pub async fn home(&self) -> Result<api::Home, Rejected> {
        self.send(self.inner.get(self.url("/"))).await
    }

    pub async fn readme(&self) -> Result<String, Rejected> {
        self.text(self.inner.get(self.url("/readme"))).await
    }

    pub async fn get_tickets(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<api::ticket::List, Rejected> {
        let url = self.url(&format!("/ticket?offset={offset}&limit={limit}"));
        self.send(self.inner.get(url)).await
    }

    pub async fn get_all_tickets(&self) -> Result<api::ticket::List, Rejected> {
        self.send(self.inner.get(self.url("/ticket"))).await
    }

    pub async fn add_ticket(
        &self,
        form: Value,
    ) -> Result<api::Ticket, Rejected> {
        self.send(self.inner.post(self.url("/ticket")).json(&form))
            .await
    }

    pub async fn get_ticket(
        &self,
        id: api::ticket::Id,
    ) -> Result<api::Ticket, Rejected> {
        self.send(self.inner.get(self.url(&format!("/ticket/{id}"))))
            .await
    }

    pub async fn edit_ticket(
        &self,
        id: api::ticket::Id,
        form: Value,
    ) -> Result<api::Ticket, Rejected> {
        let url = self.url(&format!("/ticket/{id}"));
        self.send(self.inner.patch(url).json(&form)).await
    }

    pub async fn confirm_ticket_delete(
        &self,
        id: api::ticket::Id,
    ) -> Result<api::DeleteConfirmation, Rejected> {
        let url = self.url(&format!("/ticket/{id}/delete"));
        self.send(self.inner.get(url)).await
    }

    pub async fn delete_ticket(
        &self,
        id: api::ticket::Id,
        confirm: bool,
    ) -> Result<Redirect, Rejected> {
        let url = self.url(&format!("/ticket/{id}/delete"));
        self.redirect(self.inner.post(url).json(&json!({ "delete": confirm })))
            .await
    }

    pub async fn get_statuses(&self) -> Result<api::status::List, Rejected> {
        self.send(self.inner.get(self.url("/status"))).await
    }

    pub async fn add_status(
        &self,
        name: &str,
        description: &str,
    ) -> Result<api::Status, Rejected> {
        let req = self.inner.post(self.url("/status")).json(&json!({
            "name": name,
            "description": description,
        }));
        self.send(req).await
    }

    /// `path_name` goes into the URL as is, so it may be percent-encoded.
    pub async fn get_status(
        &self,
        path_name: &str,
    ) -> Result<api::Status, Rejected> {
        let url = self.url(&format!("/status/{path_name}"));
        self.send(self.inner.get(url)).await
    }

    pub async fn edit_status(
        &self,
        path_name: &str,
        form: Value,
    ) -> Result<api::Status, Rejected> {
        let url = self.url(&format!("/status/{path_name}"));
        self.send(self.inner.patch(url).json(&form)).await
    }

    pub async fn confirm_status_delete(
        &self,
        path_name: &str,
    ) -> Result<api::DeleteConfirmation, Rejected> {
        let url = self.url(&format!("/status/{path_name}/delete"));
        self.send(self.inner.get(url)).await
    }

    pub async fn delete_status(
        &self,
        path_name: &str,
        confirm: bool,
    ) -> Result<Redirect, Rejected> {
        let url = self.url(&format!("/status/{path_name}/delete"));
        self.redirect(self.inner.post(url).json(&json!({ "delete": confirm })))
            .await
    }

    pub async fn get_ticket_types(
        &self,
    ) -> Result<api::ticket_type::List, Rejected> {
        self.send(self.inner.get(self.url("/type"))).await
    }

    pub async fn add_ticket_type(
        &self,
        name: &str,
        description: &str,
    ) -> Result<api::TicketType, Rejected> {
        let req = self.inner.post(self.url("/type")).json(&json!({
            "name": name,
            "description": description,
        }));
        self.send(req).await
    }

    pub async fn get_ticket_type(
        &self,
        path_name: &str,
    ) -> Result<api::TicketType, Rejected> {
        let url = self.url(&format!("/type/{path_name}"));
        self.send(self.inner.get(url)).await
    }

    pub async fn edit_ticket_type(
        &self,
        path_name: &str,
        form: Value,
    ) -> Result<api::TicketType, Rejected> {
        let url = self.url(&format!("/type/{path_name}"));
        self.send(self.inner.patch(url).json(&form)).await
    }

    pub async fn confirm_ticket_type_delete(
        &self,
        path_name: &str,
    ) -> Result<api::DeleteConfirmation, Rejected> {
        let url = self.url(&format!("/type/{path_name}/delete"));
        self.send(self.inner.get(url)).await
    }

    pub async fn delete_ticket_type(
        &self,
        path_name: &str,
        confirm: bool,
    ) -> Result<Redirect, Rejected> {
        let url = self.url(&format!("/type/{path_name}/delete"));
        self.redirect(self.inner.post(url).json(&json!({ "delete": confirm })))
            .await
    }

    /// Posts to a delete route without JSON. `form` is sent as an
    /// url-encoded body, and `None` sends no body at all.
    pub async fn post_delete(
        &self,
        path: &str,
        form: Option<&'static str>,
    ) -> Result<Redirect, Rejected> {
        let mut req = self.inner.post(self.url(path));
        if let Some(form) = form {
            req = req
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(form);
        }
        self.redirect(req).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn execute(&self, mut req: RequestBuilder) -> reqwest::Response {
        if let Some(token) = &self.auth_token {
            req = req.header("Authorization", format!("Bearer {token}"));
        }
        req.send().await.expect("failed to send a request")
    }

    async fn reject(res: reqwest::Response) -> Rejected {
        let status = res.status();
        match status {
            StatusCode::UNPROCESSABLE_ENTITY => {
                match res.json::<api::FormErrors>().await {
                    Ok(errors) => Rejected::Invalid(errors),
                    Err(_) => Rejected::Status(status),
                }
            }
            StatusCode::SEE_OTHER => {
                let location = res
                    .headers()
                    .get(LOCATION)
                    .and_then(|l| l.to_str().ok())
                    .expect("redirect without location")
                    .to_owned();
                let notice = res
                    .json::<api::Notice>()
                    .await
                    .expect("failed to get a notice");
                Rejected::Redirected(Redirect { location, notice })
            }
            _ => Rejected::Status(status),
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
    ) -> Result<T, Rejected> {
        let res = self.execute(req).await;
        if !res.status().is_success() {
            return Err(Self::reject(res).await);
        }
        Ok(res.json::<T>().await.expect("failed to get a response"))
    }

    async fn text(&self, req: RequestBuilder) -> Result<String, Rejected> {
        let res = self.execute(req).await;
        if !res.status().is_success() {
            return Err(Self::reject(res).await);
        }
        Ok(res.text().await.expect("failed to get a response"))
    }

    /// Delete requests answer with a redirect on success.
    async fn redirect(
        &self,
        req: RequestBuilder,
    ) -> Result<Redirect, Rejected> {
        match Self::reject(self.execute(req).await).await {
            Rejected::Redirected(redirect) => Ok(redirect),
            rejected => Err(rejected),
        }
    }
}
