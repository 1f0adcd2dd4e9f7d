use std::{error::Error, sync::Arc};

use axum::http::{
    header::{AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use tokio::{fs, net, task};
use tower_http::cors::CorsLayer;
use tracing_subscriber::{
    layer::SubscriberExt as _, util::SubscriberInitExt as _, EnvFilter,
};

use ticket_desk::{
    config,
    db::{self, UserRepo as _},
    handler, Config,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ticket_desk=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = fs::read_to_string("config.toml").await?;
    let config = toml::from_str::<Config>(&config)?;

    let (db_client, db_connection) = db::connect(config.db).await?;

    task::spawn(async move {
        if let Err(e) = db_connection.await {
            panic!("database connection failed: {e}");
        }
    });

    db_client.migrate().await?;
    if let Some(admin) = &config.admin {
        ensure_superuser(&db_client, admin).await?;
    }

    let readme = match fs::read_to_string(&config.site.readme).await {
        Ok(readme) => readme,
        Err(e) => {
            tracing::warn!(
                path = %config.site.readme.display(),
                error = %e,
                "readme not found, serving an empty page",
            );
            String::new()
        }
    };

    let mut cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]);
    for origin in &config.http.cors.allowed_origins {
        cors = cors.allow_origin(origin.parse::<HeaderValue>()?);
    }

    let state =
        handler::AppState::new(Arc::new(db_client), &config.jwt, readme);
    let app = handler::router(state).layer(cors);

    let listener = net::TcpListener::bind(config.http.server.addr).await?;
    tracing::info!(addr = %config.http.server.addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}

async fn ensure_superuser(
    store: &db::Client,
    admin: &config::Admin,
) -> Result<(), Box<dyn Error>> {
    if store.get_user_by_username(&admin.username).await?.is_some() {
        return Ok(());
    }

    let password = admin.password.clone();
    let password_hash = task::spawn_blocking(move || {
        db::user::PasswordHash::new(&password)
    })
    .await?
    .map_err(|e| e.to_string())?;

    store
        .create_user(db::user::NewUser {
            username: admin.username.clone(),
            email: admin.email.clone(),
            first_name: String::new(),
            last_name: String::new(),
            password_hash,
            is_superuser: true,
        })
        .await?;
    tracing::info!(user = %admin.username, "superuser created");

    Ok(())
}
