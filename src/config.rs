use std::{net, path::PathBuf, time};

use serde::Deserialize;

#[derive(Deserialize)]
pub struct Config {
    pub db: Db,
    pub http: Http,
    pub jwt: Jwt,
    #[serde(default)]
    pub site: Site,
    pub admin: Option<Admin>,
}

#[derive(Deserialize)]
pub struct Db {
    pub url: String,
}

#[derive(Deserialize)]
pub struct Http {
    pub server: Server,
    pub cors: Cors,
}

#[derive(Deserialize)]
pub struct Server {
    pub addr: net::SocketAddr,
}

#[derive(Deserialize)]
pub struct Cors {
    pub allowed_origins: Vec<String>,
}

#[derive(Clone, Deserialize)]
pub struct Jwt {
    pub secret: String,
    #[serde(with = "humantime_serde")]
    pub expiration_time: time::Duration,
}

#[derive(Deserialize)]
pub struct Site {
    /// Markdown document served verbatim at `/readme`.
    #[serde(default = "Site::default_readme")]
    pub readme: PathBuf,
}

impl Site {
    fn default_readme() -> PathBuf {
        PathBuf::from("README.md")
    }
}

impl Default for Site {
    fn default() -> Self {
        Self {
            readme: Self::default_readme(),
        }
    }
}

/// Superuser created on start-up when no user with this name exists yet.
#[derive(Deserialize)]
pub struct Admin {
    pub username: String,
    #[serde(default)]
    pub email: String,
    pub password: String,
}
