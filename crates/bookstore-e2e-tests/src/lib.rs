use std::{fmt::Display, path::Path, time::Duration};

use anyhow::{Result, anyhow, bail};
use bookstore_dal::user::{CreateUser, UserRepository};
use bookstore_server::config::{Parser, ServerConfig};
use rand::Rng as _;
use reqwest::{
    Url,
    header::{AUTHORIZATION, HeaderMap, HeaderValue},
};
use serde_json::json;
use tempfile::TempDir;
use tracing::{debug, info};

pub mod rest;

fn random_port() -> Result<u16> {
    let mut rng = rand::rng();

    let mut retries = 3;
    while retries > 0 {
        let port: u16 = rng.random_range(3030..4030);
        let addr: std::net::SocketAddr = format!("127.0.0.1:{}", port).parse()?;
        match std::net::TcpStream::connect_timeout(&addr, std::time::Duration::from_millis(100)) {
            Err(e) if e.kind() == std::io::ErrorKind::ConnectionRefused => return Ok(port),
            Err(_) => retries -= 1,
            Ok(_) => retries -= 1,
        }
    }

    Err(anyhow!("Could not find a free port"))
}

pub struct ConfigGuard {
    #[allow(dead_code)]
    data_dir: TempDir,
}

pub fn test_config(test_name: &str, base_dir: &Path) -> Result<(ServerConfig, ConfigGuard)> {
    let tmp_data_dir = TempDir::with_prefix_in(format!("{}_", test_name), base_dir)?;
    let data_dir = tmp_data_dir.path().to_string_lossy().to_string();
    let port = random_port()?;
    let port = port.to_string();
    let args = &[
        "bookstore-e2e-tests",
        "--data-dir",
        &data_dir,
        "--port",
        &port,
        "--listen-address",
        "127.0.0.1",
    ];
    let config = ServerConfig::try_parse_from(args)?;
    Ok((
        config,
        ConfigGuard {
            data_dir: tmp_data_dir,
        },
    ))
}

pub fn base_url(config: &ServerConfig) -> Result<Url> {
    let url = Url::parse(&format!(
        "http://{}:{}/",
        config.listen_address, config.port
    ))?;
    Ok(url)
}

pub fn extend_url(url: &Url, segment: impl Display) -> Url {
    let mut url = url.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().push(&segment.to_string());
    }
    url
}

/// Users present in every prepared test database
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestUser {
    /// id 1
    Owner,
    /// id 2
    Other,
    /// id 3, has staff role
    Staff,
    Anonymous,
}

impl TestUser {
    pub const ALL: [TestUser; 3] = [TestUser::Owner, TestUser::Other, TestUser::Staff];

    pub fn username(&self) -> Option<&'static str> {
        match self {
            TestUser::Owner => Some("owner"),
            TestUser::Other => Some("other"),
            TestUser::Staff => Some("staff"),
            TestUser::Anonymous => None,
        }
    }

    pub fn password(&self) -> Option<String> {
        self.username().map(|name| format!("{name}-password"))
    }

    pub fn id(&self) -> Option<i64> {
        match self {
            TestUser::Owner => Some(1),
            TestUser::Other => Some(2),
            TestUser::Staff => Some(3),
            TestUser::Anonymous => None,
        }
    }
}

/// Creates test config with fresh database containing test users
pub async fn prepare_env(test_name: &str) -> Result<(ServerConfig, ConfigGuard)> {
    let base_dir = std::env::temp_dir();
    let (config, guard) = test_config(test_name, &base_dir)?;
    let pool = bookstore_dal::new_pool(&config.database_url()).await?;
    bookstore_dal::migrate(&pool).await?;
    let users = UserRepository::new(pool.clone());
    for user in TestUser::ALL {
        let created = users
            .create(CreateUser {
                username: user.username().unwrap_or_default().to_string(),
                password: user.password(),
                is_staff: user == TestUser::Staff,
            })
            .await?;
        if Some(created.id) != user.id() {
            bail!("Unexpected id {} of test user {user:?}", created.id);
        }
    }
    pool.close().await;
    Ok((config, guard))
}

/// Starts server in background task and waits until it responds
pub async fn spawn_server(args: ServerConfig) -> Result<Url> {
    let base_url = base_url(&args)?;
    let state = bookstore_server::build_state(&args).await?;
    tokio::spawn(async move {
        let res =
            bookstore_server::run_graceful_with_state(args, state, futures::future::pending())
                .await;
        if let Err(e) = res {
            tracing::error!("Server error: {e}");
        }
    });

    let health_url = base_url.join("health")?;
    let client = reqwest::Client::new();
    for _ in 0..50 {
        match client.get(health_url.clone()).send().await {
            Ok(response) if response.status().is_success() => {
                debug!("Server is ready at {base_url}");
                return Ok(base_url);
            }
            _ => tokio::time::sleep(Duration::from_millis(20)).await,
        }
    }
    Err(anyhow!("Server did not start at {base_url}"))
}

pub async fn login(base_url: &Url, user: TestUser) -> Result<String> {
    let (Some(username), Some(password)) = (user.username(), user.password()) else {
        bail!("Anonymous user cannot log in");
    };
    let response = reqwest::Client::new()
        .post(base_url.join("auth/login")?)
        .json(&json!({"username": username, "password": password}))
        .send()
        .await?;
    info!("Login response: {:#?}", response);
    if !response.status().is_success() {
        bail!("Login failed with status {}", response.status());
    }
    Ok(response.text().await?)
}

/// Client sending bearer token of given user
pub async fn client_for(base_url: &Url, user: TestUser) -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    if user != TestUser::Anonymous {
        let token = login(base_url, user).await?;
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}"))?,
        );
    }
    Ok(reqwest::Client::builder()
        .default_headers(headers)
        .build()?)
}

/// Spawns server and returns client logged in as given user
pub async fn launch_env(args: ServerConfig, user: TestUser) -> Result<(reqwest::Client, Url)> {
    let base_url = spawn_server(args).await?;
    let client = client_for(&base_url, user).await?;
    Ok((client, base_url))
}
