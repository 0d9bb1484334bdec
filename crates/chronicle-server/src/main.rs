use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use chronicle_api::storage::UploadStore;
use chronicle_api::{AppStateInner, auth};
use chronicle_db::Database;
use chronicle_notify::{Mailer, SmtpConfig};
use chronicle_server::router;

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chronicle=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret = std::env::var("CHRONICLE_JWT_SECRET").unwrap_or_default();
    if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
        eprintln!("FATAL: CHRONICLE_JWT_SECRET is unset or still a placeholder.");
        eprintln!("       Set it in your .env file and restart.");
        std::process::exit(1);
    }

    let host = std::env::var("CHRONICLE_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("CHRONICLE_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;
    let db_path: PathBuf = std::env::var("CHRONICLE_DB_PATH")
        .unwrap_or_else(|_| "chronicle.db".into())
        .into();
    let upload_dir: PathBuf = std::env::var("CHRONICLE_UPLOAD_DIR")
        .unwrap_or_else(|_| "./uploads".into())
        .into();
    let public_dir: PathBuf = std::env::var("CHRONICLE_PUBLIC_DIR")
        .unwrap_or_else(|_| "./public".into())
        .into();

    // Init database and storage
    let db = Database::open(&db_path)?;
    let uploads = UploadStore::new(upload_dir).await?;

    ensure_admin(&db)?;
    let mailer = mailer_from_env()?;

    let state = Arc::new(AppStateInner {
        db,
        uploads,
        mailer,
        jwt_secret,
    });

    let app = router::app(state, &public_dir);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Chronicle server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// First-run provisioning of the reviewer account. There is deliberately no
/// baked-in default credential; an operator has to supply one.
fn ensure_admin(db: &Database) -> anyhow::Result<()> {
    if db.admin_count()? > 0 {
        return Ok(());
    }

    let password = std::env::var("CHRONICLE_ADMIN_PASSWORD").unwrap_or_default();
    if password.trim().is_empty() {
        eprintln!("FATAL: no reviewer account exists and CHRONICLE_ADMIN_PASSWORD is unset.");
        eprintln!("       Set CHRONICLE_ADMIN_PASSWORD (and optionally CHRONICLE_ADMIN_USERNAME,");
        eprintln!("       CHRONICLE_ADMIN_EMAIL) for first-run provisioning and restart.");
        std::process::exit(1);
    }

    let username =
        std::env::var("CHRONICLE_ADMIN_USERNAME").unwrap_or_else(|_| "admin".into());
    let email = std::env::var("CHRONICLE_ADMIN_EMAIL").unwrap_or_default();

    let id = auth::provision_admin(db, &username, &password, &email)?;
    info!("Provisioned reviewer account '{}' ({})", username, id);
    Ok(())
}

fn mailer_from_env() -> anyhow::Result<Option<Mailer>> {
    let Ok(smtp_host) = std::env::var("CHRONICLE_SMTP_HOST") else {
        info!("SMTP not configured; email notifications are disabled");
        return Ok(None);
    };

    let config = SmtpConfig {
        host: smtp_host,
        port: std::env::var("CHRONICLE_SMTP_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(587),
        username: std::env::var("CHRONICLE_SMTP_USERNAME").unwrap_or_default(),
        password: std::env::var("CHRONICLE_SMTP_PASSWORD").unwrap_or_default(),
        from_name: std::env::var("CHRONICLE_SMTP_FROM_NAME")
            .unwrap_or_else(|_| "Chronicle".into()),
        from_address: std::env::var("CHRONICLE_SMTP_FROM").unwrap_or_default(),
    };

    Ok(Some(Mailer::new(&config)?))
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
