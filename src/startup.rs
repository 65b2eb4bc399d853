use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use anyhow::Context;
use sqlx::SqlitePool;
use std::net::TcpListener;
use tracing_actix_web::TracingLogger;

use crate::config::Settings;
use crate::contact_list::ContactListClient;
use crate::email_client::EmailClient;
use crate::routes::{
    handle_confirm_subscription, handle_create_subscription, handle_get_analytics,
    handle_get_preferences, handle_provider_webhook, handle_subscriber_count, handle_track_event,
    handle_update_preferences, health_check, json_error_handler,
};
use crate::store::{get_connection_db_pool, migrate};

/// Public URL links in outgoing emails are built from.
pub struct ApplicationBaseUrl(pub String);

/// Brand name used in outgoing emails.
pub struct SiteName(pub String);

pub struct Application {
    port: u16,
    server: Server,
    db_pool: SqlitePool,
}

impl Application {
    pub async fn build(config: Settings) -> Result<Self, anyhow::Error> {
        let db_pool = get_connection_db_pool(&config.database);
        migrate(&db_pool)
            .await
            .context("Failed to run database migrations.")?;

        let sender_email = config
            .email_client
            .get_sender_email()
            .map_err(anyhow::Error::msg)
            .context("Sender email is not valid.")?;
        let timeout = config.email_client.get_timeout();
        let email_client = EmailClient::new(
            config.email_client.get_base_url(),
            sender_email,
            config.email_client.sender_name.clone(),
            config.email_client.get_api_key(),
            Some(timeout),
        );
        // Both clients talk to the same provider account
        let contact_list = ContactListClient::new(
            config.email_client.get_base_url(),
            config.email_client.get_api_key(),
            Some(timeout),
        );

        let listener = TcpListener::bind(config.get_address())
            .with_context(|| format!("Failed to bind {}.", config.get_address()))?;
        let port = listener.local_addr()?.port();

        tracing::info!("Server listening on {}", config.get_address());

        let server = run(
            listener,
            db_pool.clone(),
            email_client,
            contact_list,
            config.get_app_base_url(),
            config.get_site_name(),
        )?;

        Ok(Self {
            port,
            server,
            db_pool,
        })
    }

    pub fn get_port(&self) -> u16 {
        self.port
    }

    /// Serves until the server stops, then releases the database pool.
    pub async fn run_until_stop(self) -> Result<(), std::io::Error> {
        let result = self.server.await;
        self.db_pool.close().await;
        tracing::info!("Database pool closed");

        result
    }
}

pub fn run(
    listener: TcpListener,
    db_pool: SqlitePool,
    email_client: EmailClient,
    contact_list: ContactListClient,
    base_url: String,
    site_name: String,
) -> Result<Server, std::io::Error> {
    let db_pool = web::Data::new(db_pool);
    let email_client = web::Data::new(email_client);
    let contact_list = web::Data::new(contact_list);
    let base_url = web::Data::new(ApplicationBaseUrl(base_url));
    let site_name = web::Data::new(SiteName(site_name));

    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))
            .route("/health_check", web::get().to(health_check))
            .route("/subscribe", web::post().to(handle_create_subscription))
            .route("/confirm", web::get().to(handle_confirm_subscription))
            .route("/preferences", web::get().to(handle_get_preferences))
            .route("/preferences", web::post().to(handle_update_preferences))
            .route("/subscriber-count", web::get().to(handle_subscriber_count))
            .route("/analytics", web::post().to(handle_track_event))
            .route("/analytics", web::get().to(handle_get_analytics))
            .route(
                "/webhooks/{provider}",
                web::post().to(handle_provider_webhook),
            )
            .app_data(db_pool.clone())
            .app_data(email_client.clone())
            .app_data(contact_list.clone())
            .app_data(base_url.clone())
            .app_data(site_name.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}
