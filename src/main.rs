#[macro_use]
extern crate rocket;

mod api;
mod auth;
mod db;
mod env;
mod error;
mod models;
mod telemetry;
#[cfg(test)]
mod test;
mod validation;

use api::{
    api_check_chore, api_create_week, api_freeze_week, api_get_users, api_get_week_view,
    api_list_weeks, api_login, api_reset, api_save_chore_list, api_save_note, forbidden_api,
    health, unauthorized_api,
};
use auth::{BcryptVerifier, CredentialVerifier};
use rocket::{Build, Rocket};
use telemetry::TelemetryFairing;

use sqlx::SqlitePool;
use tracing::{error, info};

#[launch]
async fn rocket() -> _ {
    if let Err(e) = env::load_environment() {
        eprintln!("Failed to load environment files: {}", e);
    }

    telemetry::init_tracing();

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:chores.db?mode=rwc".to_string());

    let pool = SqlitePool::connect(&database_url)
        .await
        .expect("Failed to connect to SQLite database");

    info!("Running database migrations...");
    match sqlx::migrate!("./migrations").run(&pool).await {
        Ok(_) => info!("Migrations completed successfully"),
        Err(e) => {
            error!("Failed to run migrations: {}", e);
            panic!("Database migration failed: {}", e);
        }
    }

    if let Err(e) = db::seed_users(&pool, &BcryptVerifier).await {
        error!("Failed to seed users: {}", e);
        panic!("User seeding failed: {}", e);
    }

    init_rocket(pool, Box::new(BcryptVerifier)).await
}

pub async fn init_rocket(pool: SqlitePool, verifier: Box<dyn CredentialVerifier>) -> Rocket<Build> {
    info!("Starting chore chart");

    rocket::build()
        .manage(pool)
        .manage(verifier)
        .mount(
            "/api",
            routes![
                api_login,
                api_get_users,
                api_get_week_view,
                api_check_chore,
                api_save_chore_list,
                api_save_note,
                api_list_weeks,
                api_create_week,
                api_freeze_week,
                api_reset,
                health,
            ],
        )
        .register("/api", catchers![unauthorized_api, forbidden_api])
        .attach(TelemetryFairing)
}
