use crate::auth::{CredentialVerifier, Role};
use crate::db::{create_user, replace_chores};
use crate::error::AppError;
use crate::init_rocket;
use crate::models::{Chore, RatingType};
use rocket::local::asynchronous::Client;
use sqlx::{Pool, Sqlite, sqlite::SqlitePoolOptions};
use std::sync::Once;

static INIT: Once = Once::new();
pub static STANDARD_PASSWORD: &str = "password123";

/// Test-only verifier: stores and compares passwords verbatim so fixtures
/// don't pay the bcrypt cost on every test.
pub struct PlainTextVerifier;

impl CredentialVerifier for PlainTextVerifier {
    fn hash(&self, password: &str) -> Result<String, AppError> {
        Ok(password.to_string())
    }

    fn verify(&self, password: &str, stored: &str) -> Result<bool, AppError> {
        Ok(password == stored)
    }
}

pub struct TestUser {
    pub username: String,
    pub role: Role,
    pub password: String,
}

#[derive(Default)]
pub struct TestDbBuilder {
    users: Vec<TestUser>,
    chore_lists: Vec<(String, Vec<Chore>)>,
}

impl TestDbBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kid(mut self, username: &str) -> Self {
        self.users.push(TestUser {
            username: username.to_string(),
            role: Role::Kid,
            password: STANDARD_PASSWORD.to_string(),
        });
        self
    }

    pub fn admin(mut self, username: &str) -> Self {
        self.users.push(TestUser {
            username: username.to_string(),
            role: Role::Admin,
            password: STANDARD_PASSWORD.to_string(),
        });
        self
    }

    pub fn chores(mut self, username: &str, chores: &[(i64, &str)]) -> Self {
        let list = chores
            .iter()
            .map(|(id, name)| Chore {
                id: *id,
                name: name.to_string(),
                rating_type: RatingType::Binary,
            })
            .collect();
        self.chore_lists.push((username.to_string(), list));
        self
    }

    pub fn chore_list(mut self, username: &str, chores: Vec<Chore>) -> Self {
        self.chore_lists.push((username.to_string(), chores));
        self
    }

    pub async fn build(self) -> Result<TestDb, AppError> {
        INIT.call_once(|| {
            let _ = env_logger::builder()
                .parse_filters("debug")
                .is_test(true)
                .try_init();
        });

        // A single connection keeps every query on the same in-memory db
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        for user in &self.users {
            create_user(
                &pool,
                &PlainTextVerifier,
                &user.username,
                &user.password,
                user.role.as_str(),
            )
            .await?;
        }

        for (username, chores) in &self.chore_lists {
            replace_chores(&pool, username, chores).await?;
        }

        Ok(TestDb { pool })
    }
}

pub struct TestDb {
    pub pool: Pool<Sqlite>,
}

/// Two kids and an admin, with a starter chore list for dkc.
pub async fn create_standard_test_db() -> TestDb {
    TestDbBuilder::new()
        .kid("dkc")
        .kid("skc")
        .admin("admin")
        .chores("dkc", &[(1, "Dishes"), (2, "Make bed")])
        .build()
        .await
        .expect("Failed to build test database")
}

pub async fn setup_test_client(test_db: TestDb) -> (Client, TestDb) {
    let client = Client::tracked(init_rocket(test_db.pool.clone(), Box::new(PlainTextVerifier)).await)
        .await
        .expect("Failed to build test client");

    (client, test_db)
}
