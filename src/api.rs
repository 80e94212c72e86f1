use rocket::State;
use rocket::response::status::Custom;
use rocket::serde::{Deserialize, Serialize, json::Json};
use sqlx::{Pool, Sqlite};
use validator::Validate;

use crate::auth::{CredentialVerifier, Permission, User};
use crate::db::{
    authenticate_user, create_week, freeze_week, get_all_users, get_week_view, list_weeks,
    replace_chores, require_admin, reset_all, set_completion, set_note,
};
use crate::error::AppError;
use crate::models::{Chore, Week, WeekView};
use crate::validation::{AppErrorExt, JsonValidateExt, ValidationResponse};

#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    username: String,
    #[validate(length(min = 1, message = "Password is required"))]
    password: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct UserData {
    pub username: String,
    pub role: String,
}

impl From<User> for UserData {
    fn from(user: User) -> Self {
        Self {
            username: user.username.clone(),
            role: user.role.to_string(),
        }
    }
}

#[derive(Serialize, Deserialize)]
pub struct OkResponse {
    pub ok: bool,
}

impl OkResponse {
    fn ok() -> Json<Self> {
        Json(Self { ok: true })
    }
}

#[post("/login", data = "<login>")]
pub async fn api_login(
    login: Json<LoginRequest>,
    verifier: &State<Box<dyn CredentialVerifier>>,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<UserData>, Custom<Json<ValidationResponse>>> {
    let validated = login.validate_custom()?;

    let user = authenticate_user(db, verifier.as_ref(), &validated.username, &validated.password)
        .await
        .validate_custom()?;

    Ok(Json(UserData::from(user)))
}

#[get("/users")]
pub async fn api_get_users(db: &State<Pool<Sqlite>>) -> Result<Json<Vec<UserData>>, AppError> {
    let users = get_all_users(db).await?;

    Ok(Json(users.into_iter().map(UserData::from).collect()))
}

#[get("/chores/<username>?<week>")]
pub async fn api_get_week_view(
    username: &str,
    week: Option<&str>,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<WeekView>, AppError> {
    let view = get_week_view(db, username, week).await?;

    Ok(Json(view))
}

#[derive(Deserialize)]
pub struct CheckRequest {
    #[serde(rename = "choreId")]
    chore_id: i64,
    day: String,
    completed: serde_json::Value,
}

#[post("/chores/<username>/check", data = "<check>")]
pub async fn api_check_chore(
    username: &str,
    check: Json<CheckRequest>,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<OkResponse>, AppError> {
    set_completion(db, username, &check.day, check.chore_id, &check.completed).await?;

    Ok(OkResponse::ok())
}

#[derive(Deserialize)]
pub struct SaveChoresRequest {
    chores: Vec<Chore>,
}

#[post("/chores/<username>/list", data = "<request>")]
pub async fn api_save_chore_list(
    username: &str,
    request: Json<SaveChoresRequest>,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<OkResponse>, AppError> {
    replace_chores(db, username, &request.chores).await?;

    Ok(OkResponse::ok())
}

#[derive(Deserialize)]
pub struct NoteRequest {
    note: String,
}

#[post("/notes/<username>", data = "<request>")]
pub async fn api_save_note(
    username: &str,
    request: Json<NoteRequest>,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<OkResponse>, AppError> {
    set_note(db, username, &request.note).await?;

    Ok(OkResponse::ok())
}

#[get("/weeks")]
pub async fn api_list_weeks(db: &State<Pool<Sqlite>>) -> Result<Json<Vec<Week>>, AppError> {
    let weeks = list_weeks(db).await?;

    Ok(Json(weeks))
}

#[derive(Deserialize, Validate)]
pub struct CreateWeekRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    username: String,
    #[validate(length(min = 1, message = "Password is required"))]
    password: String,
    #[serde(rename = "startDate")]
    start_date: String,
}

#[post("/weeks", data = "<request>")]
pub async fn api_create_week(
    request: Json<CreateWeekRequest>,
    verifier: &State<Box<dyn CredentialVerifier>>,
    db: &State<Pool<Sqlite>>,
) -> Result<Custom<Json<Week>>, Custom<Json<ValidationResponse>>> {
    let validated = request.validate_custom()?;

    let admin = require_admin(db, verifier.as_ref(), &validated.username, &validated.password)
        .await
        .validate_custom()?;
    admin
        .require_permission(Permission::ManageWeeks)
        .validate_custom()?;

    let week = create_week(db, &validated.start_date)
        .await
        .validate_custom()?;

    Ok(Custom(rocket::http::Status::Created, Json(week)))
}

#[derive(Deserialize)]
pub struct AdminCredentials {
    username: String,
    password: String,
}

#[post("/weeks/<start_date>/freeze", data = "<creds>")]
pub async fn api_freeze_week(
    start_date: &str,
    creds: Json<AdminCredentials>,
    verifier: &State<Box<dyn CredentialVerifier>>,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<OkResponse>, AppError> {
    let admin = require_admin(db, verifier.as_ref(), &creds.username, &creds.password).await?;
    admin.require_permission(Permission::ManageWeeks)?;

    freeze_week(db, start_date).await?;

    Ok(OkResponse::ok())
}

#[post("/reset", data = "<creds>")]
pub async fn api_reset(
    creds: Json<AdminCredentials>,
    verifier: &State<Box<dyn CredentialVerifier>>,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<OkResponse>, AppError> {
    let admin = require_admin(db, verifier.as_ref(), &creds.username, &creds.password).await?;
    admin.require_permission(Permission::ResetData)?;

    reset_all(db).await?;

    Ok(OkResponse::ok())
}

#[get("/health")]
pub fn health() -> &'static str {
    "OK"
}

#[catch(401)]
pub fn unauthorized_api(_req: &rocket::Request) -> Custom<Json<ValidationResponse>> {
    Custom(
        rocket::http::Status::Unauthorized,
        Json(ValidationResponse::with_error(
            "authentication",
            "Invalid username or password",
        )),
    )
}

#[catch(403)]
pub fn forbidden_api(_req: &rocket::Request) -> Custom<Json<ValidationResponse>> {
    Custom(
        rocket::http::Status::Forbidden,
        Json(ValidationResponse::with_error(
            "authorization",
            "Admin credentials required",
        )),
    )
}
