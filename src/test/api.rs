#[cfg(test)]
mod tests {
    use crate::api::UserData;
    use crate::db::{get_live_chores, get_note};
    use crate::models::Week;
    use crate::test::utils::{create_standard_test_db, setup_test_client};
    use rocket::http::{ContentType, Status};
    use serde_json::{Value, json};

    #[rocket::async_test]
    async fn test_login_api() {
        let test_db = create_standard_test_db().await;
        let (client, _) = setup_test_client(test_db).await;

        let response = client
            .post("/api/login")
            .header(ContentType::JSON)
            .body(
                json!({
                    "username": "dkc",
                    "password": "password123"
                })
                .to_string(),
            )
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::Ok);

        let body = response.into_string().await.unwrap();
        let user: UserData = serde_json::from_str(&body).unwrap();
        assert_eq!(user.username, "dkc");
        assert_eq!(user.role, "kid");

        let response = client
            .post("/api/login")
            .header(ContentType::JSON)
            .body(
                json!({
                    "username": "dkc",
                    "password": "wrong_password"
                })
                .to_string(),
            )
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::Unauthorized);
    }

    #[rocket::async_test]
    async fn test_users_api() {
        let test_db = create_standard_test_db().await;
        let (client, _) = setup_test_client(test_db).await;

        let response = client.get("/api/users").dispatch().await;
        assert_eq!(response.status(), Status::Ok);

        let body = response.into_string().await.unwrap();
        let users: Vec<UserData> = serde_json::from_str(&body).unwrap();

        let usernames: Vec<&str> = users.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(usernames, vec!["dkc", "skc", "admin"]);
        assert_eq!(users[2].role, "admin");
    }

    #[rocket::async_test]
    async fn test_week_view_api() {
        let test_db = create_standard_test_db().await;
        let (client, _) = setup_test_client(test_db).await;

        let response = client
            .post("/api/chores/dkc/check")
            .header(ContentType::JSON)
            .body(json!({"choreId": 1, "day": "2026-03-02", "completed": true}).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);

        let response = client
            .post("/api/notes/dkc")
            .header(ContentType::JSON)
            .body(json!({"note": "Did great"}).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);

        let response = client.get("/api/chores/dkc").dispatch().await;
        assert_eq!(response.status(), Status::Ok);

        let body: Value =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(body["chores"][0]["name"], "Dishes");
        assert_eq!(body["completions"]["2026-03-02"]["1"], json!(true));
        assert_eq!(body["note"], "Did great");
    }

    #[rocket::async_test]
    async fn test_save_chore_list_api() {
        let test_db = create_standard_test_db().await;
        let (client, test_db) = setup_test_client(test_db).await;

        let response = client
            .post("/api/chores/skc/list")
            .header(ContentType::JSON)
            .body(
                json!({"chores": [
                    {"id": 1, "name": "Feed the cat"},
                    {"id": 2, "name": "  "},
                    {"id": 3, "name": "Read", "ratingType": "rating"}
                ]})
                .to_string(),
            )
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::Ok);

        let saved = get_live_chores(&test_db.pool, "skc").await.unwrap();
        assert_eq!(saved.len(), 2);
        assert_eq!(saved[0].name, "Feed the cat");
        assert_eq!(saved[1].rating_type.as_str(), "rating");
    }

    #[rocket::async_test]
    async fn test_save_chore_list_rejects_duplicate_ids() {
        let test_db = create_standard_test_db().await;
        let (client, _) = setup_test_client(test_db).await;

        let response = client
            .post("/api/chores/skc/list")
            .header(ContentType::JSON)
            .body(
                json!({"chores": [
                    {"id": 1, "name": "Feed the cat"},
                    {"id": 1, "name": "Walk the dog"}
                ]})
                .to_string(),
            )
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::BadRequest);
    }

    #[rocket::async_test]
    async fn test_note_api() {
        let test_db = create_standard_test_db().await;
        let (client, test_db) = setup_test_client(test_db).await;

        let response = client
            .post("/api/notes/dkc")
            .header(ContentType::JSON)
            .body(json!({"note": "Remember trash day"}).to_string())
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::Ok);
        assert_eq!(
            get_note(&test_db.pool, "dkc").await.unwrap(),
            "Remember trash day"
        );
    }

    #[rocket::async_test]
    async fn test_create_week_requires_admin() {
        let test_db = create_standard_test_db().await;
        let (client, _) = setup_test_client(test_db).await;

        // Kid with a correct password is forbidden
        let response = client
            .post("/api/weeks")
            .header(ContentType::JSON)
            .body(
                json!({"username": "dkc", "password": "password123", "startDate": "2026-03-01"})
                    .to_string(),
            )
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Forbidden);

        // Admin with a wrong password is unauthorized
        let response = client
            .post("/api/weeks")
            .header(ContentType::JSON)
            .body(
                json!({"username": "admin", "password": "nope", "startDate": "2026-03-01"})
                    .to_string(),
            )
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Unauthorized);

        let response = client.get("/api/weeks").dispatch().await;
        let weeks: Vec<Week> =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert!(weeks.is_empty());
    }

    #[rocket::async_test]
    async fn test_week_lifecycle_api() {
        let test_db = create_standard_test_db().await;
        let (client, _) = setup_test_client(test_db).await;

        let admin_creds = json!({"username": "admin", "password": "password123"});

        let mut create_body = admin_creds.clone();
        create_body["startDate"] = json!("2026-03-01");

        let response = client
            .post("/api/weeks")
            .header(ContentType::JSON)
            .body(create_body.to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Created);

        let body: Value =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(body["startDate"], "2026-03-01");
        assert_eq!(body["frozen"], json!(false));

        // Duplicate start date
        let response = client
            .post("/api/weeks")
            .header(ContentType::JSON)
            .body(create_body.to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Conflict);

        // Bad date format
        let mut bad_body = admin_creds.clone();
        bad_body["startDate"] = json!("03-01-2026");
        let response = client
            .post("/api/weeks")
            .header(ContentType::JSON)
            .body(bad_body.to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::BadRequest);

        // Freeze, then confirm the scoped view is pinned to the snapshot
        let response = client
            .post("/api/weeks/2026-03-01/freeze")
            .header(ContentType::JSON)
            .body(admin_creds.to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);

        let response = client
            .post("/api/chores/dkc/list")
            .header(ContentType::JSON)
            .body(json!({"chores": [{"id": 9, "name": "Something new"}]}).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);

        let response = client
            .get("/api/chores/dkc?week=2026-03-01")
            .dispatch()
            .await;
        let body: Value =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(body["chores"][0]["name"], "Dishes");

        let response = client.get("/api/chores/dkc").dispatch().await;
        let body: Value =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(body["chores"][0]["name"], "Something new");

        let response = client.get("/api/weeks").dispatch().await;
        let weeks: Vec<Week> =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(weeks.len(), 1);
        assert!(weeks[0].frozen);
    }

    #[rocket::async_test]
    async fn test_freeze_unknown_week_api() {
        let test_db = create_standard_test_db().await;
        let (client, _) = setup_test_client(test_db).await;

        let response = client
            .post("/api/weeks/2026-03-01/freeze")
            .header(ContentType::JSON)
            .body(json!({"username": "admin", "password": "password123"}).to_string())
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::NotFound);
    }

    #[rocket::async_test]
    async fn test_reset_api() {
        let test_db = create_standard_test_db().await;
        let (client, test_db) = setup_test_client(test_db).await;

        client
            .post("/api/chores/dkc/check")
            .header(ContentType::JSON)
            .body(json!({"choreId": 1, "day": "2026-03-02", "completed": true}).to_string())
            .dispatch()
            .await;

        // Kid creds are rejected
        let response = client
            .post("/api/reset")
            .header(ContentType::JSON)
            .body(json!({"username": "dkc", "password": "password123"}).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Forbidden);

        let response = client
            .post("/api/reset")
            .header(ContentType::JSON)
            .body(json!({"username": "admin", "password": "password123"}).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);

        let completions = crate::db::get_completions(&test_db.pool, "dkc").await.unwrap();
        assert!(completions.is_empty());

        // Chore lists survive a reset
        assert_eq!(get_live_chores(&test_db.pool, "dkc").await.unwrap().len(), 2);
    }

    #[rocket::async_test]
    async fn test_health() {
        let test_db = create_standard_test_db().await;
        let (client, _) = setup_test_client(test_db).await;

        let response = client.get("/api/health").dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        assert_eq!(response.into_string().await.unwrap(), "OK");
    }
}
