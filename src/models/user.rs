use chrono::{DateTime, Utc};

#[derive(sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub full_name: String,
    pub role: String,
    pub branch: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}
