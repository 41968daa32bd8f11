use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database. Not serializable: clients only ever see `PublicUser`.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub user_name: String,            // lowercased, unique
    pub email: String,                // lowercased, unique
    pub full_name: String,
    pub password_hash: String,        // argon2 PHC string
    pub avatar: String,
    pub cover_image: Option<String>,
    pub refresh_token: Option<String>, // latest issued, None after logout
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Registration input. `password` is plaintext; the store hashes it before writing.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub user_name: String,
    pub email: String,
    pub full_name: String,
    pub password: String,
    pub avatar: String,
    pub cover_image: Option<String>,
}
