use anyhow::Context;
use async_trait::async_trait;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use time::{Date, OffsetDateTime};

use super::model::{ManagerPin, NewUser, Role, System, User, UserChanges};

/// A write lost a uniqueness race against another enabled record. Returned
/// inside the `anyhow::Error` of `insert` and `update`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Conflict {
    #[error("username already used by an enabled record")]
    Username,
    #[error("email already used by an enabled record")]
    Email,
}

/// Persistence seam for user records.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// True when an enabled record other than `exclude` uses this email.
    async fn email_taken(&self, email: &str, exclude: Option<i64>) -> anyhow::Result<bool>;
    /// True when an enabled record other than `exclude` uses this username.
    async fn username_taken(&self, username: &str, exclude: Option<i64>) -> anyhow::Result<bool>;
    async fn insert(&self, user: NewUser) -> anyhow::Result<i64>;
    async fn list_all(&self) -> anyhow::Result<Vec<User>>;
    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<User>>;
    async fn find_active_by_username(&self, username: &str) -> anyhow::Result<Option<User>>;
    async fn update(&self, id: i64, changes: &UserChanges) -> anyhow::Result<()>;
    /// Flips an enabled record to disabled; false if none was enabled.
    async fn disable(&self, id: i64) -> anyhow::Result<bool>;
    /// Enabled records with `role` (and `system`, when given), sorted by
    /// first then last name when `by_name` is set, by id otherwise.
    async fn list_active_by_role(
        &self,
        role: Role,
        system: Option<System>,
        by_name: bool,
    ) -> anyhow::Result<Vec<User>>;
    /// Enabled POS managers with a non-empty PIN hash.
    async fn pos_manager_pins(&self) -> anyhow::Result<Vec<ManagerPin>>;
    async fn set_profile_image(&self, id: i64, file_name: &str) -> anyhow::Result<()>;
}

const USER_COLUMNS: &str = "id, username, email, password_hash, pin_hash, role, system, \
     first_name, middle_name, last_name, suffix, phone_number, block, street, subdivision, \
     city, province, landmark, birthday, profile_image, is_disabled, created_at";

#[derive(Debug, FromRow)]
struct UserRow {
    id: i64,
    username: String,
    email: String,
    password_hash: String,
    pin_hash: Option<String>,
    role: String,
    system: String,
    first_name: String,
    middle_name: Option<String>,
    last_name: String,
    suffix: Option<String>,
    phone_number: Option<String>,
    block: Option<String>,
    street: Option<String>,
    subdivision: Option<String>,
    city: Option<String>,
    province: Option<String>,
    landmark: Option<String>,
    birthday: Option<Date>,
    profile_image: Option<String>,
    is_disabled: bool,
    created_at: OffsetDateTime,
}

impl TryFrom<UserRow> for User {
    type Error = anyhow::Error;

    fn try_from(r: UserRow) -> Result<Self, Self::Error> {
        let role = r
            .role
            .parse::<Role>()
            .map_err(|_| anyhow::anyhow!("user {} has unknown role {:?}", r.id, r.role))?;
        let system = r
            .system
            .parse::<System>()
            .map_err(|_| anyhow::anyhow!("user {} has unknown system {:?}", r.id, r.system))?;
        Ok(User {
            id: r.id,
            username: r.username,
            email: r.email,
            password_hash: r.password_hash,
            pin_hash: r.pin_hash,
            role,
            system,
            first_name: r.first_name,
            middle_name: r.middle_name,
            last_name: r.last_name,
            suffix: r.suffix,
            phone_number: r.phone_number,
            block: r.block,
            street: r.street,
            subdivision: r.subdivision,
            city: r.city,
            province: r.province,
            landmark: r.landmark,
            birthday: r.birthday,
            profile_image: r.profile_image,
            is_disabled: r.is_disabled,
            created_at: r.created_at,
        })
    }
}

/// Unique index violations become a `Conflict`; the index name tells which.
fn write_error(err: sqlx::Error, what: &'static str) -> anyhow::Error {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return match db.constraint() {
                Some(c) if c.contains("email") => Conflict::Email.into(),
                _ => Conflict::Username.into(),
            };
        }
    }
    anyhow::Error::new(err).context(what)
}

fn into_users(rows: Vec<UserRow>) -> anyhow::Result<Vec<User>> {
    rows.into_iter().map(User::try_from).collect()
}

/// Postgres-backed store. Each call checks a connection out of the pool and
/// hands it back when the query future finishes or is dropped.
#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn email_taken(&self, email: &str, exclude: Option<i64>) -> anyhow::Result<bool> {
        let taken = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM users
                WHERE email = $1
                  AND NOT is_disabled
                  AND ($2::BIGINT IS NULL OR id <> $2)
            )
            "#,
        )
        .bind(email)
        .bind(exclude)
        .fetch_one(&self.db)
        .await
        .context("check email taken")?;
        Ok(taken)
    }

    async fn username_taken(&self, username: &str, exclude: Option<i64>) -> anyhow::Result<bool> {
        let taken = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM users
                WHERE username = $1
                  AND NOT is_disabled
                  AND ($2::BIGINT IS NULL OR id <> $2)
            )
            "#,
        )
        .bind(username)
        .bind(exclude)
        .fetch_one(&self.db)
        .await
        .context("check username taken")?;
        Ok(taken)
    }

    async fn insert(&self, user: NewUser) -> anyhow::Result<i64> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO users (username, email, password_hash, pin_hash, role, system,
                               first_name, middle_name, last_name, suffix, phone_number)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id
            "#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.pin_hash)
        .bind(user.role.as_str())
        .bind(user.system.as_str())
        .bind(&user.first_name)
        .bind(&user.middle_name)
        .bind(&user.last_name)
        .bind(&user.suffix)
        .bind(&user.phone_number)
        .fetch_one(&self.db)
        .await
        .map_err(|e| write_error(e, "insert user"))?;
        Ok(id)
    }

    async fn list_all(&self) -> anyhow::Result<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY id"
        ))
        .fetch_all(&self.db)
        .await
        .context("list users")?;
        into_users(rows)
    }

    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find user by id")?;
        row.map(User::try_from).transpose()
    }

    async fn find_active_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1 AND NOT is_disabled"
        ))
        .bind(username)
        .fetch_optional(&self.db)
        .await
        .context("find user by username")?;
        row.map(User::try_from).transpose()
    }

    async fn update(&self, id: i64, changes: &UserChanges) -> anyhow::Result<()> {
        if changes.is_empty() {
            return Ok(());
        }

        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE users SET ");
        let mut set = qb.separated(", ");
        macro_rules! assign {
            ($col:literal, $val:expr) => {
                if let Some(v) = $val {
                    set.push(concat!($col, " = ")).push_bind_unseparated(v);
                }
            };
        }
        assign!("username", changes.username.clone());
        assign!("email", changes.email.clone());
        assign!("password_hash", changes.password_hash.clone());
        assign!("pin_hash", changes.pin_hash.clone());
        assign!("role", changes.role.map(|r| r.as_str()));
        assign!("system", changes.system.map(|s| s.as_str()));
        assign!("first_name", changes.first_name.clone());
        assign!("middle_name", changes.middle_name.clone());
        assign!("last_name", changes.last_name.clone());
        assign!("suffix", changes.suffix.clone());
        assign!("phone_number", changes.phone_number.clone());
        assign!("block", changes.block.clone());
        assign!("street", changes.street.clone());
        assign!("subdivision", changes.subdivision.clone());
        assign!("city", changes.city.clone());
        assign!("province", changes.province.clone());
        assign!("landmark", changes.landmark.clone());
        assign!("birthday", changes.birthday);

        qb.push(" WHERE id = ").push_bind(id);
        qb.build()
            .execute(&self.db)
            .await
            .map_err(|e| write_error(e, "update user"))?;
        Ok(())
    }

    async fn disable(&self, id: i64) -> anyhow::Result<bool> {
        let res =
            sqlx::query("UPDATE users SET is_disabled = TRUE WHERE id = $1 AND NOT is_disabled")
                .bind(id)
                .execute(&self.db)
                .await
                .context("disable user")?;
        Ok(res.rows_affected() == 1)
    }

    async fn list_active_by_role(
        &self,
        role: Role,
        system: Option<System>,
        by_name: bool,
    ) -> anyhow::Result<Vec<User>> {
        let order = if by_name {
            "first_name, last_name"
        } else {
            "id"
        };
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE role = $1 AND ($2::TEXT IS NULL OR system = $2) AND NOT is_disabled \
             ORDER BY {order}"
        ))
        .bind(role.as_str())
        .bind(system.map(|s| s.as_str()))
        .fetch_all(&self.db)
        .await
        .context("list users by role")?;
        into_users(rows)
    }

    async fn pos_manager_pins(&self) -> anyhow::Result<Vec<ManagerPin>> {
        let rows = sqlx::query_as::<_, (String, String)>(
            r#"
            SELECT username, pin_hash
              FROM users
             WHERE role = 'manager'
               AND system = 'POS'
               AND NOT is_disabled
               AND pin_hash IS NOT NULL
               AND pin_hash <> ''
            "#,
        )
        .fetch_all(&self.db)
        .await
        .context("load pos manager pins")?;
        Ok(rows
            .into_iter()
            .map(|(username, pin_hash)| ManagerPin { username, pin_hash })
            .collect())
    }

    async fn set_profile_image(&self, id: i64, file_name: &str) -> anyhow::Result<()> {
        sqlx::query("UPDATE users SET profile_image = $1 WHERE id = $2")
            .bind(file_name)
            .bind(id)
            .execute(&self.db)
            .await
            .context("set profile image")?;
        Ok(())
    }
}
