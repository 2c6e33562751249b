use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;

use super::model::{ManagerPin, NewUser, Role, System, User, UserChanges};
use super::repo::{Conflict, UserStore};

/// Vec-backed store mirroring the SQL semantics of `PgUserStore`.
#[derive(Default)]
pub struct MemoryUserStore {
    rows: Mutex<Vec<User>>,
    /// When set, every write fails like a lost database connection.
    pub fail_writes: AtomicBool,
    /// When set, the `*_taken` checks report false, as if a concurrent
    /// writer committed between the check and the write.
    pub stale_checks: AtomicBool,
}

impl MemoryUserStore {
    pub fn get(&self, id: i64) -> Option<User> {
        self.rows.lock().unwrap().iter().find(|u| u.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    fn check_writable(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            !self.fail_writes.load(Ordering::SeqCst),
            "connection reset by peer"
        );
        Ok(())
    }

    fn taken(&self, exclude: Option<i64>, pred: impl Fn(&User) -> bool) -> bool {
        if self.stale_checks.load(Ordering::SeqCst) {
            return false;
        }
        self.rows
            .lock()
            .unwrap()
            .iter()
            .any(|u| !u.is_disabled && Some(u.id) != exclude && pred(u))
    }
}

/// Same rule as the partial unique indexes: enabled records only.
fn conflict(rows: &[User], id: i64, username: &str, email: &str) -> Option<Conflict> {
    let others: Vec<&User> = rows
        .iter()
        .filter(|u| !u.is_disabled && u.id != id)
        .collect();
    if others.iter().any(|u| u.username == username) {
        Some(Conflict::Username)
    } else if others.iter().any(|u| u.email == email) {
        Some(Conflict::Email)
    } else {
        None
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn email_taken(&self, email: &str, exclude: Option<i64>) -> anyhow::Result<bool> {
        Ok(self.taken(exclude, |u| u.email == email))
    }

    async fn username_taken(&self, username: &str, exclude: Option<i64>) -> anyhow::Result<bool> {
        Ok(self.taken(exclude, |u| u.username == username))
    }

    async fn insert(&self, n: NewUser) -> anyhow::Result<i64> {
        self.check_writable()?;
        let mut rows = self.rows.lock().unwrap();
        let id = rows.iter().map(|u| u.id).max().unwrap_or(0) + 1;
        if let Some(c) = conflict(&rows, id, &n.username, &n.email) {
            return Err(c.into());
        }
        rows.push(User {
            id,
            username: n.username,
            email: n.email,
            password_hash: n.password_hash,
            pin_hash: n.pin_hash,
            role: n.role,
            system: n.system,
            first_name: n.first_name,
            middle_name: n.middle_name,
            last_name: n.last_name,
            suffix: n.suffix,
            phone_number: n.phone_number,
            block: None,
            street: None,
            subdivision: None,
            city: None,
            province: None,
            landmark: None,
            birthday: None,
            profile_image: None,
            is_disabled: false,
            created_at: OffsetDateTime::now_utc(),
        });
        Ok(id)
    }

    async fn list_all(&self) -> anyhow::Result<Vec<User>> {
        Ok(self.rows.lock().unwrap().clone())
    }

    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<User>> {
        Ok(self.get(id))
    }

    async fn find_active_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|u| !u.is_disabled && u.username == username)
            .cloned())
    }

    async fn update(&self, id: i64, changes: &UserChanges) -> anyhow::Result<()> {
        self.check_writable()?;
        let mut rows = self.rows.lock().unwrap();
        let Some(pos) = rows.iter().position(|u| u.id == id) else {
            return Ok(());
        };
        let mut next = rows[pos].clone();
        changes.apply_to(&mut next);
        if !next.is_disabled {
            if let Some(c) = conflict(&rows, id, &next.username, &next.email) {
                return Err(c.into());
            }
        }
        rows[pos] = next;
        Ok(())
    }

    async fn disable(&self, id: i64) -> anyhow::Result<bool> {
        self.check_writable()?;
        let mut rows = self.rows.lock().unwrap();
        match rows.iter_mut().find(|u| u.id == id && !u.is_disabled) {
            Some(u) => {
                u.is_disabled = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_active_by_role(
        &self,
        role: Role,
        system: Option<System>,
        by_name: bool,
    ) -> anyhow::Result<Vec<User>> {
        let mut out: Vec<User> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|u| !u.is_disabled && u.role == role && system.map_or(true, |s| u.system == s))
            .cloned()
            .collect();
        if by_name {
            out.sort_by(|a, b| {
                (&a.first_name, &a.last_name).cmp(&(&b.first_name, &b.last_name))
            });
        }
        Ok(out)
    }

    async fn pos_manager_pins(&self) -> anyhow::Result<Vec<ManagerPin>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|u| !u.is_disabled && u.role == Role::Manager && u.system == System::Pos)
            .filter_map(|u| match &u.pin_hash {
                Some(h) if !h.is_empty() => Some(ManagerPin {
                    username: u.username.clone(),
                    pin_hash: h.clone(),
                }),
                _ => None,
            })
            .collect())
    }

    async fn set_profile_image(&self, id: i64, file_name: &str) -> anyhow::Result<()> {
        self.check_writable()?;
        if let Some(u) = self.rows.lock().unwrap().iter_mut().find(|u| u.id == id) {
            u.profile_image = Some(file_name.to_string());
        }
        Ok(())
    }
}
