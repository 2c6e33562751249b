use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    Staff,
    Cashier,
    Rider,
    #[serde(rename = "super admin")]
    SuperAdmin,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Staff => "staff",
            Role::Cashier => "cashier",
            Role::Rider => "rider",
            Role::SuperAdmin => "super admin",
            Role::User => "user",
        }
    }

    /// "super admin" -> "Super admin"
    pub fn capitalized(&self) -> String {
        let s = self.as_str();
        let mut chars = s.chars();
        match chars.next() {
            Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
            None => String::new(),
        }
    }
}

impl FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "manager" => Ok(Role::Manager),
            "staff" => Ok(Role::Staff),
            "cashier" => Ok(Role::Cashier),
            "rider" => Ok(Role::Rider),
            "super admin" => Ok(Role::SuperAdmin),
            "user" => Ok(Role::User),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Business system a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum System {
    Ims,
    Pos,
    Oos,
    Auth,
}

impl System {
    pub fn as_str(&self) -> &'static str {
        match self {
            System::Ims => "IMS",
            System::Pos => "POS",
            System::Oos => "OOS",
            System::Auth => "AUTH",
        }
    }
}

impl FromStr for System {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IMS" => Ok(System::Ims),
            "POS" => Ok(System::Pos),
            "OOS" => Ok(System::Oos),
            "AUTH" => Ok(System::Auth),
            _ => Err(()),
        }
    }
}

impl fmt::Display for System {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Only point-of-sale managers carry a PIN.
pub fn is_pos_manager(role: Role, system: System) -> bool {
    role == Role::Manager && system == System::Pos
}

/// Stored user record.
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub pin_hash: Option<String>,
    pub role: Role,
    pub system: System,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub suffix: Option<String>,
    pub phone_number: Option<String>,
    pub block: Option<String>,
    pub street: Option<String>,
    pub subdivision: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub landmark: Option<String>,
    pub birthday: Option<Date>,
    pub profile_image: Option<String>,
    pub is_disabled: bool,
    pub created_at: OffsetDateTime,
}

impl User {
    /// All present name parts joined by single spaces.
    pub fn full_name(&self) -> String {
        [
            Some(self.first_name.as_str()),
            self.middle_name.as_deref(),
            Some(self.last_name.as_str()),
            self.suffix.as_deref(),
        ]
        .into_iter()
        .flatten()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
    }

    /// First and last name only, as shown in rider and cashier pickers.
    pub fn short_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Values for a record about to be inserted. Hashes are already computed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub pin_hash: Option<String>,
    pub role: Role,
    pub system: System,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub suffix: Option<String>,
    pub phone_number: Option<String>,
}

/// Staged column assignments for a partial update.
///
/// Outer `None` leaves a column untouched; `Some(None)` writes NULL.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub pin_hash: Option<Option<String>>,
    pub role: Option<Role>,
    pub system: Option<System>,
    pub first_name: Option<String>,
    pub middle_name: Option<Option<String>>,
    pub last_name: Option<String>,
    pub suffix: Option<Option<String>>,
    pub phone_number: Option<Option<String>>,
    pub block: Option<Option<String>>,
    pub street: Option<Option<String>>,
    pub subdivision: Option<Option<String>>,
    pub city: Option<Option<String>>,
    pub province: Option<Option<String>>,
    pub landmark: Option<Option<String>>,
    pub birthday: Option<Option<Date>>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        *self == UserChanges::default()
    }

    /// Applies the staged assignments to an in-memory record.
    pub fn apply_to(&self, user: &mut User) {
        fn set<T: Clone>(dst: &mut T, src: &Option<T>) {
            if let Some(v) = src {
                *dst = v.clone();
            }
        }
        set(&mut user.username, &self.username);
        set(&mut user.email, &self.email);
        set(&mut user.password_hash, &self.password_hash);
        set(&mut user.pin_hash, &self.pin_hash);
        set(&mut user.role, &self.role);
        set(&mut user.system, &self.system);
        set(&mut user.first_name, &self.first_name);
        set(&mut user.middle_name, &self.middle_name);
        set(&mut user.last_name, &self.last_name);
        set(&mut user.suffix, &self.suffix);
        set(&mut user.phone_number, &self.phone_number);
        set(&mut user.block, &self.block);
        set(&mut user.street, &self.street);
        set(&mut user.subdivision, &self.subdivision);
        set(&mut user.city, &self.city);
        set(&mut user.province, &self.province);
        set(&mut user.landmark, &self.landmark);
        set(&mut user.birthday, &self.birthday);
    }
}

/// Username and PIN hash of an enabled point-of-sale manager.
#[derive(Debug, Clone)]
pub struct ManagerPin {
    pub username: String,
    pub pin_hash: String,
}
