use anyhow::Context;
use tracing::{info, warn};

use crate::auth::password::{is_valid_pin, verify_password};
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::users::model::ManagerPin;

/// Finds the POS manager whose PIN hash matches `pin`.
///
/// Candidates are checked in storage order and the first match wins. A
/// stored hash that cannot be parsed is skipped. The caller only learns the
/// matched username, never how many candidates were tried.
pub async fn verify_manager_pin(st: &AppState, pin: &str, caller: &str) -> AppResult<String> {
    if !is_valid_pin(pin) {
        return Err(AppError::validation("A valid 4-digit PIN is required."));
    }

    let managers = st.users.pos_manager_pins().await?;
    if managers.is_empty() {
        return Err(AppError::not_found(
            "No active POS managers with a PIN are configured in the system.",
        ));
    }

    // argon2 checks are CPU-bound; run them on the blocking pool.
    let pin = pin.to_string();
    let matched = tokio::task::spawn_blocking(move || first_match(&pin, managers))
        .await
        .context("pin verification task")?;

    match matched {
        Some(username) => {
            info!(manager = %username, "manager pin verified");
            Ok(username)
        }
        None => {
            warn!(%caller, "failed pin verification attempt");
            Err(AppError::Unauthorized("Invalid PIN.".into()))
        }
    }
}

fn first_match(pin: &str, managers: Vec<ManagerPin>) -> Option<String> {
    for m in managers {
        match verify_password(pin, &m.pin_hash) {
            Ok(true) => return Some(m.username),
            Ok(false) => {}
            Err(e) => {
                warn!(manager = %m.username, error = %e, "skipping manager with malformed pin hash");
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::hash_password;
    use crate::users::model::UserChanges;
    use crate::users::repo::UserStore;
    use crate::users::services::tests::{create_manager, create_req, state};
    use crate::users::services::{create_user, disable_user};

    #[tokio::test]
    async fn returns_the_manager_whose_pin_matches() {
        let (st, _) = state();
        create_manager(&st, "alpha", "1111").await;
        create_manager(&st, "bravo", "2222").await;
        create_manager(&st, "charlie", "3333").await;

        for (pin, expected) in [("1111", "alpha"), ("2222", "bravo"), ("3333", "charlie")] {
            let who = verify_manager_pin(&st, pin, "cashier1").await.unwrap();
            assert_eq!(who, expected);
        }
    }

    #[tokio::test]
    async fn unknown_pin_is_unauthorized() {
        let (st, _) = state();
        create_manager(&st, "alpha", "1111").await;
        let err = verify_manager_pin(&st, "9999", "cashier1").await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(ref m) if m == "Invalid PIN."));
    }

    #[tokio::test]
    async fn no_configured_managers_is_not_found() {
        let (st, _) = state();
        create_user(&st, create_req("ims-boss", "manager", "IMS")).await.unwrap();
        let err = verify_manager_pin(&st, "1234", "cashier1").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn disabled_managers_are_not_candidates() {
        let (st, _) = state();
        let id = create_manager(&st, "alpha", "1111").await;
        disable_user(&st, id).await.unwrap();
        let err = verify_manager_pin(&st, "1111", "cashier1").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn malformed_pin_input_is_rejected_before_lookup() {
        let (st, _) = state();
        for pin in ["", "123", "12345", "abcd", "12 4"] {
            let err = verify_manager_pin(&st, pin, "cashier1").await.unwrap_err();
            assert!(matches!(err, AppError::Validation(_)), "{pin:?}");
        }
    }

    #[tokio::test]
    async fn malformed_stored_hash_is_skipped() {
        let (st, users) = state();
        let broken = create_manager(&st, "broken", "1111").await;
        create_manager(&st, "good", "1111").await;
        users
            .update(
                broken,
                &UserChanges {
                    pin_hash: Some(Some("not-a-phc-string".into())),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(verify_manager_pin(&st, "1111", "c").await.unwrap(), "good");
    }

    #[test]
    fn foreign_algorithm_hash_is_skipped() {
        let managers = vec![
            ManagerPin {
                username: "legacy".into(),
                pin_hash: "$scrypt$ln=15,r=8,p=1$c2FsdHNhbHQ$aGFzaGhhc2hoYXNoaGFzaA".into(),
            },
            ManagerPin {
                username: "current".into(),
                pin_hash: hash_password("8080").unwrap(),
            },
        ];
        assert_eq!(first_match("8080", managers).as_deref(), Some("current"));
    }

    #[test]
    fn first_match_wins_on_shared_pin() {
        let hash = hash_password("5555").unwrap();
        let managers = vec![
            ManagerPin {
                username: "first".into(),
                pin_hash: hash.clone(),
            },
            ManagerPin {
                username: "second".into(),
                pin_hash: hash,
            },
        ];
        assert_eq!(first_match("5555", managers).as_deref(), Some("first"));
    }
}
