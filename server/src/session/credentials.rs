use tokio_rusqlite::Connection;
use tracing::{info, warn};

use shared::types::{ApiError, LoginData, MIN_PASSWORD_LEN, RegistrationData};

use crate::database::users::{self, NewUser, Registration, User};
use crate::database::utils::{hash_password, is_valid_email, sanitize_string, verify_password};
use crate::internal_failure;

/// Validate a sign-up and create the user. Returns the new user id.
///
/// An already-registered email is reported as `Conflict`.
pub async fn register_account(db: &Connection, data: RegistrationData) -> Result<i64, ApiError> {
    let email = sanitize_string(&data.email);
    let nickname = sanitize_string(&data.nickname);

    if email.is_empty() || data.password.is_empty() || nickname.is_empty() {
        return Err(ApiError::validation("Email, password and nickname are required"));
    }
    if !is_valid_email(&email) {
        return Err(ApiError::validation("Invalid email format"));
    }
    if data.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    let password = data.password;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(internal_failure("hash password"))?
        .map_err(internal_failure("hash password"))?;

    let new_user = NewUser {
        email: email.clone(),
        password_hash,
        nickname,
    };

    match users::register_user(db, new_user)
        .await
        .map_err(internal_failure("register user"))?
    {
        Registration::Created(id) => Ok(id),
        Registration::EmailTaken => {
            info!("Registration refused, email already in use");
            Err(ApiError::Conflict("Email already registered".to_string()))
        }
    }
}

/// Check an email/password pair.
///
/// Unknown email and wrong password are indistinguishable to the caller.
pub async fn authenticate(db: &Connection, data: LoginData) -> Result<User, ApiError> {
    let email = sanitize_string(&data.email);
    if email.is_empty() || data.password.is_empty() {
        return Err(ApiError::validation("Email and password are required"));
    }

    let Some(user) = users::get_user_by_email(db, email)
        .await
        .map_err(internal_failure("look up user"))?
    else {
        warn!("Login failed: unknown email");
        return Err(ApiError::InvalidCredentials);
    };

    let hash = user.password_hash.clone();
    let password = data.password;
    let matches = tokio::task::spawn_blocking(move || verify_password(&hash, &password))
        .await
        .map_err(internal_failure("verify password"))?
        .map_err(internal_failure("verify password"))?;

    if !matches {
        warn!("Login failed: wrong password for user {}", user.id);
        return Err(ApiError::InvalidCredentials);
    }

    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::open_database;

    fn signup(email: &str, password: &str, nickname: &str) -> RegistrationData {
        RegistrationData {
            email: email.into(),
            password: password.into(),
            nickname: nickname.into(),
        }
    }

    fn creds(email: &str, password: &str) -> LoginData {
        LoginData {
            email: email.into(),
            password: password.into(),
        }
    }

    #[tokio::test]
    async fn register_validates_input() {
        let db = open_database(":memory:").await.unwrap();

        for bad in [
            signup("", "secret1", "Ann"),
            signup("a@x.com", "", "Ann"),
            signup("a@x.com", "secret1", "   "),
            signup("not-an-email", "secret1", "Ann"),
            signup("a@x.com", "12345", "Ann"),
        ] {
            let err = register_account(&db, bad).await.unwrap_err();
            assert_eq!(err.to_code(), "VALIDATION_ERROR");
        }
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts() {
        let db = open_database(":memory:").await.unwrap();
        register_account(&db, signup("a@x.com", "secret1", "Ann"))
            .await
            .unwrap();
        let err = register_account(&db, signup("a@x.com", "secret2", "Other"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[tokio::test]
    async fn authenticate_checks_password() {
        let db = open_database(":memory:").await.unwrap();
        let id = register_account(&db, signup("a@x.com", "secret1", "Ann"))
            .await
            .unwrap();

        let user = authenticate(&db, creds("a@x.com", "secret1")).await.unwrap();
        assert_eq!(user.id, id);

        assert_eq!(
            authenticate(&db, creds("a@x.com", "wrong")).await.unwrap_err(),
            ApiError::InvalidCredentials
        );
        assert_eq!(
            authenticate(&db, creds("nobody@x.com", "secret1"))
                .await
                .unwrap_err(),
            ApiError::InvalidCredentials
        );
        assert!(matches!(
            authenticate(&db, creds("", "")).await.unwrap_err(),
            ApiError::Validation(_)
        ));
    }
}
