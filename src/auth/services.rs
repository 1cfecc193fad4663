use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use super::{
    dto::{AuthResponse, LoginRequest, RegisterRequest},
    jwt::JwtKeys,
    password::{hash_password, verify_decoy, verify_password},
    repo::{UserRepo, USER_EXISTS},
    repo_types::NewUser,
};
use crate::error::AppError;

pub const MIN_PASSWORD_LEN: usize = 6;
const INVALID_CREDENTIALS: &str = "Invalid credentials";

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub fn validate_register(req: &RegisterRequest) -> Result<(), AppError> {
    if req.email.is_empty() || req.password.is_empty() {
        return Err(AppError::validation("Email and password are required"));
    }
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    if !is_valid_email(&req.email) {
        return Err(AppError::validation("Invalid email format"));
    }
    Ok(())
}

pub fn validate_login(req: &LoginRequest) -> Result<(), AppError> {
    if req.email.is_empty() || req.password.is_empty() {
        return Err(AppError::validation("Email and password are required"));
    }
    Ok(())
}

pub async fn register(
    users: &dyn UserRepo,
    keys: &JwtKeys,
    req: RegisterRequest,
) -> Result<AuthResponse, AppError> {
    validate_register(&req)?;

    if users.find_by_email(&req.email).await?.is_some() {
        warn!(email = %req.email, "email already registered");
        return Err(AppError::Conflict(USER_EXISTS.into()));
    }

    let password_hash = hash_password(&req.password)?;
    let user = users
        .create(NewUser {
            email: req.email,
            password_hash,
            name: req.name.filter(|n| !n.trim().is_empty()),
        })
        .await?;

    let token = keys.sign(user.id)?;
    info!(user_id = %user.id, "user registered");
    Ok(AuthResponse {
        message: "User created successfully".into(),
        token,
        user: user.into(),
    })
}

/// Unknown email and wrong password fail with the same error.
pub async fn login(
    users: &dyn UserRepo,
    keys: &JwtKeys,
    req: LoginRequest,
) -> Result<AuthResponse, AppError> {
    validate_login(&req)?;

    let Some(user) = users.find_by_email(&req.email).await? else {
        warn!("login unknown email");
        verify_decoy(&req.password);
        return Err(AppError::unauthorized(INVALID_CREDENTIALS));
    };

    if !verify_password(&req.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::unauthorized(INVALID_CREDENTIALS));
    }

    let token = keys.sign(user.id)?;
    info!(user_id = %user.id, "user logged in");
    Ok(AuthResponse {
        message: "Logged in successfully".into(),
        token,
        user: user.into(),
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::memory::MemoryStore;

    fn register_req(email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.into(),
            password: password.into(),
            name: Some("Ann".into()),
        }
    }

    fn keys() -> JwtKeys {
        JwtKeys::new("unit-secret", Duration::from_secs(3600))
    }

    #[test]
    fn email_regex() {
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a b@c.de"));
        assert!(!is_valid_email("@c.de"));
    }

    #[test]
    fn register_validation_order() {
        let msg = |r: RegisterRequest| validate_register(&r).unwrap_err().to_string();
        assert_eq!(msg(register_req("", "secret")), "Email and password are required");
        assert_eq!(msg(register_req("a@b.co", "")), "Email and password are required");
        assert_eq!(
            msg(register_req("a@b.co", "12345")),
            "Password must be at least 6 characters"
        );
        assert_eq!(msg(register_req("nope", "123456")), "Invalid email format");
        assert!(validate_register(&register_req("a@b.co", "123456")).is_ok());
    }

    #[tokio::test]
    async fn register_then_login() {
        let store = MemoryStore::new();
        let keys = keys();
        let reg = register(&store, &keys, register_req("ann@example.com", "secret1"))
            .await
            .unwrap();
        assert_eq!(reg.user.email, "ann@example.com");
        assert_eq!(keys.verify(&reg.token).unwrap().sub, reg.user.id);

        let stored = store.find_by_email("ann@example.com").await.unwrap().unwrap();
        assert_ne!(stored.password_hash, "secret1");

        let ok = login(
            &store,
            &keys,
            LoginRequest {
                email: "ann@example.com".into(),
                password: "secret1".into(),
            },
        )
        .await
        .unwrap();
        assert_eq!(ok.user.id, reg.user.id);
    }

    #[tokio::test]
    async fn duplicate_email_is_conflict() {
        let store = MemoryStore::new();
        let keys = keys();
        register(&store, &keys, register_req("dup@example.com", "secret1"))
            .await
            .unwrap();
        let err = register(&store, &keys, register_req("dup@example.com", "other12"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(store.user_count().await, 1);
    }

    #[tokio::test]
    async fn bad_credentials_are_indistinguishable() {
        let store = MemoryStore::new();
        let keys = keys();
        register(&store, &keys, register_req("ann@example.com", "secret1"))
            .await
            .unwrap();

        let wrong_pw = login(
            &store,
            &keys,
            LoginRequest {
                email: "ann@example.com".into(),
                password: "secret2".into(),
            },
        )
        .await
        .unwrap_err();
        let unknown = login(
            &store,
            &keys,
            LoginRequest {
                email: "bob@example.com".into(),
                password: "secret1".into(),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(wrong_pw.to_string(), unknown.to_string());
        assert_eq!(wrong_pw.status_code(), unknown.status_code());
    }
}
