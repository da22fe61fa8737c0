use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::auth::{AuthError, PasswordHasher, TokenIssuer};
use crate::models::dto::{
    AuthResponse, ChangePasswordRequest, LoginRequest, RegisterRequest, UpdateProfileRequest,
};
use crate::models::user::{normalize_email, NewUser, User, UserDto};
use crate::repository::Database;

/// Account workflows. Synchronous; handlers run it through `web::block`.
#[derive(Clone)]
pub struct AuthService {
    db: Database,
    hasher: PasswordHasher,
    tokens: TokenIssuer,
}

impl AuthService {
    pub fn new(db: Database, hasher: PasswordHasher, tokens: TokenIssuer) -> Self {
        Self { db, hasher, tokens }
    }

    pub fn login(&self, request: &LoginRequest) -> Result<AuthResponse, AuthError> {
        let email = normalize_email(&request.email);
        let Some(mut user) = self.db.find_user_by_email(&email)? else {
            tracing::warn!(email = %email, "login for unknown email");
            return Err(AuthError::InvalidCredentials);
        };
        if !user.is_active || !self.hasher.verify(&request.password, &user.password_hash)? {
            tracing::warn!(user_id = %user.id, "rejected login");
            return Err(AuthError::InvalidCredentials);
        }

        let now = Utc::now();
        self.db.record_login(&user.id, now.naive_utc())?;
        user.last_login_at = Some(now.naive_utc());
        tracing::info!(user_id = %user.id, "user logged in");
        self.respond(&user, now)
    }

    pub fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, AuthError> {
        let email = normalize_email(&request.email);
        if self.db.find_user_by_email(&email)?.is_some() {
            tracing::warn!(email = %email, "registration for existing email");
            return Err(AuthError::EmailTaken(email));
        }

        let user = self.create_user(
            &email,
            &request.password,
            request.first_name.trim(),
            request.last_name.trim(),
        )?;
        tracing::info!(user_id = %user.id, "user registered");
        self.respond(&user, Utc::now())
    }

    pub fn profile(&self, user_id: &str) -> Result<UserDto, AuthError> {
        self.db
            .find_user_by_id(user_id)?
            .map(|user| UserDto::from(&user))
            .ok_or_else(|| AuthError::UserNotFound(user_id.to_string()))
    }

    pub fn update_profile(
        &self,
        user_id: &str,
        request: &UpdateProfileRequest,
    ) -> Result<(), AuthError> {
        let updated = self.db.update_profile(
            user_id,
            request.first_name.trim(),
            request.last_name.trim(),
        )?;
        if !updated {
            return Err(AuthError::UserNotFound(user_id.to_string()));
        }
        tracing::info!(user_id, "profile updated");
        Ok(())
    }

    pub fn change_password(
        &self,
        user_id: &str,
        request: &ChangePasswordRequest,
    ) -> Result<(), AuthError> {
        let user = self
            .db
            .find_user_by_id(user_id)?
            .ok_or_else(|| AuthError::UserNotFound(user_id.to_string()))?;
        if !self.hasher.verify(&request.current_password, &user.password_hash)? {
            tracing::warn!(user_id, "password change with wrong current password");
            return Err(AuthError::WrongPassword);
        }
        let hash = self.hasher.hash(&request.new_password)?;
        self.db.update_password_hash(user_id, &hash)?;
        tracing::info!(user_id, "password changed");
        Ok(())
    }

    /// Creates the admin account unless the email is already registered.
    /// Returns whether an account was created.
    pub fn seed_admin(&self, email: &str, password: &str) -> Result<bool, AuthError> {
        let email = normalize_email(email);
        if self.db.find_user_by_email(&email)?.is_some() {
            return Ok(false);
        }
        let user = self.create_user(&email, password, "Admin", "User")?;
        tracing::info!(user_id = %user.id, email = %email, "seeded admin account");
        Ok(true)
    }

    fn create_user(
        &self,
        email: &str,
        password: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<User, AuthError> {
        let id = Uuid::new_v4().to_string();
        let password_hash = self.hasher.hash(password)?;
        let new_user = NewUser {
            id: &id,
            email,
            password_hash: &password_hash,
            first_name,
            last_name,
            is_active: true,
            created_at: Utc::now().naive_utc(),
        };
        self.db.insert_user(&new_user).map_err(|err| {
            if err.is_unique_violation() {
                AuthError::EmailTaken(email.to_string())
            } else {
                AuthError::Repository(err)
            }
        })
    }

    fn respond(&self, user: &User, now: DateTime<Utc>) -> Result<AuthResponse, AuthError> {
        let (token, expires_at) = self.tokens.issue(user, now)?;
        Ok(AuthResponse {
            token,
            refresh_token: Uuid::new_v4().to_string(),
            expires_at,
            user: UserDto::from(user),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::fast_hasher;
    use chrono::Duration;

    fn service() -> AuthService {
        let tokens = TokenIssuer::new(b"test-key", "TodoApi", "TodoApp", Duration::hours(24));
        AuthService::new(Database::in_memory().unwrap(), fast_hasher(), tokens)
    }

    fn register_request() -> RegisterRequest {
        RegisterRequest {
            email: " Ada@Example.com ".into(),
            password: "Secret1".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
        }
    }

    fn login_request(password: &str) -> LoginRequest {
        LoginRequest {
            email: "ada@example.com".into(),
            password: password.into(),
        }
    }

    #[test]
    fn register_then_login() {
        let auth = service();
        let registered = auth.register(&register_request()).unwrap();
        assert_eq!(registered.user.email, "ada@example.com");
        assert!(registered.user.last_login_at.is_none());

        let logged_in = auth.login(&login_request("Secret1")).unwrap();
        assert_eq!(logged_in.user.id, registered.user.id);
        assert!(logged_in.user.last_login_at.is_some());
        assert_ne!(logged_in.refresh_token, registered.refresh_token);

        let claims = auth.tokens.verify(&logged_in.token).unwrap();
        assert_eq!(claims.sub, registered.user.id);
        assert_eq!(claims.exp, logged_in.expires_at.timestamp());
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let auth = service();
        auth.register(&register_request()).unwrap();
        let mut again = register_request();
        again.email = "ADA@example.com".into();
        assert!(matches!(auth.register(&again), Err(AuthError::EmailTaken(_))));
    }

    #[test]
    fn wrong_password_and_unknown_email_look_the_same() {
        let auth = service();
        auth.register(&register_request()).unwrap();
        assert!(matches!(
            auth.login(&login_request("Wrong1")),
            Err(AuthError::InvalidCredentials)
        ));
        let unknown = LoginRequest {
            email: "nobody@example.com".into(),
            password: "Secret1".into(),
        };
        assert!(matches!(auth.login(&unknown), Err(AuthError::InvalidCredentials)));
    }

    #[test]
    fn change_password_requires_current_password() {
        let auth = service();
        let user_id = auth.register(&register_request()).unwrap().user.id;

        let wrong = ChangePasswordRequest {
            current_password: "Nope123".into(),
            new_password: "Better2".into(),
        };
        assert!(matches!(
            auth.change_password(&user_id, &wrong),
            Err(AuthError::WrongPassword)
        ));

        let right = ChangePasswordRequest {
            current_password: "Secret1".into(),
            new_password: "Better2".into(),
        };
        auth.change_password(&user_id, &right).unwrap();
        assert!(auth.login(&login_request("Secret1")).is_err());
        assert!(auth.login(&login_request("Better2")).is_ok());
    }

    #[test]
    fn updates_profile() {
        let auth = service();
        let user_id = auth.register(&register_request()).unwrap().user.id;
        let request = UpdateProfileRequest {
            first_name: " Augusta ".into(),
            last_name: "King".into(),
        };
        auth.update_profile(&user_id, &request).unwrap();

        let profile = auth.profile(&user_id).unwrap();
        assert_eq!(profile.first_name, "Augusta");
        assert_eq!(profile.last_name, "King");
        assert!(matches!(
            auth.update_profile("missing", &request),
            Err(AuthError::UserNotFound(_))
        ));
    }

    #[test]
    fn seeds_admin_once() {
        let auth = service();
        assert!(auth.seed_admin("admin@todoapp.com", "Admin123!").unwrap());
        assert!(!auth.seed_admin("Admin@TodoApp.com", "Other123!").unwrap());

        let admin = LoginRequest {
            email: "admin@todoapp.com".into(),
            password: "Admin123!".into(),
        };
        let response = auth.login(&admin).unwrap();
        assert_eq!(response.user.first_name, "Admin");
    }
}
