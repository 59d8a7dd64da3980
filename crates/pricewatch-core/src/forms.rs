//! Input checks the front end runs before it talks to the backend.
//!
//! None of these touch the session: a form that fails validation never
//! issues a request and never changes session state.

use thiserror::Error;

use crate::auth::{AuthBackend, AuthOutcome, SessionManager, TokenStore};
use crate::models::TrackRequest;

/// Shortest password the signup form accepts
pub const MIN_PASSWORD_LENGTH: usize = 6;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("Password must be at least 6 characters long")]
    PasswordTooShort,

    #[error("Desired price must be a positive number")]
    InvalidPrice,

    #[error("Please enter a valid email address")]
    InvalidEmail,
}

fn require(value: &str, field: &'static str) -> Result<(), FormError> {
    if value.trim().is_empty() {
        Err(FormError::Missing(field))
    } else {
        Ok(())
    }
}

fn check_email(value: &str) -> Result<(), FormError> {
    require(value, "Email")?;
    match value.trim().split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(FormError::InvalidEmail),
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> Result<(), FormError> {
        require(&self.email, "Email")?;
        require(&self.password, "Password")
    }
}

#[derive(Debug, Clone, Default)]
pub struct SignupForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl SignupForm {
    /// Confirmation is checked before length, so a mismatch wins.
    pub fn validate(&self) -> Result<(), FormError> {
        if self.password != self.confirm_password {
            return Err(FormError::PasswordMismatch);
        }
        if self.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(FormError::PasswordTooShort);
        }
        Ok(())
    }
}

/// Validate the form, then sign up. A form error comes back as a failed
/// outcome with no request issued.
pub async fn submit_signup<B: AuthBackend, S: TokenStore>(
    session: &mut SessionManager<B, S>,
    form: &SignupForm,
) -> AuthOutcome {
    if let Err(e) = form.validate() {
        return AuthOutcome::failure(e.to_string());
    }
    session.signup(&form.name, &form.email, &form.password).await
}

/// Validate the form, then log in.
pub async fn submit_login<B: AuthBackend, S: TokenStore>(
    session: &mut SessionManager<B, S>,
    form: &LoginForm,
) -> AuthOutcome {
    if let Err(e) = form.validate() {
        return AuthOutcome::failure(e.to_string());
    }
    session.login(&form.email, &form.password).await
}

#[derive(Debug, Clone, Default)]
pub struct TrackForm {
    pub url: String,
    pub desired_price: String,
    pub user_email: String,
}

impl TrackForm {
    pub fn validate(&self) -> Result<TrackRequest, FormError> {
        require(&self.url, "Product URL")?;
        require(&self.desired_price, "Desired price")?;
        let desired_price: f64 = self
            .desired_price
            .trim()
            .parse()
            .map_err(|_| FormError::InvalidPrice)?;
        if !desired_price.is_finite() || desired_price <= 0.0 {
            return Err(FormError::InvalidPrice);
        }
        check_email(&self.user_email)?;

        Ok(TrackRequest {
            url: self.url.trim().to_string(),
            desired_price,
            user_email: self.user_email.trim().to_string(),
        })
    }
}
