use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::error::AppError;
use crate::AppState;

pub const HOUSEHOLD_HEADER: &str = "x-household";

const MAX_KEY_LEN: usize = 64;

/// Partition key every sleep route is scoped to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Household(pub String);

impl Household {
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let key = raw.trim();
        let valid = !key.is_empty()
            && key.len() <= MAX_KEY_LEN
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

        if !valid {
            return Err(AppError::Validation(format!(
                "Household key must be 1-{MAX_KEY_LEN} characters of letters, digits, '-' or '_'"
            )));
        }
        Ok(Self(key.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Resolves the household from the `X-Household` header, falling back to
/// the configured default, and stores it as a request extension.
pub async fn resolve_household(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let household = match req.headers().get(HOUSEHOLD_HEADER) {
        Some(value) => {
            let raw = value
                .to_str()
                .map_err(|_| AppError::Validation("Household key must be ASCII".into()))?;
            Household::parse(raw)?
        }
        // Validated once in `Config::from_env`.
        None => Household(state.config.default_household.clone()),
    };

    tracing::debug!(household = %household.as_str(), path = %req.uri().path(), "Household resolved");

    req.extensions_mut().insert(household);
    Ok(next.run(req).await)
}
