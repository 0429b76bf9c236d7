use axum::{
    extract::{FromRequestParts, Path},
    http::request::Parts,
};

use crate::error::AppError;

/// Extractor para rutas /project/{org}/{repo}
///
/// The route is a wildcard so that empty components (`/project//repo`,
/// `/project/org/`) still reach the handler and are answered with 400 by the
/// cache layer instead of falling through to a 404.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPath {
    pub org: String,
    pub repo: String,
}

impl ProjectPath {
    /// Splits `org/repo`. Anything other than exactly two segments is `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut segments = raw.split('/');
        let org = segments.next()?;
        let repo = segments.next()?;
        if segments.next().is_some() {
            return None;
        }

        Some(Self {
            org: org.to_string(),
            repo: repo.to_string(),
        })
    }
}

impl<S> FromRequestParts<S> for ProjectPath
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;

        Self::parse(&raw).ok_or_else(|| AppError::NotFound {
            path: parts.uri.path().to_string(),
        })
    }
}
