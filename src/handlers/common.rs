use axum::{extract::FromRequestParts, http::request::Parts};
use serde::Serialize;

use crate::{errors::ServiceError, PaginatedResponse};

pub const USER_EMAIL_HEADER: &str = "x-user-email";
pub const USER_NAME_HEADER: &str = "x-user-name";

/// Caller identity supplied by the fronting gateway.
///
/// Mutating endpoints take this extractor; a request without
/// `x-user-email` is rejected as unauthorized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrentUser {
    pub email: String,
    pub name: Option<String>,
}

impl CurrentUser {
    /// Display name, falling back to the e-mail address
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.email)
    }
}

fn header_value(parts: &Parts, name: &str) -> Option<String> {
    parts
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let email = header_value(parts, USER_EMAIL_HEADER).ok_or_else(|| {
            ServiceError::Unauthorized(format!("Missing {} header", USER_EMAIL_HEADER))
        })?;

        Ok(CurrentUser {
            email: email.to_lowercase(),
            name: header_value(parts, USER_NAME_HEADER),
        })
    }
}

/// Wraps a page of items with paging metadata
pub fn paginate<T>(items: Vec<T>, total: u64, page: u64, limit: u64) -> PaginatedResponse<T> {
    let total_pages = if limit == 0 {
        0
    } else {
        (total + limit - 1) / limit
    };
    PaginatedResponse {
        items,
        total,
        page,
        limit,
        total_pages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(request: Request<()>) -> Result<CurrentUser, ServiceError> {
        let (mut parts, _) = request.into_parts();
        CurrentUser::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn reads_identity_headers() {
        let request = Request::builder()
            .header(USER_EMAIL_HEADER, "Approver@Example.com")
            .header(USER_NAME_HEADER, "Pat Reyes")
            .body(())
            .unwrap();

        let user = extract(request).await.unwrap();
        assert_eq!(user.email, "approver@example.com");
        assert_eq!(user.display_name(), "Pat Reyes");
    }

    #[tokio::test]
    async fn missing_email_is_unauthorized() {
        let request = Request::builder()
            .header(USER_NAME_HEADER, "Pat Reyes")
            .body(())
            .unwrap();

        assert!(matches!(
            extract(request).await,
            Err(ServiceError::Unauthorized(_))
        ));
    }

    #[test]
    fn page_count_rounds_up() {
        let page = paginate(vec![1, 2], 41, 1, 20);
        assert_eq!(page.total_pages, 3);
        assert_eq!(paginate::<u8>(vec![], 0, 1, 20).total_pages, 0);
    }
}
