use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap, StatusCode},
};

use crate::model::{Id, UserContext};

pub const USER_ID_HEADER: &str = "x-user-id";

/// Reads the requesting user from `X-User-Id`. Requests without the header
/// run as the anonymous user; a malformed id is rejected.
#[async_trait]
impl<S> FromRequestParts<S> for UserContext
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match user_id_from_headers(&parts.headers) {
            Ok(Some(user_id)) => Ok(UserContext::new(user_id)),
            Ok(None) => Ok(UserContext::anonymous()),
            Err(value) => Err((
                StatusCode::BAD_REQUEST,
                format!("Invalid {} header: {}", USER_ID_HEADER, value),
            )),
        }
    }
}

fn user_id_from_headers(headers: &HeaderMap) -> Result<Option<Id>, String> {
    let Some(value) = headers.get(USER_ID_HEADER) else {
        return Ok(None);
    };
    let value = value.to_str().map_err(|e| e.to_string())?;
    value
        .trim()
        .parse::<Id>()
        .map(Some)
        .map_err(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderName, HeaderValue};

    #[test]
    fn test_user_id_from_headers() {
        let mut headers = HeaderMap::new();
        assert_eq!(user_id_from_headers(&headers), Ok(None));

        headers.insert(
            HeaderName::from_static(USER_ID_HEADER),
            HeaderValue::from_static("7"),
        );
        assert_eq!(user_id_from_headers(&headers), Ok(Some(7)));

        headers.insert(
            HeaderName::from_static(USER_ID_HEADER),
            HeaderValue::from_static("admin"),
        );
        assert_eq!(user_id_from_headers(&headers), Err("admin".to_string()));
    }
}
