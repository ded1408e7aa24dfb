//! Bearer-token request guard.

use crate::AppState;
use crate::error::ApiError;
use log::debug;
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome, Request};

/// User resolved from the `Authorization: Bearer <token>` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: String,
}

fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthenticatedUser {
    type Error = ApiError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let Some(state) = request.rocket().state::<AppState>() else {
            return Outcome::Error((
                Status::InternalServerError,
                ApiError::Internal("app state not managed".to_string()),
            ));
        };
        let user = request
            .headers()
            .get_one("Authorization")
            .and_then(bearer_token)
            .and_then(|token| state.auth.user_for_token(token));
        match user {
            Some(user_id) => Outcome::Success(AuthenticatedUser {
                user_id: user_id.to_string(),
            }),
            None => {
                debug!("rejected request without valid token (uri={})", request.uri());
                Outcome::Error((Status::Unauthorized, ApiError::Unauthorized))
            }
        }
    }
}
