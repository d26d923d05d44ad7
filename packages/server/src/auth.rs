//! Bearer token extraction for routes that modify records.

use std::future::{Ready, ready};

use actix_web::dev::Payload;
use actix_web::http::{StatusCode, header};
use actix_web::{FromRequest, HttpRequest, HttpResponse, ResponseError, web};
use preschool_auth::{AuthError, Claims, bearer_token};
use preschool_server_models::ApiError;
use thiserror::Error;

use crate::AppState;

/// Claims of a request that carried a valid access token.
///
/// Taking this as a handler argument rejects every other request with
/// `401 Unauthorized`.
#[derive(Debug, Clone)]
pub struct Authenticated(pub Claims);

/// Why a request was not authenticated.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct AuthRejection(String);

impl From<AuthError> for AuthRejection {
    fn from(e: AuthError) -> Self {
        Self(e.to_string())
    }
}

impl ResponseError for AuthRejection {
    fn status_code(&self) -> StatusCode {
        StatusCode::UNAUTHORIZED
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::Unauthorized()
            .insert_header((header::WWW_AUTHENTICATE, "Bearer"))
            .json(ApiError::new(self.0.clone()))
    }
}

fn authenticate(req: &HttpRequest) -> Result<Authenticated, AuthRejection> {
    let Some(state) = req.app_data::<web::Data<AppState>>() else {
        log::error!("No application state registered for {}", req.path());
        return Err(AuthRejection("authentication is unavailable".to_string()));
    };

    let value = req
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingHeader)?
        .to_str()
        .map_err(|_| AuthError::MalformedHeader)?;

    let claims = state
        .auth
        .verify_token(bearer_token(value)?)
        .inspect_err(|e| log::debug!("Rejected token on {} {}: {e:?}", req.method(), req.path()))?;

    Ok(Authenticated(claims))
}

impl FromRequest for Authenticated {
    type Error = AuthRejection;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}
