use std::future::Future;
use std::pin::Pin;

use actix_web::dev::Payload;
use actix_web::http::header::AUTHORIZATION;
use actix_web::{web, FromRequest, HttpRequest};

use crate::domain::user::{Role, User};
use crate::errors::AppError;
use crate::state::AppState;

use super::blocking;

type ExtractFuture<T> = Pin<Box<dyn Future<Output = Result<T, AppError>>>>;

fn bearer_token(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// A caller holding a valid token for an active account.
///
/// The account is re-read on every request, so deactivation and role
/// changes apply to tokens that were issued earlier.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl FromRequest for AuthenticatedUser {
    type Error = AppError;
    type Future = ExtractFuture<Self>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let state = req.app_data::<web::Data<AppState>>().cloned();
        let token = bearer_token(req);
        Box::pin(async move {
            let state =
                state.ok_or_else(|| AppError::Internal("application state missing".to_string()))?;
            let token =
                token.ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_string()))?;
            let user = blocking(move || state.auth.authenticate(&token)).await?;
            Ok(AuthenticatedUser(user))
        })
    }
}

#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

impl FromRequest for AdminUser {
    type Error = AppError;
    type Future = ExtractFuture<Self>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let authenticated = AuthenticatedUser::from_request(req, payload);
        Box::pin(async move {
            let AuthenticatedUser(user) = authenticated.await?;
            user.actor().require_role(Role::Admin)?;
            Ok(AdminUser(user))
        })
    }
}
