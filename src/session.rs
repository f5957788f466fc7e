// src/session.rs

use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use actix_web::{
    body::{BoxBody, MessageBody},
    dev::{Payload, Service, ServiceRequest, ServiceResponse, Transform},
    http, Error, FromRequest, HttpMessage, HttpRequest, ResponseError,
};
use chrono::{Duration, Utc};
use futures::future::{ok, ready, Ready};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{TaskError, TaskResult};
use crate::models::normalize_email;

/// Claims carried by identity-provider tokens.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub email: String,
    pub exp: usize,
}

/// The authenticated principal, passed explicitly into every core call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub email: String,
}

impl Session {
    pub fn new(user_id: impl Into<String>, email: &str) -> Self {
        Session {
            user_id: user_id.into(),
            email: normalize_email(email),
        }
    }
}

/// Mints a token the way the identity provider does. Used by local tooling
/// and tests; production tokens come from the provider.
pub fn issue_token(session: &Session, secret: &str, ttl: Duration) -> TaskResult<String> {
    let claims = Claims {
        sub: session.user_id.clone(),
        email: session.email.clone(),
        exp: (Utc::now() + ttl).timestamp() as usize,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_ref()))
        .map_err(|e| TaskError::Backend(format!("Token encode error: {}", e)))
}

pub fn verify_token(token: &str, secret: &str) -> TaskResult<Session> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )
    .map_err(|e| {
        warn!("Token decode error: {}", e);
        TaskError::Unauthenticated
    })?;
    let claims = token_data.claims;
    if claims.sub.is_empty() || claims.email.trim().is_empty() {
        warn!("Token without subject or email rejected");
        return Err(TaskError::Unauthenticated);
    }
    Ok(Session::new(claims.sub, &claims.email))
}

/// Verifies `Authorization: Bearer <token>` and stores the resulting
/// [`Session`] as a request extension. Requests without the header pass
/// through; handlers that need a session reject them.
#[derive(Debug, Clone)]
pub struct Authentication {
    secret: Rc<String>,
}

impl Authentication {
    pub fn new(secret: impl Into<String>) -> Self {
        Authentication {
            secret: Rc::new(secret.into()),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for Authentication
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Transform = AuthMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AuthMiddleware {
            service,
            secret: self.secret.clone(),
        })
    }
}

pub struct AuthMiddleware<S> {
    service: S,
    secret: Rc<String>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let bearer = req
            .headers()
            .get(http::header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(|token| token.trim().to_string());

        if let Some(token) = bearer {
            match verify_token(&token, &self.secret) {
                Ok(session) => {
                    req.extensions_mut().insert(session);
                }
                Err(e) => {
                    let (req_parts, _payload) = req.into_parts();
                    let srv_resp = ServiceResponse::new(req_parts, e.error_response());
                    return Box::pin(async move { Ok(srv_resp) });
                }
            }
        }

        let fut = self.service.call(req);
        Box::pin(async move {
            let res = fut.await?;
            Ok(res.map_into_boxed_body())
        })
    }
}

impl FromRequest for Session {
    type Error = TaskError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<Session>()
                .cloned()
                .ok_or(TaskError::Unauthenticated),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn issued_tokens_verify_to_the_same_session() {
        let session = Session::new("alice", "Alice@Example.com");
        let token = issue_token(&session, SECRET, Duration::hours(1)).unwrap();
        let verified = verify_token(&token, SECRET).unwrap();
        assert_eq!(verified, session);
        assert_eq!(verified.email, "alice@example.com");
    }

    #[test]
    fn wrong_secret_is_unauthenticated() {
        let token = issue_token(&Session::new("alice", "alice@example.com"), SECRET, Duration::hours(1))
            .unwrap();
        assert!(matches!(
            verify_token(&token, "other"),
            Err(TaskError::Unauthenticated)
        ));
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let token = issue_token(
            &Session::new("alice", "alice@example.com"),
            SECRET,
            Duration::hours(-2),
        )
        .unwrap();
        assert!(matches!(
            verify_token(&token, SECRET),
            Err(TaskError::Unauthenticated)
        ));
    }

    #[test]
    fn tokens_without_email_are_rejected() {
        let token = issue_token(&Session::new("alice", ""), SECRET, Duration::hours(1)).unwrap();
        assert!(matches!(
            verify_token(&token, SECRET),
            Err(TaskError::Unauthenticated)
        ));
    }
}
