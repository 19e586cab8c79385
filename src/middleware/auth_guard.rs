/// Authentication guard for protected routes
///
/// Reads the access token from the `access_token` cookie (or an
/// `Authorization: Bearer` header), validates it and injects the claims into
/// request extensions. Handlers read them back with `web::ReqData<Claims>`.

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{self, HeaderMap},
    Error, HttpMessage, HttpResponse,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;
use std::sync::Arc;

use crate::auth::AuthService;
use crate::cookies::{
    is_browser_request, is_htmx_request, CookieFactory, ACCESS_TOKEN_COOKIE, HX_REDIRECT,
};
use crate::error::{AuthError, ErrorResponse, UNAUTHORIZED_CODE, UNAUTHORIZED_MESSAGE};

/// Guard middleware. Wrap any scope that requires a signed-in account.
#[derive(Clone)]
pub struct AuthGuard {
    auth: Arc<AuthService>,
    cookies: CookieFactory,
    login_path: String,
}

impl AuthGuard {
    pub fn new(
        auth: Arc<AuthService>,
        cookies: CookieFactory,
        login_path: impl Into<String>,
    ) -> Self {
        Self {
            auth,
            cookies,
            login_path: login_path.into(),
        }
    }

    /// Every failure looks the same to the client; the precise kind only
    /// reaches the log.
    fn rejection(&self, headers: &HeaderMap, path: &str, error: &AuthError) -> HttpResponse {
        let request_id = uuid::Uuid::new_v4().to_string();
        if error.is_timing() || *error == AuthError::Unauthenticated {
            tracing::info!(
                request_id = %request_id,
                path = %path,
                kind = error.code(),
                "Request without a current token"
            );
        } else {
            tracing::warn!(
                request_id = %request_id,
                path = %path,
                kind = error.code(),
                error = %error,
                "Request rejected by auth guard"
            );
        }

        if is_browser_request(headers) {
            let mut builder = HttpResponse::Found();
            builder.insert_header((header::LOCATION, self.login_path.clone()));
            if is_htmx_request(headers) {
                builder.insert_header((HX_REDIRECT, self.login_path.clone()));
            }
            for cookie in self.cookies.cleared() {
                builder.cookie(cookie);
            }
            return builder.finish();
        }

        HttpResponse::Unauthorized().json(ErrorResponse::new(
            request_id,
            UNAUTHORIZED_MESSAGE.to_string(),
            UNAUTHORIZED_CODE.to_string(),
            401,
        ))
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthGuard
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthGuardService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(AuthGuardService {
            service: Rc::new(service),
            guard: self.clone(),
        }))
    }
}

pub struct AuthGuardService<S> {
    service: Rc<S>,
    guard: AuthGuard,
}

impl<S, B> Service<ServiceRequest> for AuthGuardService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let token = req
            .cookie(ACCESS_TOKEN_COOKIE)
            .map(|c| c.value().to_string())
            .filter(|v| !v.is_empty())
            .or_else(|| bearer_token(req.headers()));

        let outcome = match token {
            None => Err(AuthError::Unauthenticated),
            Some(token) => self.guard.auth.authenticate(&token),
        };

        match outcome {
            Ok(claims) => {
                tracing::debug!(
                    account_id = %claims.sub,
                    path = %req.path(),
                    "Access token accepted"
                );
                req.extensions_mut().insert(claims);

                let service = self.service.clone();
                Box::pin(async move {
                    let res = service.call(req).await?;
                    Ok(res.map_into_left_body())
                })
            }
            Err(e) => {
                let response = self.guard.rejection(req.headers(), req.path(), &e);
                let res = req.into_response(response).map_into_right_body();
                Box::pin(async move { Ok(res) })
            }
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}
