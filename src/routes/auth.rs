/// Authentication Routes
///
/// Login, token refresh, logout and account registration. Tokens are
/// returned both in the JSON body and as HTTP-only cookies.

use actix_web::{web, HttpRequest, HttpResponse, HttpResponseBuilder};
use serde::{Deserialize, Serialize};

use crate::auth::{AuthService, Claims, TokenPair};
use crate::configuration::AuthSettings;
use crate::cookies::{is_htmx_request, CookieFactory, HX_REDIRECT, REFRESH_TOKEN_COOKIE};
use crate::error::{AppError, AuthError, ValidationError};

/// Login request, accepted as JSON or form data
#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Refresh request; the token may instead come from the cookie
#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    #[serde(alias = "password-confirmation")]
    pub password_confirmation: Option<String>,
}

/// Token pair returned on login and refresh
#[derive(Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub refresh_expires_in: i64,
}

#[derive(Serialize)]
pub struct RegisterResponse {
    pub account_id: String,
}

#[derive(Serialize)]
pub struct MeResponse {
    pub account_id: String,
    pub expires_at: i64,
}

type JsonOrForm<T> = web::Either<web::Json<T>, web::Form<T>>;

fn into_inner<T>(body: JsonOrForm<T>) -> T {
    match body {
        web::Either::Left(json) => json.into_inner(),
        web::Either::Right(form) => form.into_inner(),
    }
}

fn token_response(
    mut builder: HttpResponseBuilder,
    pair: &TokenPair,
    now: i64,
    settings: &AuthSettings,
) -> HttpResponse {
    for cookie in CookieFactory::new(settings.secure_cookies).pair(pair, now) {
        builder.cookie(cookie);
    }
    builder.json(AuthResponse {
        access_token: pair.access.token.clone(),
        refresh_token: pair.refresh.token.clone(),
        token_type: "Bearer".to_string(),
        expires_in: pair.access.expires_at - now,
        refresh_expires_in: pair.refresh.expires_at - now,
    })
}

/// POST /login
///
/// # Errors
/// - 401: Invalid credentials (unknown username or wrong password, same body)
/// - 500: Hashing or signing failure
pub async fn login(
    body: JsonOrForm<LoginRequest>,
    auth: web::Data<AuthService>,
    settings: web::Data<AuthSettings>,
) -> Result<HttpResponse, AppError> {
    let LoginRequest { username, password } = into_inner(body);
    let pair = auth.login(&username, &password).await?;

    Ok(token_response(
        HttpResponse::Ok(),
        &pair,
        auth.now(),
        settings.get_ref(),
    ))
}

/// POST /refresh
///
/// Rotates the token pair. The refresh token is read from the body field
/// `refresh_token` or, failing that, from the `refresh_token` cookie.
///
/// # Errors
/// - 401: Missing, invalid, expired or wrong-kind token
pub async fn refresh(
    req: HttpRequest,
    body: Option<JsonOrForm<RefreshRequest>>,
    auth: web::Data<AuthService>,
    settings: web::Data<AuthSettings>,
) -> Result<HttpResponse, AppError> {
    let token = body
        .and_then(|b| into_inner(b).refresh_token)
        .filter(|t| !t.is_empty())
        .or_else(|| {
            req.cookie(REFRESH_TOKEN_COOKIE)
                .map(|c| c.value().to_string())
                .filter(|t| !t.is_empty())
        })
        .ok_or(AuthError::Unauthenticated)?;

    let pair = auth.refresh(&token)?;

    Ok(token_response(
        HttpResponse::Ok(),
        &pair,
        auth.now(),
        settings.get_ref(),
    ))
}

/// POST|DELETE /logout
///
/// Overwrites both token cookies with expired values. Tokens already held
/// elsewhere stay valid until they expire.
pub async fn logout(req: HttpRequest, settings: web::Data<AuthSettings>) -> HttpResponse {
    let mut builder = HttpResponse::Ok();
    for cookie in CookieFactory::new(settings.secure_cookies).cleared() {
        builder.cookie(cookie);
    }
    if is_htmx_request(req.headers()) {
        builder.insert_header((HX_REDIRECT, settings.login_path.clone()));
    }
    builder.json(serde_json::json!({ "message": "Logged out" }))
}

/// POST /accounts
///
/// # Errors
/// - 400: Invalid username, weak password or mismatched confirmation
/// - 409: Username already registered
pub async fn register(
    body: JsonOrForm<RegisterRequest>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let request = into_inner(body);

    if let Some(confirmation) = &request.password_confirmation {
        if confirmation != &request.password {
            return Err(ValidationError::PasswordMismatch.into());
        }
    }

    let account_id = auth.register(&request.username, &request.password).await?;

    Ok(HttpResponse::Created().json(RegisterResponse {
        account_id: account_id.to_string(),
    }))
}

/// GET /api/me
///
/// Requires a valid access token; claims are injected by `AuthGuard`.
pub async fn me(claims: web::ReqData<Claims>) -> HttpResponse {
    HttpResponse::Ok().json(MeResponse {
        account_id: claims.sub.clone(),
        expires_at: claims.exp,
    })
}
