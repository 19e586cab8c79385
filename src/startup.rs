use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use std::net::TcpListener;
use std::sync::Arc;

use crate::auth::AuthService;
use crate::configuration::AuthSettings;
use crate::cookies::CookieFactory;
use crate::logger::LoggerMiddleware;
use crate::middleware::AuthGuard;
use crate::routes::{health_check, login, logout, me, refresh, register};

pub fn run(
    listener: TcpListener,
    auth: Arc<AuthService>,
    settings: AuthSettings,
) -> Result<Server, std::io::Error> {
    let auth_data = web::Data::from(auth.clone());
    let settings_data = web::Data::new(settings.clone());

    let server = HttpServer::new(move || {
        App::new()
            .wrap(LoggerMiddleware)
            // Shared state
            .app_data(auth_data.clone())
            .app_data(settings_data.clone())
            // Public routes
            .route("/health_check", web::get().to(health_check))
            .route("/login", web::post().to(login))
            .route("/refresh", web::post().to(refresh))
            .route("/logout", web::post().to(logout))
            .route("/logout", web::delete().to(logout))
            .route("/accounts", web::post().to(register))
            // Protected routes
            .service(
                web::scope("/api")
                    .wrap(AuthGuard::new(
                        auth.clone(),
                        CookieFactory::new(settings.secure_cookies),
                        settings.login_path.clone(),
                    ))
                    .route("/me", web::get().to(me)),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
