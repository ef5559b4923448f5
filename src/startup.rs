use actix_web::dev::Server;
use actix_web::{middleware::Logger, web, App, HttpServer};
use std::net::TcpListener;

use crate::auth::TokenEngine;
use crate::middleware::JwtMiddleware;
use crate::routes::{get_current_user, health_check, login, refresh, register, revoke_token};

pub fn run(listener: TcpListener, engine: TokenEngine) -> Result<Server, std::io::Error> {
    let engine = web::Data::new(engine);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(engine.clone())
            .route("/health_check", web::get().to(health_check))
            .service(
                web::scope("/api/v1")
                    .service(
                        web::scope("/auth")
                            .route("/register", web::post().to(register))
                            .route("/login", web::post().to(login))
                            .route("/refresh", web::post().to(refresh))
                            .route("/revoke-token", web::delete().to(revoke_token)),
                    )
                    .service(
                        web::scope("/me")
                            .wrap(JwtMiddleware::new(engine.clone()))
                            .route("", web::get().to(get_current_user)),
                    ),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
