//! Utilities for services building

use std::path::PathBuf;

use actix_web::http::header;
use actix_web::middleware::{self, DefaultHeaders};
use actix_web::web::{self, Data, ServiceConfig};


mod assets;
mod auth;
mod performance;
mod session;

use crate::model::Model;

/// Headers attached to every response
fn security_headers() -> DefaultHeaders {
    DefaultHeaders::new()
        .add((header::X_CONTENT_TYPE_OPTIONS, "nosniff"))
        .add((header::X_FRAME_OPTIONS, "SAMEORIGIN"))
        .add((header::X_XSS_PROTECTION, "1; mode=block"))
        .add((
            header::STRICT_TRANSPORT_SECURITY,
            "max-age=31536000; includeSubDomains",
        ))
}

/// Returns configuration function for the ActixWeb services
///
/// The assets scope catches every path, so it goes last.
pub fn configure(model: Model, assets: PathBuf) -> impl Fn(&mut ServiceConfig) + Clone {
    move |cfg: &mut ServiceConfig| {
        let auth = web::scope("/Auth")
            .wrap(security_headers())
            .service(auth::login)
            .service(auth::logout);

        let performance = web::scope("/InternPerformance")
            .wrap(middleware::from_fn(session::middleware))
            .wrap(security_headers())
            .service(performance::list)
            .service(performance::by_id)
            .service(performance::update)
            .service(performance::approve);

        let app = web::scope("")
            .wrap(middleware::from_fn(assets::cache_control))
            .wrap(security_headers())
            .service(assets::files(&assets));

        cfg.app_data(Data::new(model.clone()))
            .service(auth)
            .service(performance)
            .service(app);
    }
}
