//! Built dashboard app hosting

use std::ffi::OsStr;
use std::path::Path;

use actix_files::{Files, NamedFile};
use actix_web::body::MessageBody;
use actix_web::dev::{ServiceRequest, ServiceResponse, fn_service};
use actix_web::http::header::{self, HeaderValue};
use actix_web::middleware::Next;
use actix_web::{Error, HttpResponse};

/// Extensions of the files which never change under the same name
const CACHEABLE: [&str; 11] = [
    "js", "css", "png", "jpg", "jpeg", "gif", "svg", "ico", "webp", "woff", "woff2",
];

const LONG_CACHE: &str = "public, max-age=86400";
const NO_CACHE: &str = "no-cache, no-store, must-revalidate";

fn extension(path: &str) -> Option<&str> {
    Path::new(path).extension().and_then(OsStr::to_str)
}

fn cacheable(path: &str) -> bool {
    extension(path).is_some_and(|ext| {
        CACHEABLE
            .iter()
            .any(|cacheable| cacheable.eq_ignore_ascii_case(ext))
    })
}

/// Static files of the app
///
/// Unmatched paths are client side routes and get the app shell, missing assets are 404.
pub fn files(dir: &Path) -> Files {
    let shell = dir.join("index.html");
    let fallback = fn_service(move |req: ServiceRequest| {
        let shell = shell.clone();
        async move {
            let (req, _) = req.into_parts();
            if cacheable(req.path()) {
                return Ok::<_, Error>(ServiceResponse::new(req, HttpResponse::NotFound().finish()));
            }

            let file = NamedFile::open_async(&shell).await?;
            let res = file.into_response(&req);
            Ok(ServiceResponse::new(req, res))
        }
    });

    Files::new("/", dir)
        .index_file("index.html")
        .default_handler(fallback)
}

/// Sets the caching policy, long for assets and none for the app shell
pub async fn cache_control<B>(
    req: ServiceRequest,
    next: Next<B>,
) -> Result<ServiceResponse<B>, Error>
where
    B: MessageBody + 'static,
{
    let cacheable = cacheable(req.path());
    let mut res = next.call(req).await?;

    let long = cacheable && res.status().is_success();
    let headers = res.headers_mut();
    if long {
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(LONG_CACHE));
    } else {
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(NO_CACHE));
        headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
        headers.insert(header::EXPIRES, HeaderValue::from_static("0"));
    }
    Ok(res)
}
