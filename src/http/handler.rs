//! Greeting handler.
//!
//! Every request, whatever its method, headers, query or body, is answered
//! with a greeting built from the request path alone.

use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::http::{Method, Uri};
use axum::response::Response;
use axum::Router;

use crate::http::response::plain_text;

/// Router dispatching every request to [`hello`].
pub fn router() -> Router {
    Router::new().fallback(hello)
}

/// Percent-decoded path of a request URI, without the query.
///
/// `+` is kept as is. Malformed escapes are left untouched and invalid UTF-8
/// is replaced with U+FFFD.
pub fn decoded_path(uri: &Uri) -> String {
    let bytes = urlencoding::decode_binary(uri.path().as_bytes());
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Build the greeting for a decoded request path.
///
/// Exactly one leading `/` is stripped; the rest is used verbatim, so
/// `/John/Doe` greets `John/Doe` and `//` greets `/`.
pub fn greeting(path: &str) -> String {
    let name = path.strip_prefix('/').unwrap_or(path);
    if name.is_empty() {
        "Hello World!".to_string()
    } else {
        format!("Hello, {name}!")
    }
}

/// Log the request and answer with its greeting.
pub async fn hello(
    ConnectInfo(remote_addr): ConnectInfo<SocketAddr>,
    method: Method,
    uri: Uri,
) -> Response {
    let path = decoded_path(&uri);
    tracing::info!(
        method = %method,
        path = %path,
        remote_addr = %remote_addr,
        "Handling request"
    );

    plain_text(greeting(&path))
}
