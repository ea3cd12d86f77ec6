use axum::{
    Form, Router,
    extract::{
        Query, State,
        rejection::{FormRejection, QueryRejection},
    },
    http::{HeaderMap, Method, StatusCode, Uri, header},
    response::{IntoResponse, Redirect, Response},
    routing::any,
};
use minijinja::{Environment, context};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::fs::{FileHandle, FileInfo, FileStore, FsError};

use super::{
    helpers::{self, ByteRange, Resolved},
    state::AppState,
};

pub fn build_router<S: FileStore + 'static>(state: AppState<S>) -> Router {
    Router::new()
        .route("/post", any(post_redirect::<S>))
        .fallback(static_file::<S>)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

type FormPairs = Vec<(String, String)>;

async fn post_redirect<S: FileStore + 'static>(
    State(state): State<AppState<S>>,
    method: Method,
    query: Result<Query<FormPairs>, QueryRejection>,
    body: Result<Form<FormPairs>, FormRejection>,
) -> Redirect {
    let mut form = FormPairs::new();
    match query {
        Ok(Query(pairs)) => form.extend(pairs),
        Err(err) => tracing::debug!(%err, "ignoring malformed query"),
    }
    // For GET and HEAD the form extractor reads the query string again.
    if method != Method::GET && method != Method::HEAD {
        match body {
            Ok(Form(pairs)) => form.extend(pairs),
            Err(err) => tracing::debug!(%err, "ignoring form body"),
        }
    }
    tracing::info!(?form, "form submission");
    Redirect::to(&state.redirect_to)
}

async fn static_file<S: FileStore + 'static>(
    State(state): State<AppState<S>>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let Ok(path) = helpers::logical_path(uri.path()) else {
        return (StatusCode::BAD_REQUEST, "400 bad request").into_response();
    };
    let store = state.store.clone();
    let lookup = path.clone();
    let resolved =
        tokio::task::spawn_blocking(move || helpers::resolve(store.as_ref(), &lookup)).await;
    // Redirect targets are relative to the request path, so they can never
    // name another host.
    match resolved {
        Ok(Ok(Resolved::File { handle, info })) => file_response(handle, info, &headers),
        Ok(Ok(Resolved::Listing(entries))) => listing_response(&path, &entries),
        Ok(Ok(Resolved::AddSlash)) => moved(format!(
            "{}/",
            urlencoding::encode(helpers::base_name(&path))
        )),
        Ok(Ok(Resolved::StripSlash)) => moved(format!(
            "../{}",
            urlencoding::encode(helpers::base_name(&path))
        )),
        Ok(Err(err)) => error_response(&path, err),
        Err(err) => {
            tracing::error!("resolve task join error: {}", err);
            internal_error()
        }
    }
}

fn content_type(name: &str) -> String {
    let mime = mime_guess::from_path(name).first_or_octet_stream();
    if mime.type_() == mime_guess::mime::TEXT {
        format!("{mime}; charset=utf-8")
    } else {
        mime.to_string()
    }
}

fn file_response<H: FileHandle + 'static>(
    handle: H,
    info: FileInfo,
    headers: &HeaderMap,
) -> Response {
    let last_modified = info.modified.map(helpers::http_date);
    if let Some(modified) = info.modified
        && let Some(since) = headers
            .get(header::IF_MODIFIED_SINCE)
            .and_then(|v| v.to_str().ok())
        && helpers::not_modified_since(modified, since)
    {
        let mut res = StatusCode::NOT_MODIFIED.into_response();
        if let Some(lm) = last_modified
            && let Ok(value) = lm.parse()
        {
            res.headers_mut().insert(header::LAST_MODIFIED, value);
        }
        return res;
    }

    let range = headers.get(header::RANGE).and_then(|v| v.to_str().ok());
    let mut builder = axum::http::Response::builder()
        .header(header::CONTENT_TYPE, content_type(&info.name))
        .header(header::ACCEPT_RANGES, "bytes");
    if let Some(lm) = last_modified {
        builder = builder.header(header::LAST_MODIFIED, lm);
    }
    let (status, start, len) = match helpers::byte_range(range, info.len) {
        ByteRange::Full => (StatusCode::OK, 0, info.len),
        ByteRange::Partial { start, end } => {
            builder = builder.header(
                header::CONTENT_RANGE,
                format!("bytes {start}-{end}/{}", info.len),
            );
            (StatusCode::PARTIAL_CONTENT, start, end - start + 1)
        }
        ByteRange::Unsatisfiable => {
            return (
                StatusCode::RANGE_NOT_SATISFIABLE,
                [(header::CONTENT_RANGE, format!("bytes */{}", info.len))],
            )
                .into_response();
        }
    };
    let body = helpers::stream_body(handle, start, len);
    match builder
        .status(status)
        .header(header::CONTENT_LENGTH, len)
        .body(body)
    {
        Ok(res) => res,
        Err(err) => {
            tracing::error!(error = %err, "failed to build file response");
            internal_error()
        }
    }
}

#[derive(Serialize)]
struct TplEntry<'a> {
    name: &'a str,
    /// Percent-encoded, so it can be emitted unescaped.
    href: String,
    is_dir: bool,
}

fn listing_response(path: &str, entries: &[FileInfo]) -> Response {
    let entries: Vec<TplEntry> = entries
        .iter()
        .map(|e| TplEntry {
            name: &e.name,
            href: urlencoding::encode(&e.name).into_owned(),
            is_dir: e.is_dir,
        })
        .collect();
    let mut env = Environment::new();
    if let Err(e) = env.add_template("listing.html", include_str!("../static/listing.html")) {
        tracing::error!("template error: {}", e);
        return internal_error();
    }
    let rendered = env
        .get_template("listing.html")
        .and_then(|tmpl| tmpl.render(context!(path => path, entries => entries)));
    match rendered {
        Ok(body) => (
            [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("render error: {}", e);
            internal_error()
        }
    }
}

fn moved(location: String) -> Response {
    (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, location)]).into_response()
}

fn error_response(path: &str, err: FsError) -> Response {
    match err {
        FsError::PermissionDenied => (StatusCode::FORBIDDEN, "403 Forbidden").into_response(),
        FsError::NotFound => (StatusCode::NOT_FOUND, "404 page not found").into_response(),
        err => {
            tracing::error!(path, error = %err, "failed to serve path");
            internal_error()
        }
    }
}

fn internal_error() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "500 Internal Server Error").into_response()
}
