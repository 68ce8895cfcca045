//! Directory listing for the preview mount.
//!
//! `ServeDir` answers files and directories holding an `index.html`; every
//! other request under the mount falls through to [`directory_listing`].

use axum::extract::{OriginalUri, State};
use axum::http::Uri;
use axum::response::Html;

use replica_infra::artifact::ListingEntry;

use crate::http::error::AppError;
use crate::state::AppState;

/// GET {preview}/{dir}/ - HTML index of one output directory.
///
/// Paths are taken verbatim; output file names never need percent-encoding.
pub async fn directory_listing(
    State(state): State<AppState>,
    OriginalUri(original): OriginalUri,
    uri: Uri,
) -> Result<Html<String>, AppError> {
    let relative = uri.path().trim_matches('/');
    let entries = state.store.list_dir(relative).await?;
    Ok(Html(render_listing(original.path(), &entries)))
}

fn render_listing(title: &str, entries: &[ListingEntry]) -> String {
    let title = escape_html(title);
    let mut html = format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>Index of {title}</title></head>\n<body>\n<h1>Index of {title}</h1>\n<ul>\n<li><a href=\"../\">../</a></li>\n"
    );
    for entry in entries {
        let name = escape_html(&entry.name);
        let slash = if entry.is_dir { "/" } else { "" };
        html.push_str(&format!("<li><a href=\"{name}{slash}\">{name}{slash}</a></li>\n"));
    }
    html.push_str("</ul>\n</body></html>\n");
    html
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
