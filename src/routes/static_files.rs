use include_dir::{Dir, include_dir};
use rocket::http::ContentType;
use rocket::response::content::RawHtml;
use rocket::{Route, get, routes};
use std::path::PathBuf;

// Front end build output, embedded at compile time
static ASSETS: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/web/ribograph/dist");

fn index_html() -> &'static [u8] {
    ASSETS
        .get_file("index.html")
        .map_or(b"Not found".as_slice(), |f| f.contents())
}

#[get("/")]
pub fn index() -> RawHtml<&'static [u8]> {
    RawHtml(index_html())
}

/// Serves an embedded asset, or the SPA shell for client-side routes.
/// Unknown API paths stay 404.
#[get("/<file..>", rank = 10)]
pub fn static_files(file: PathBuf) -> Option<(ContentType, &'static [u8])> {
    if file.starts_with("api") {
        return None;
    }

    let path = file.display().to_string();
    if let Some(asset) = ASSETS.get_file(&path) {
        let content_type = file
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(ContentType::from_extension)
            .unwrap_or(ContentType::Binary);
        return Some((content_type, asset.contents()));
    }

    Some((ContentType::HTML, index_html()))
}

pub fn get_static_routes() -> Vec<Route> {
    routes![index, static_files]
}
