use flate2::Compression;
use flate2::write::GzEncoder;
use rocket::fs::NamedFile;
use rocket::http::{ContentType, Header, Status};
use rocket::request::{FromRequest, Outcome, Request};
use rocket::response::{self, Responder, Response};
use std::convert::Infallible;
use std::io::{Cursor, Write};
use std::sync::Arc;

/// Whether the client advertised gzip in `Accept-Encoding`.
#[derive(Debug, Clone, Copy)]
pub struct AcceptsGzip(pub bool);

/// True when some `Accept-Encoding` value lists `gzip` with a non-zero
/// quality.
fn accepts_gzip<'a>(values: impl IntoIterator<Item = &'a str>) -> bool {
    values
        .into_iter()
        .flat_map(|value| value.split(','))
        .any(|coding| {
            let mut params = coding.split(';');
            let is_gzip = params
                .next()
                .is_some_and(|name| name.trim().eq_ignore_ascii_case("gzip"));

            // An unparseable weight counts as the default of 1
            let quality = params
                .filter_map(|param| param.trim().strip_prefix("q="))
                .filter_map(|q| q.trim().parse::<f32>().ok())
                .next()
                .unwrap_or(1.0);

            is_gzip && quality > 0.0
        })
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AcceptsGzip {
    type Error = Infallible;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        Outcome::Success(AcceptsGzip(accepts_gzip(
            request.headers().get("Accept-Encoding"),
        )))
    }
}

/// A pre-rendered JSON body, gzip encoded when the client accepts it.
#[derive(Debug)]
pub struct JsonBody {
    pub body: Arc<Vec<u8>>,
    pub gzip: bool,
}

impl<'r> Responder<'r, 'static> for JsonBody {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        let mut builder = Response::build();
        builder.header(ContentType::JSON);

        if self.gzip {
            let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
            let compressed = encoder
                .write_all(&self.body)
                .and_then(|_| encoder.finish())
                .map_err(|_| Status::InternalServerError)?;
            builder
                .header(Header::new("Content-Encoding", "gzip"))
                .sized_body(compressed.len(), Cursor::new(compressed));
        } else {
            let body = self.body.as_ref().clone();
            builder.sized_body(body.len(), Cursor::new(body));
        }

        builder.ok()
    }
}

/// A stored file sent as an attachment under a chosen name.
#[derive(Debug)]
pub struct Download {
    pub file: NamedFile,
    pub filename: String,
}

impl<'r> Responder<'r, 'static> for Download {
    fn respond_to(self, request: &'r Request<'_>) -> response::Result<'static> {
        let disposition = format!("attachment; filename=\"{}\"", self.filename);
        Response::build_from(self.file.respond_to(request)?)
            .header(ContentType::Binary)
            .header(Header::new("Content-Disposition", disposition))
            .ok()
    }
}
