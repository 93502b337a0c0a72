use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Extension, Json, Router,
};
use db::models::{ChannelExport, Hit};
use tracing::error;

use crate::{
    error::{ApiResult, AppError},
    routes::parse_token,
    state::{AppState, RequestId},
};

const CSV_HEADER: [&str; 13] = [
    "id", "ts", "kind", "ip", "ua", "lat", "lon", "acc", "source", "ip_label", "place",
    "photo_url", "parent_id",
];

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/export/{file}", get(export))
        .with_state(state)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Csv,
}

/// `abc.json` → (`abc`, Json). Unknown extensions give `None`.
fn split_file(file: &str) -> Option<(&str, Format)> {
    let (token, ext) = file.rsplit_once('.')?;
    let format = match ext {
        "json" => Format::Json,
        "csv" => Format::Csv,
        _ => return None,
    };
    Some((token, format))
}

async fn export(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(file): Path<String>,
) -> ApiResult<Response> {
    let (token, format) = split_file(&file).ok_or_else(|| {
        AppError::NotFound("export format must be .json or .csv".to_string())
            .with_request_id(&request_id.0)
    })?;
    let token = parse_token(token, &request_id)?;
    let export = db::queries::channels::export(&state.store, &token).await;

    match format {
        Format::Json => {
            let disposition = format!("attachment; filename=\"{token}.json\"");
            Ok(([(header::CONTENT_DISPOSITION, disposition)], Json(export)).into_response())
        }
        Format::Csv => {
            let body = render_csv(&export).map_err(|err| {
                error!(request_id = %request_id.0, error = %err, "export: csv encoding failed");
                AppError::Internal.with_request_id(&request_id.0)
            })?;
            let disposition = format!("attachment; filename=\"{token}.csv\"");
            Ok((
                [
                    (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                body,
            )
                .into_response())
        }
    }
}

fn render_csv(export: &ChannelExport) -> anyhow::Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;
    for hit in &export.hits {
        writer.write_record(csv_row(hit))?;
    }
    writer
        .into_inner()
        .map_err(|err| anyhow::anyhow!("flushing csv buffer: {}", err.error()))
}

fn csv_row(hit: &Hit) -> [String; 13] {
    let number = |value: Option<f64>| value.map(|v| v.to_string()).unwrap_or_default();
    let text = |value: &Option<String>| value.clone().unwrap_or_default();
    [
        hit.id.clone(),
        hit.ts.clone(),
        hit.kind.to_string(),
        hit.ip.clone(),
        hit.ua.clone(),
        number(hit.coords.lat),
        number(hit.coords.lon),
        number(hit.coords.acc),
        hit.coords.source.to_string(),
        text(&hit.ip_label),
        text(&hit.place),
        text(&hit.photo_url),
        text(&hit.parent_id),
    ]
}
