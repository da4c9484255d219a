//! HTTP Server Module
//!
//! パイプラインを外部へ公開する薄いHTTP層。ルーティング、multipart受信、
//! ダウンロード応答の組み立て、エラーのHTTP表現への変換のみを担当し、
//! 業務的な判断はすべてパイプライン側が行います。
//!
//! ライフサイクルの4地点（アップロード受信、結合完了、応答送信、各エラー）
//! は`tracing`イベントとして観測できます。

use std::io::Cursor;
use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, DefaultBodyLimit, Multipart},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Local;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::builder::CrossJoinerBuilder;
use crate::error::XlsxCrossError;

/// アップロードフォームのHTML（コンパイル時に埋め込み）
const INDEX_HTML: &str = include_str!("../templates/index.html");

/// リクエストボディの上限（受付検査の入力サイズ上限と同じ2GB）
const MAX_UPLOAD_BYTES: usize = 2_147_483_648;

/// multipartのファイルフィールド名（元サービスのパラメータ名と同じ）
const UPLOAD_FIELD: &str = "excel";

/// エラー応答のボディ（FastAPIの`HTTPException`と同じワイヤ形式）
#[derive(Debug, Serialize)]
struct ErrorBody {
    detail: String,
}

/// サービスのルーターを構築
///
/// * `GET /` - アップロードフォーム
/// * `POST /uploader` - ワークブックの変換
pub fn router() -> Router {
    Router::new()
        .route("/", get(index))
        .route("/uploader", post(upload))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

/// ランディングページ
async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// ワークブックを受け取り、クロス結合した結果を返すハンドラ
///
/// 成功時は`Content-Disposition`付きのXLSXバイト列、クライアント起因の
/// エラー時は422と`{"detail": …}`、サーバ側の失敗時は500と汎用メッセージを
/// 返します。パイプラインは同期処理のため、ブロッキングワーカーで実行します。
async fn upload(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    mut multipart: Multipart,
) -> Response {
    let client_host = addr.ip().to_string();

    // 1. multipartからファイルフィールドを取り出す
    let mut payload: Option<Vec<u8>> = None;
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                if field.name() == Some(UPLOAD_FIELD) {
                    match field.bytes().await {
                        Ok(bytes) => {
                            payload = Some(bytes.to_vec());
                            break;
                        }
                        Err(e) => {
                            warn!(client = %client_host, error = %e, "failed to read upload body");
                            return unprocessable(format!("Failed to read field '{UPLOAD_FIELD}'."));
                        }
                    }
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!(client = %client_host, error = %e, "malformed multipart request");
                return unprocessable("Malformed multipart request.".to_string());
            }
        }
    }

    let Some(payload) = payload else {
        warn!(client = %client_host, "upload without '{}' field", UPLOAD_FIELD);
        return unprocessable(format!("Field '{UPLOAD_FIELD}' is required."));
    };

    info!(client = %client_host, bytes = payload.len(), "upload received");

    // 2. パイプラインをブロッキングワーカーで実行
    let joined = tokio::task::spawn_blocking(move || {
        let joiner = CrossJoinerBuilder::new().build()?;
        joiner.process(Cursor::new(payload))
    })
    .await;

    let output = match joined {
        Ok(Ok(output)) => output,
        Ok(Err(err)) => {
            return pipeline_error_response(&client_host, &err);
        }
        Err(join_err) => {
            error!(client = %client_host, error = %join_err, "pipeline task panicked");
            return internal_error();
        }
    };

    info!(client = %client_host, bytes = output.len(), "cross join completed");

    // 3. ダウンロード応答の組み立て（タイムスタンプは応答構築時点）
    let filename = download_filename(&client_host, Local::now().naive_local());
    info!(client = %client_host, filename = %filename, "response sent");

    (
        [
            (
                header::CONTENT_TYPE,
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet".to_string(),
            ),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        output,
    )
        .into_response()
}

/// 提案ファイル名を組み立てる
///
/// 形式: `{クライアント識別子}@{YYYY-MM-DD_HHMMSS}.xlsx`
fn download_filename(client_host: &str, at: chrono::NaiveDateTime) -> String {
    format!("{}@{}.xlsx", client_host, at.format("%Y-%m-%d_%H%M%S"))
}

/// パイプラインエラーをHTTP応答へ変換
///
/// クライアント起因のエラーは422と固定文言、それ以外は詳細を伏せた500。
fn pipeline_error_response(client_host: &str, err: &XlsxCrossError) -> Response {
    let (status, detail) = error_parts(err);
    if status.is_client_error() {
        warn!(client = %client_host, error = %err, "request rejected");
    } else {
        error!(client = %client_host, error = %err, "pipeline failed");
    }
    (status, Json(ErrorBody { detail })).into_response()
}

/// エラーからHTTPステータスとボディ文言を導出（純粋関数）
fn error_parts(err: &XlsxCrossError) -> (StatusCode, String) {
    match err.client_detail() {
        Some(detail) => (StatusCode::UNPROCESSABLE_ENTITY, detail.to_string()),
        None => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal Server Error".to_string(),
        ),
    }
}

fn unprocessable(detail: String) -> Response {
    (StatusCode::UNPROCESSABLE_ENTITY, Json(ErrorBody { detail })).into_response()
}

fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody {
            detail: "Internal Server Error".to_string(),
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_download_filename_format() {
        let at = NaiveDate::from_ymd_opt(2024, 3, 7)
            .unwrap()
            .and_hms_opt(9, 5, 42)
            .unwrap();
        assert_eq!(
            download_filename("192.168.0.10", at),
            "192.168.0.10@2024-03-07_090542.xlsx"
        );
    }

    #[test]
    fn test_error_parts_client_errors_are_422() {
        let (status, detail) = error_parts(&XlsxCrossError::TooFewSheets { count: 1 });
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(detail, "Слишком мало листов. Требуется минимум 2 листа.");

        let (status, detail) = error_parts(&XlsxCrossError::TooManyRows { product: 4_000_000 });
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            detail,
            "Слишком много строк. Максимум 3 миллиона после перемножения."
        );

        let (status, detail) = error_parts(&XlsxCrossError::MalformedInput("x".to_string()));
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(detail, "Неизвестный тип файла или повреждённый файл.");
    }

    #[test]
    fn test_error_parts_server_errors_are_generic_500() {
        let err: XlsxCrossError = std::io::Error::other("disk on fire").into();
        let (status, detail) = error_parts(&err);
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        // 内部詳細はクライアントへ出さない
        assert_eq!(detail, "Internal Server Error");
        assert!(!detail.contains("disk on fire"));
    }

    #[test]
    fn test_index_html_has_upload_form() {
        // フォームはパイプラインの入口と同じフィールド名を使う
        assert!(INDEX_HTML.contains("/uploader"));
        assert!(INDEX_HTML.contains("name=\"excel\""));
    }
}
