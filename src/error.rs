//! Error Types Module
//!
//! クレート全体で使用する構造化エラー型を定義するモジュール。
//! `thiserror`を使用して、エラーの自動変換とメッセージフォーマットを実現する。

use thiserror::Error;

/// xlsxcrossクレート全体で使用するエラー型
///
/// このエラー型は、ワークブックの受付検査、シート抽出、クロス結合、
/// 出力ワークブックの生成中に発生するすべてのエラーを統一的に扱うために
/// 使用されます。
///
/// # エラーの分類
///
/// クライアント起因（入力を直さない限り再試行不可）:
///
/// - `MalformedInput`: 入力バイト列がワークブックとして解釈できない
/// - `TooManyRows`: 行数の積が上限（300万行）を超過
/// - `TooFewSheets`: シート数が下限（2枚）未満
///
/// サーバ側（クライアントには詳細を開示しない）:
///
/// - `Io`: I/O操作中に発生したエラー
/// - `Serialization`: 出力ワークブックの生成に失敗
/// - `Config`: ビルダー設定の検証に失敗（呼び出し側のプログラミングエラー）
#[derive(Error, Debug)]
pub enum XlsxCrossError {
    /// I/O操作中に発生したエラー
    ///
    /// `#[from]`属性により、`std::io::Error`から自動的に変換されます。
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 入力バイト列がワークブックとして解釈できないエラー
    ///
    /// ZIPコンテナでない、`xl/workbook.xml`が欠落している、シート内部の
    /// 構造が抽出できないなどの場合に発生します。メッセージには診断用の
    /// 詳細を含みますが、クライアントへは固定文言のみを返します
    /// （[`XlsxCrossError::client_detail`]を参照）。
    #[error("malformed workbook: {0}")]
    MalformedInput(String),

    /// 行数の積が上限を超過したエラー
    ///
    /// 受付検査が各シートの生の最大行番号（ヘッダー行を含む）の積を計算し、
    /// 上限を超えた場合に発生します。高コストな全セル読み込みの前に
    /// 検出されます。
    #[error("projected row product {product} exceeds the admission ceiling")]
    TooManyRows {
        /// 全シートの最大行番号の積
        product: u64,
    },

    /// シート数が下限未満のエラー
    #[error("workbook has {count} sheet(s), at least 2 required")]
    TooFewSheets {
        /// 入力ワークブックのシート数
        count: usize,
    },

    /// 出力ワークブックの生成に失敗したエラー
    ///
    /// `#[from]`属性により、`rust_xlsxwriter::XlsxError`から自動的に
    /// 変換されます。サーバ側のエラーであり、クライアントには汎用的な
    /// 失敗のみを通知します。
    #[error("failed to serialize output workbook: {0}")]
    Serialization(#[from] rust_xlsxwriter::XlsxError),

    /// ビルダー設定の検証に失敗したエラー
    #[error("Configuration error: {0}")]
    Config(String),
}

impl XlsxCrossError {
    /// クライアントへ返す固定文言を取得
    ///
    /// 3種類のクライアント起因エラーについては、元のサービスと同一の
    /// ロシア語の文言を契約として維持します。サーバ側のエラーでは`None`を
    /// 返し、呼び出し側（HTTP層）が汎用メッセージに差し替えます。
    ///
    /// # 戻り値
    ///
    /// * `Some(&str)` - クライアント起因エラーの場合、固定文言
    /// * `None` - サーバ側エラーの場合
    pub fn client_detail(&self) -> Option<&'static str> {
        match self {
            XlsxCrossError::MalformedInput(_) => {
                Some("Неизвестный тип файла или повреждённый файл.")
            }
            XlsxCrossError::TooManyRows { .. } => {
                Some("Слишком много строк. Максимум 3 миллиона после перемножения.")
            }
            XlsxCrossError::TooFewSheets { .. } => {
                Some("Слишком мало листов. Требуется минимум 2 листа.")
            }
            _ => None,
        }
    }

    /// クライアント起因のエラーかどうかを判定
    pub fn is_client_error(&self) -> bool {
        self.client_detail().is_some()
    }
}

/// calamineの解析エラーを`MalformedInput`へ変換
///
/// calamine由来のエラーはすべて「入力が壊れている」ことを意味するため、
/// 仕様上のエラー分類に合わせて変換します（`#[from]`による自動変換は
/// あえて使いません）。
impl From<calamine::Error> for XlsxCrossError {
    fn from(err: calamine::Error) -> Self {
        XlsxCrossError::MalformedInput(err.to_string())
    }
}
