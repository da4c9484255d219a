//! Builder Module
//!
//! Fluent Builder APIを提供し、`CrossJoiner`インスタンスを段階的に構築する。
//! `CrossJoiner`は受付検査 → 抽出 → クロス結合 → ウィンドウ分割 → 直列化の
//! パイプライン全体を1リクエスト分まとめて実行するファサードです。

use std::io::{Cursor, Read, Seek};

use calamine::{open_workbook_auto_from_rs, Reader, Sheets};
use tracing::debug;

use crate::error::XlsxCrossError;
use crate::guard::AdmissionLimits;
use crate::types::Relation;
use crate::{extract, guard, join, writer};

/// Excelシート1枚の物理的な最大行数（ヘッダー行を含む）
const EXCEL_SHEET_MAX_ROWS: usize = 1_048_576;

/// パイプラインの設定を保持する内部構造体
#[derive(Debug, Clone)]
pub(crate) struct JoinConfig {
    /// 受付検査の上限（行数積）
    pub max_row_product: u64,

    /// 出力シートあたりの最大データ行数
    pub rows_per_sheet: usize,
}

impl Default for JoinConfig {
    fn default() -> Self {
        Self {
            max_row_product: crate::MAX_ROW_PRODUCT,
            rows_per_sheet: crate::ROWS_PER_SHEET,
        }
    }
}

/// Fluent Builder APIを提供する構造体
///
/// `CrossJoiner`インスタンスを段階的に構築するためのビルダーです。
/// デフォルト値は外部契約の定数（上限300万行・シートあたり100万行）で、
/// テストなどで必要な場合のみオーバーライドします。
///
/// # 使用例
///
/// ```rust
/// use xlsxcross::CrossJoinerBuilder;
///
/// # fn main() -> Result<(), xlsxcross::XlsxCrossError> {
/// let joiner = CrossJoinerBuilder::new().build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct CrossJoinerBuilder {
    /// 内部設定（構築中）
    config: JoinConfig,
}

impl CrossJoinerBuilder {
    /// デフォルト設定を持つビルダーインスタンスを生成する
    ///
    /// # デフォルト設定
    ///
    /// - 行数積の上限: 3,000,000
    /// - 出力シートあたりの行数: 1,000,000
    pub fn new() -> Self {
        Self::default()
    }

    /// 受付検査の行数積の上限を指定する
    ///
    /// # 引数
    ///
    /// * `ceiling: u64`: 全シートの生の最大行番号の積の上限
    pub fn with_max_row_product(mut self, ceiling: u64) -> Self {
        self.config.max_row_product = ceiling;
        self
    }

    /// 出力シートあたりの最大データ行数を指定する
    ///
    /// # 引数
    ///
    /// * `rows: usize`: ウィンドウサイズ（1以上）
    pub fn with_rows_per_sheet(mut self, rows: usize) -> Self {
        self.config.rows_per_sheet = rows;
        self
    }

    /// 設定を検証し、`CrossJoiner`インスタンスを生成する
    ///
    /// # 戻り値
    ///
    /// * `Ok(CrossJoiner)`: 設定が有効な場合
    /// * `Err(XlsxCrossError::Config)`: 設定が無効な場合
    ///
    /// # 発生し得るエラー
    ///
    /// * 行数積の上限が0
    /// * ウィンドウサイズが0、またはヘッダー行を足すとExcelの物理上限
    ///   （1,048,576行）を超える
    pub fn build(self) -> Result<CrossJoiner, XlsxCrossError> {
        if self.config.max_row_product == 0 {
            return Err(XlsxCrossError::Config(
                "max_row_product must be at least 1".to_string(),
            ));
        }

        if self.config.rows_per_sheet == 0 {
            return Err(XlsxCrossError::Config(
                "rows_per_sheet must be at least 1".to_string(),
            ));
        }

        // ヘッダー行の分を含めてExcelの物理上限に収まること
        if self.config.rows_per_sheet + 1 > EXCEL_SHEET_MAX_ROWS {
            return Err(XlsxCrossError::Config(format!(
                "rows_per_sheet {} does not fit an Excel sheet (max {} incl. header)",
                self.config.rows_per_sheet, EXCEL_SHEET_MAX_ROWS
            )));
        }

        Ok(CrossJoiner {
            config: self.config,
        })
    }
}

/// クロス結合パイプラインのファサード
///
/// アップロードされたワークブックのバイト列を受け取り、全シートの
/// クロス結合を計算し、シート分割済みの出力ワークブックのバイト列を
/// 返します。1回の呼び出しが1リクエストに対応し、呼び出し間で共有する
/// 状態はありません。処理は同期・単一スレッドで行われます。
///
/// # 使用例
///
/// ```rust,no_run
/// use std::fs::File;
/// use xlsxcross::CrossJoinerBuilder;
///
/// # fn main() -> Result<(), xlsxcross::XlsxCrossError> {
/// let joiner = CrossJoinerBuilder::new().build()?;
/// let input = File::open("workbook.xlsx")?;
/// let output: Vec<u8> = joiner.process(input)?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct CrossJoiner {
    /// パイプライン設定
    config: JoinConfig,
}

impl CrossJoiner {
    /// ワークブックを読み込み、クロス結合した出力ワークブックを生成
    ///
    /// # 処理フロー
    ///
    /// 1. 入力をメモリへ読み込む
    /// 2. 受付検査（コンテナ構造・行数積の事前チェック）
    /// 3. 全読み込み用にワークブックを開き、シート数の下限を検査
    /// 4. 各シートをリレーションへ抽出
    /// 5. クロス結合（左から右へ、外側優先順）
    /// 6. ウィンドウ分割と直列化
    ///
    /// クライアント起因のエラーは抽出までの段階で同期的に検出され、
    /// 部分的な出力を返すことはありません。
    ///
    /// # 引数
    ///
    /// * `input` - ワークブックを読み込むためのリーダー（Read + Seek）
    ///
    /// # 戻り値
    ///
    /// * `Ok(Vec<u8>)` - 出力ワークブック（XLSX形式）
    /// * `Err(XlsxCrossError)` - 受付拒否または処理失敗
    pub fn process<R: Read + Seek>(&self, mut input: R) -> Result<Vec<u8>, XlsxCrossError> {
        // 1. 入力をメモリへ読み込む
        let mut buffer = Vec::new();
        input.read_to_end(&mut buffer)?;

        // 2. 受付検査（全セル読み込みの前）
        let limits = AdmissionLimits {
            max_row_product: self.config.max_row_product,
            ..AdmissionLimits::default()
        };
        let report = guard::admit(&buffer, &limits)?;
        debug!(
            sheets = report.sheet_rows.len(),
            row_product = report.row_product,
            "admission check passed"
        );

        // 3. 全読み込み用にワークブックを開く
        let sheets = open_workbook_auto_from_rs(Cursor::new(buffer))?;
        let mut workbook = match sheets {
            Sheets::Xlsx(workbook) => workbook,
            _ => {
                return Err(XlsxCrossError::MalformedInput(
                    "only XLSX workbooks are supported".to_string(),
                ))
            }
        };

        let sheet_names = workbook.sheet_names().to_vec();
        if sheet_names.len() < crate::MIN_SHEETS {
            return Err(XlsxCrossError::TooFewSheets {
                count: sheet_names.len(),
            });
        }

        // 4. 各シートをリレーションへ抽出
        let mut relations: Vec<Relation> = Vec::with_capacity(sheet_names.len());
        for name in &sheet_names {
            let range = workbook
                .worksheet_range(name)
                .map_err(calamine::Error::from)?;
            relations.push(extract::extract_sheet(&range)?);
        }

        // 5. クロス結合
        let joined = join::cross_join_all(&relations);
        debug!(
            rows = joined.height(),
            columns = joined.width(),
            "cross join computed"
        );

        // 6. ウィンドウ分割と直列化
        let output = writer::write_windows(
            joined.columns(),
            joined.windows(self.config.rows_per_sheet),
        )?;
        debug!(bytes = output.len(), "output workbook serialized");

        Ok(output)
    }
}
