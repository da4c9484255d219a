//! Types Module
//!
//! クレート全体で使用する共通データ型を定義するモジュール。
//! セルのスカラー値と、クロス結合の対象となるリレーション（表）を提供します。

use chrono::NaiveDateTime;

use crate::error::XlsxCrossError;

/// セルのスカラー値を表す列挙型
///
/// 入力シートから抽出された時点の型をそのまま保持します。
/// 書式情報（フォント、罫線など）は保持しません。
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum CellScalar {
    /// 数値（f64）
    Number(f64),

    /// 文字列
    String(String),

    /// 論理値
    Bool(bool),

    /// 日時
    DateTime(NaiveDateTime),

    /// 空セル
    Empty,
}

impl CellScalar {
    /// 値が空かどうかを判定
    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        matches!(self, CellScalar::Empty)
    }

    /// 値を文字列として取得（列名の導出などに使用）
    pub fn as_raw_string(&self) -> String {
        match self {
            CellScalar::Number(n) => n.to_string(),
            CellScalar::String(s) => s.clone(),
            CellScalar::Bool(b) => b.to_string(),
            CellScalar::DateTime(dt) => dt.to_string(),
            CellScalar::Empty => String::new(),
        }
    }
}

/// リレーション（順序付きの行集合と固定の列名リスト）
///
/// 1枚のシートから抽出された表、またはクロス結合の結果を表します。
///
/// # 不変条件
///
/// * すべての行の長さは `columns.len()` と一致する
/// * 行の順序は入力シートでの出現順（結合後は外側優先順）を保持する
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Relation {
    /// 列名（固定）
    columns: Vec<String>,

    /// 行データ（行 × 列）
    rows: Vec<Vec<CellScalar>>,
}

impl Relation {
    /// 列名のみのリレーションを生成（行は後から追加）
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// 列名と行データからリレーションを生成
    ///
    /// # 引数
    ///
    /// * `columns` - 列名のリスト
    /// * `rows` - 行データ。各行の長さは `columns.len()` と一致していること
    ///
    /// # 戻り値
    ///
    /// * `Ok(Relation)` - 不変条件を満たす場合
    /// * `Err(XlsxCrossError::MalformedInput)` - 行の長さが列数と一致しない場合
    pub fn from_rows(
        columns: Vec<String>,
        rows: Vec<Vec<CellScalar>>,
    ) -> Result<Self, XlsxCrossError> {
        for (idx, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(XlsxCrossError::MalformedInput(format!(
                    "row {} has {} cells, expected {}",
                    idx,
                    row.len(),
                    columns.len()
                )));
            }
        }
        Ok(Self { columns, rows })
    }

    /// 不変条件の検査を省略してリレーションを生成（結合エンジン内部用）
    ///
    /// 呼び出し側が行幅の一致を保証すること。
    pub fn from_rows_unchecked(columns: Vec<String>, rows: Vec<Vec<CellScalar>>) -> Self {
        debug_assert!(rows.iter().all(|r| r.len() == columns.len()));
        Self { columns, rows }
    }

    /// 行を追加
    ///
    /// # 戻り値
    ///
    /// * `Err(XlsxCrossError::MalformedInput)` - 行の長さが列数と一致しない場合
    pub fn push_row(&mut self, row: Vec<CellScalar>) -> Result<(), XlsxCrossError> {
        if row.len() != self.columns.len() {
            return Err(XlsxCrossError::MalformedInput(format!(
                "row {} has {} cells, expected {}",
                self.rows.len(),
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    /// 列名のスライスを取得
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// 行データのスライスを取得
    pub fn rows(&self) -> &[Vec<CellScalar>] {
        &self.rows
    }

    /// 行数を取得
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// 列数を取得
    pub fn width(&self) -> usize {
        self.columns.len()
    }
}
