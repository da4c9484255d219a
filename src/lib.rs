//! xlsxcross - Excel cross-join service
//!
//! This crate accepts an XLSX workbook with two or more sheets, computes the
//! cross (Cartesian) join of all sheets' rows, and produces a new workbook
//! with the result split across sheets of at most one million rows each.
//! It powers a small stateless upload service: one file in, one file out.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::fs::File;
//! use xlsxcross::CrossJoinerBuilder;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let joiner = CrossJoinerBuilder::new().build()?;
//!
//!     let input = File::open("workbook.xlsx")?;
//!     let output: Vec<u8> = joiner.process(input)?;
//!
//!     std::fs::write("joined.xlsx", output)?;
//!     Ok(())
//! }
//! ```
//!
//! For in-memory processing, use `Cursor`:
//!
//! ```rust,no_run
//! use std::io::Cursor;
//! use xlsxcross::CrossJoinerBuilder;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let joiner = CrossJoinerBuilder::new().build()?;
//! let workbook_data: Vec<u8> = vec![]; // Your XLSX file bytes
//! let output = joiner.process(Cursor::new(workbook_data))?;
//! # Ok(())
//! # }
//! ```
//!
//! # Admission limits
//!
//! Inputs are rejected before any expensive work when the product of the
//! sheets' raw row counts exceeds [`MAX_ROW_PRODUCT`], or when the workbook
//! has fewer than [`MIN_SHEETS`] sheets. The limits can be adjusted through
//! the builder (mainly useful in tests):
//!
//! ```rust
//! use xlsxcross::CrossJoinerBuilder;
//!
//! # fn main() -> Result<(), xlsxcross::XlsxCrossError> {
//! let joiner = CrossJoinerBuilder::new()
//!     .with_max_row_product(1_000)
//!     .with_rows_per_sheet(100)
//!     .build()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Serving over HTTP
//!
//! The [`server`] module exposes the pipeline as an axum router with the
//! upload form at `GET /` and the transform endpoint at `POST /uploader`;
//! see `src/main.rs` for the service binary.

mod builder;
mod error;
mod extract;
mod guard;
mod join;
pub mod server;
mod types;
mod window;
mod writer;

// 公開API
pub use builder::{CrossJoiner, CrossJoinerBuilder};
pub use error::XlsxCrossError;

/// 受付検査の上限: 全シートの生の最大行番号（ヘッダー行を含む）の積
pub const MAX_ROW_PRODUCT: u64 = 3_000_000;

/// 出力シート1枚あたりの最大データ行数
pub const ROWS_PER_SHEET: usize = 1_000_000;

/// 入力ワークブックに要求するシート数の下限
pub const MIN_SHEETS: usize = 2;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contract_constants() {
        // 外部契約の定数（変更は互換性の破壊）
        assert_eq!(MAX_ROW_PRODUCT, 3_000_000);
        assert_eq!(ROWS_PER_SHEET, 1_000_000);
        assert_eq!(MIN_SHEETS, 2);
    }
}
