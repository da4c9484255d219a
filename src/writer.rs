//! Workbook Writer Module
//!
//! ウィンドウ列を出力ワークブックへ直列化するモジュール。ウィンドウ1つに
//! つき1シートを、ゼロ埋めした連番の名前で放出順に生成します。各シートの
//! 先頭行は行番号列（空見出し）と結合済みリレーションの列名、先頭列は
//! リレーション全体での行位置です（ウィンドウごとに0から振り直しません）。

use rust_xlsxwriter::{Format, Workbook};

use crate::error::XlsxCrossError;
use crate::types::CellScalar;
use crate::window::Window;

/// 日時セルに適用する表示書式
const DATETIME_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";

/// ウィンドウ番号から出力シート名を導出
///
/// 0始まりの番号を幅2でゼロ埋めします。100以上は自然に桁が伸び、
/// 切り詰めは行いません（0 → "00"、99 → "99"、100 → "100"）。
pub(crate) fn sheet_name(index: usize) -> String {
    format!("{:02}", index)
}

/// ウィンドウ列を出力ワークブックのバイト列へ直列化
///
/// ウィンドウは放出順に1パスで消費します。ウィンドウが1つもない場合
/// （結合結果が0行）でも、ヘッダー行のみのシート"00"を1枚生成し、
/// 常に有効なワークブックを返します。
///
/// # 引数
///
/// * `columns` - 結合済みリレーションの列名（空ウィンドウ時のヘッダー用）
/// * `windows` - ページャが生成するウィンドウ列
///
/// # 戻り値
///
/// * `Ok(Vec<u8>)` - XLSX形式のバイト列
/// * `Err(XlsxCrossError::Serialization)` - 直列化に失敗した場合
pub(crate) fn write_windows<'a>(
    columns: &[String],
    windows: impl Iterator<Item = Window<'a>>,
) -> Result<Vec<u8>, XlsxCrossError> {
    let mut workbook = Workbook::new();
    let datetime_format = Format::new().set_num_format(DATETIME_FORMAT);

    let mut sheets_written = 0usize;
    for window in windows {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sheet_name(window.index))?;

        // ヘッダー行: A1は行番号列の空見出し、B1以降が列名
        for (col, name) in window.columns.iter().enumerate() {
            worksheet.write_string(0, (col + 1) as u16, name)?;
        }

        // データ行: 先頭列はリレーション全体での行位置
        for (row_idx, row) in window.rows.iter().enumerate() {
            let excel_row = (row_idx + 1) as u32;
            worksheet.write_number(excel_row, 0, (window.offset + row_idx) as f64)?;

            for (col_idx, cell) in row.iter().enumerate() {
                let excel_col = (col_idx + 1) as u16;
                match cell {
                    CellScalar::Number(n) => {
                        worksheet.write_number(excel_row, excel_col, *n)?;
                    }
                    CellScalar::String(s) => {
                        worksheet.write_string(excel_row, excel_col, s)?;
                    }
                    CellScalar::Bool(b) => {
                        worksheet.write_boolean(excel_row, excel_col, *b)?;
                    }
                    CellScalar::DateTime(dt) => {
                        worksheet.write_datetime_with_format(
                            excel_row,
                            excel_col,
                            dt,
                            &datetime_format,
                        )?;
                    }
                    CellScalar::Empty => {}
                }
            }
        }

        sheets_written += 1;
    }

    // 結合結果が0行の場合もヘッダーのみのシートを1枚出す
    if sheets_written == 0 {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sheet_name(0))?;
        for (col, name) in columns.iter().enumerate() {
            worksheet.write_string(0, (col + 1) as u16, name)?;
        }
    }

    Ok(workbook.save_to_buffer()?)
}
