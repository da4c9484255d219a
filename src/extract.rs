//! Sheet Extractor Module
//!
//! 受付済みのシートをリレーション（列名付きの表）へ変換するモジュール。
//! 先頭行をヘッダーとして列名を導出し、以降の行をデータ行として型付きで
//! 取り込みます。カンマ小数点表記のテキストセルは数値へ変換します。

use calamine::Data;

use crate::error::XlsxCrossError;
use crate::types::{CellScalar, Relation};

/// シートのセル範囲をリレーションへ変換
///
/// 先頭行がヘッダー行となり、各セルの文字列表現が列名になります。
/// 空のヘッダーセルは `Unnamed: {列番号}` と命名されます（pandasの
/// `read_excel`と同じ規則）。2行目以降がデータ行です。
///
/// calamineの`Range`は矩形（全行同幅）であるため行幅の不一致は通常
/// 発生しませんが、発生した場合は`MalformedInput`として伝播します。
/// 行を黙って捨てることはありません。
///
/// # 引数
///
/// * `range` - calamineが読み取ったセル範囲
///
/// # 戻り値
///
/// * `Ok(Relation)` - 行順を保持したリレーション。空のシートは列なし・
///   行なしのリレーションになります
pub(crate) fn extract_sheet(range: &calamine::Range<Data>) -> Result<Relation, XlsxCrossError> {
    let mut rows = range.rows();

    // 1. ヘッダー行から列名を導出
    let header = match rows.next() {
        Some(header) => header,
        None => return Ok(Relation::new(Vec::new())),
    };
    let columns: Vec<String> = header
        .iter()
        .enumerate()
        .map(|(col, cell)| header_name(col, cell))
        .collect();

    // 2. データ行を型付きで取り込む
    let mut relation = Relation::new(columns);
    for row in rows {
        let cells: Vec<CellScalar> = row.iter().map(scalar_from_cell).collect();
        relation.push_row(cells)?;
    }

    Ok(relation)
}

/// ヘッダーセルから列名を導出（プライベート）
fn header_name(col: usize, cell: &Data) -> String {
    match cell {
        Data::Empty => format!("Unnamed: {}", col),
        other => {
            let name = scalar_from_cell(other).as_raw_string();
            if name.is_empty() {
                format!("Unnamed: {}", col)
            } else {
                name
            }
        }
    }
}

/// calamineのセル値をスカラー値へ変換（プライベート）
///
/// カンマを小数点に使うテキスト（例: "3,14"）は数値へ変換します。
/// キャッシュ済みのエラー値（#DIV/0!など）は値を持たないため空セルと
/// して扱います。
fn scalar_from_cell(cell: &Data) -> CellScalar {
    match cell {
        Data::Int(i) => CellScalar::Number(*i as f64),
        Data::Float(f) => CellScalar::Number(*f),
        Data::String(s) => match parse_comma_decimal(s) {
            Some(n) => CellScalar::Number(n),
            None => CellScalar::String(s.clone()),
        },
        Data::Bool(b) => CellScalar::Bool(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(naive) => CellScalar::DateTime(naive),
            None => CellScalar::Empty,
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellScalar::String(s.clone()),
        // キャッシュ済みエラー値（#DIV/0!など）と空セル
        _ => CellScalar::Empty,
    }
}

/// カンマ小数点表記の数値テキストを解析（プライベート）
///
/// 受理する形式: 符号（省略可）+ 整数部 + カンマ1つ + 小数部。
/// カンマを含まないテキストや、カンマが複数あるもの、数字以外を含む
/// ものは数値とみなしません（"3.14"はそのまま文字列として通過します）。
fn parse_comma_decimal(s: &str) -> Option<f64> {
    let trimmed = s.trim();

    let unsigned = trimmed
        .strip_prefix('-')
        .or_else(|| trimmed.strip_prefix('+'))
        .unwrap_or(trimmed);

    let (int_part, frac_part) = unsigned.split_once(',')?;
    if int_part.is_empty() || frac_part.is_empty() {
        return None;
    }
    if !int_part.chars().all(|c| c.is_ascii_digit())
        || !frac_part.chars().all(|c| c.is_ascii_digit())
    {
        return None;
    }

    trimmed.replace(',', ".").parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// テスト用のセル範囲を構築
    fn range_from_grid(grid: Vec<Vec<Data>>) -> calamine::Range<Data> {
        let rows = grid.len() as u32;
        let cols = grid.iter().map(|r| r.len()).max().unwrap_or(0) as u32;
        let mut range = calamine::Range::new((0, 0), (rows - 1, cols - 1));
        for (r, row) in grid.into_iter().enumerate() {
            for (c, cell) in row.into_iter().enumerate() {
                range.set_value((r as u32, c as u32), cell);
            }
        }
        range
    }

    #[test]
    fn test_parse_comma_decimal_accepts() {
        assert_eq!(parse_comma_decimal("3,14"), Some(3.14));
        assert_eq!(parse_comma_decimal("-2,5"), Some(-2.5));
        assert_eq!(parse_comma_decimal("+0,25"), Some(0.25));
        assert_eq!(parse_comma_decimal("  10,0  "), Some(10.0));
    }

    #[test]
    fn test_parse_comma_decimal_rejects() {
        // カンマなし・ピリオド小数点・不完全な形式は変換しない
        assert_eq!(parse_comma_decimal("314"), None);
        assert_eq!(parse_comma_decimal("3.14"), None);
        assert_eq!(parse_comma_decimal("3,14,15"), None);
        assert_eq!(parse_comma_decimal("3,"), None);
        assert_eq!(parse_comma_decimal(",5"), None);
        assert_eq!(parse_comma_decimal("1 000,5"), None);
        assert_eq!(parse_comma_decimal("abc"), None);
        assert_eq!(parse_comma_decimal(""), None);
    }

    #[test]
    fn test_extract_sheet_header_and_rows() {
        let range = range_from_grid(vec![
            vec![Data::String("name".to_string()), Data::String("qty".to_string())],
            vec![Data::String("apple".to_string()), Data::Int(3)],
            vec![Data::String("pear".to_string()), Data::Float(1.5)],
        ]);

        let relation = extract_sheet(&range).unwrap();
        assert_eq!(relation.columns(), &["name", "qty"]);
        assert_eq!(relation.height(), 2);
        assert_eq!(relation.rows()[0][1], CellScalar::Number(3.0));
        assert_eq!(relation.rows()[1][1], CellScalar::Number(1.5));
    }

    #[test]
    fn test_extract_sheet_comma_decimal_cell() {
        let range = range_from_grid(vec![
            vec![Data::String("price".to_string())],
            vec![Data::String("3,14".to_string())],
        ]);

        let relation = extract_sheet(&range).unwrap();
        // "3,14" は 3.14 の数値になる（"314"でも文字列のままでもない）
        assert_eq!(relation.rows()[0][0], CellScalar::Number(3.14));
    }

    #[test]
    fn test_extract_sheet_unnamed_columns() {
        let range = range_from_grid(vec![
            vec![Data::String("a".to_string()), Data::Empty, Data::String("c".to_string())],
            vec![Data::Int(1), Data::Int(2), Data::Int(3)],
        ]);

        let relation = extract_sheet(&range).unwrap();
        assert_eq!(relation.columns(), &["a", "Unnamed: 1", "c"]);
    }

    #[test]
    fn test_extract_sheet_numeric_header() {
        // 数値のヘッダーセルは文字列表現が列名になる
        let range = range_from_grid(vec![
            vec![Data::Int(2024)],
            vec![Data::String("x".to_string())],
        ]);

        let relation = extract_sheet(&range).unwrap();
        assert_eq!(relation.columns(), &["2024"]);
    }

    #[test]
    fn test_extract_sheet_header_only() {
        // ヘッダーのみのシート → データ行ゼロのリレーション
        let range = range_from_grid(vec![vec![Data::String("a".to_string())]]);
        let relation = extract_sheet(&range).unwrap();
        assert_eq!(relation.columns(), &["a"]);
        assert_eq!(relation.height(), 0);
    }

    #[test]
    fn test_extract_sheet_preserves_row_order() {
        let mut grid = vec![vec![Data::String("n".to_string())]];
        for i in 0..20 {
            grid.push(vec![Data::Int(i)]);
        }

        let relation = extract_sheet(&range_from_grid(grid)).unwrap();
        for (i, row) in relation.rows().iter().enumerate() {
            assert_eq!(row[0], CellScalar::Number(i as f64));
        }
    }

    #[test]
    fn test_extract_sheet_bool_and_empty_passthrough() {
        let range = range_from_grid(vec![
            vec![Data::String("flag".to_string()), Data::String("note".to_string())],
            vec![Data::Bool(true), Data::Empty],
        ]);

        let relation = extract_sheet(&range).unwrap();
        assert_eq!(relation.rows()[0][0], CellScalar::Bool(true));
        assert_eq!(relation.rows()[0][1], CellScalar::Empty);
    }
}
