//! Admission Guard Module
//!
//! 高コストな全セル読み込みの前に、入力の受付可否を判定するモジュール。
//! ZIPコンテナの健全性検査と、ワークシートXMLの`<dimension>`要素による
//! 行数積の事前チェックを提供します。セル値は一切読み込みません。

use std::io::{Cursor, Read};

use zip::ZipArchive;

use crate::error::XlsxCrossError;

/// 受付検査の制限値
///
/// `max_row_product`は契約定数（[`crate::MAX_ROW_PRODUCT`]）がデフォルトで、
/// ビルダー経由で変更できます。その他はファイル処理時の保護的な上限です。
#[derive(Debug, Clone)]
pub(crate) struct AdmissionLimits {
    /// 全シートの最大行番号の積の上限
    pub max_row_product: u64,
    /// 入力ファイルの最大サイズ（バイト）
    /// デフォルト: 2GB (2_147_483_648 bytes)
    pub max_input_file_size: u64,
    /// ZIPアーカイブ内の最大ファイル数
    /// デフォルト: 10000
    pub max_file_count: usize,
}

impl Default for AdmissionLimits {
    fn default() -> Self {
        Self {
            max_row_product: crate::MAX_ROW_PRODUCT,
            max_input_file_size: 2_147_483_648, // 2GB
            max_file_count: 10_000,
        }
    }
}

/// 受付検査の結果
///
/// ログ出力用に、各シートの生の最大行番号とその積を保持します。
#[derive(Debug, Clone)]
pub(crate) struct AdmissionReport {
    /// (シート名, 最大行番号) のリスト（ワークブック内の出現順）
    pub sheet_rows: Vec<(String, u64)>,
    /// 全シートの最大行番号の積
    pub row_product: u64,
}

/// ファイルパスの検証
///
/// パストラバーサル攻撃を防ぐため、ZIPエントリのパスを検証します。
///
/// # 戻り値
///
/// * `Ok(())` - パスが安全な場合
/// * `Err(String)` - パスが危険な場合（`..`や絶対パスを含む）
pub(crate) fn validate_zip_path(path: &str) -> Result<(), String> {
    // 空のパスは拒否
    if path.is_empty() {
        return Err("Empty path is not allowed".to_string());
    }

    // 絶対パスを拒否（Windows形式の`C:\`やUnix形式の`/`で始まるパス）
    if path.starts_with('/') || path.starts_with("C:\\") || path.starts_with("c:\\") {
        return Err(format!("Absolute path is not allowed: {}", path));
    }

    // `..`を含むパスを拒否（ディレクトリトラバーサル攻撃）
    if path.contains("..") {
        return Err(format!("Path traversal detected: {}", path));
    }

    // `\`を含むパスを拒否（Windows形式のパスセパレータ）
    if path.contains('\\') {
        return Err(format!("Backslash in path is not allowed: {}", path));
    }

    Ok(())
}

/// 入力バイト列の受付検査
///
/// 以下を順に検査します（元サービスと同じ順序）。
///
/// 1. 構造検査: ZIPコンテナとして開けること、エントリ数とパスが健全で
///    あること、`xl/workbook.xml`が存在すること
/// 2. 組合せ事前チェック: 各ワークシートXMLの`<dimension>`要素（なければ
///    `<row r="…">`属性のストリーム走査）から生の最大行番号を読み取り、
///    その積が`max_row_product`以下であること
///
/// 最大行番号はヘッダー行を含む生の値です。結合はヘッダーを除いた
/// データ行に対して行われるため、このチェックは実際の結合行数に対して
/// 保守的になります（意図された挙動）。
///
/// シート数の下限チェックはここでは行いません。全読み込み用にワーク
/// ブックを開いた後、パイプライン側で行います。
///
/// # 引数
///
/// * `bytes` - アップロードされたワークブックのバイト列
/// * `limits` - 受付検査の制限値
///
/// # 戻り値
///
/// * `Ok(AdmissionReport)` - 受付可の場合、シートごとの行数と積
/// * `Err(XlsxCrossError::MalformedInput)` - コンテナとして解釈できない場合
/// * `Err(XlsxCrossError::TooManyRows)` - 行数積が上限を超えた場合
pub(crate) fn admit(
    bytes: &[u8],
    limits: &AdmissionLimits,
) -> Result<AdmissionReport, XlsxCrossError> {
    // 1. 入力サイズの上限
    if bytes.len() as u64 > limits.max_input_file_size {
        return Err(XlsxCrossError::MalformedInput(format!(
            "input size {} exceeds maximum {} bytes",
            bytes.len(),
            limits.max_input_file_size
        )));
    }

    // 2. ZIPコンテナとして開く
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| XlsxCrossError::MalformedInput(format!("not a zip container: {}", e)))?;

    // 3. エントリ数の上限
    if archive.len() > limits.max_file_count {
        return Err(XlsxCrossError::MalformedInput(format!(
            "archive contains too many entries: {} (max: {})",
            archive.len(),
            limits.max_file_count
        )));
    }

    // 4. 各エントリのパス検証
    for i in 0..archive.len() {
        let file = archive
            .by_index(i)
            .map_err(|e| XlsxCrossError::MalformedInput(format!("zip entry error: {}", e)))?;
        validate_zip_path(file.name())
            .map_err(|e| XlsxCrossError::MalformedInput(format!("invalid zip path: {}", e)))?;
    }

    // 5. シート一覧とワークシートパーツの対応を解決
    let sheets = parse_workbook_sheets(&mut archive)?;
    let rels = parse_workbook_rels(&mut archive)?;

    // 6. 各シートの生の最大行番号を読み取り、積を計算
    let mut sheet_rows = Vec::with_capacity(sheets.len());
    let mut row_product: u64 = 1;
    for (name, rid) in sheets {
        let target = rels.iter().find(|(id, _)| *id == rid).map(|(_, t)| t);
        let part = match target {
            Some(t) => resolve_part_path(t),
            None => {
                return Err(XlsxCrossError::MalformedInput(format!(
                    "sheet '{}' has no relationship target",
                    name
                )))
            }
        };

        let max_row = sheet_max_row(&mut archive, &part)?;
        row_product = row_product.saturating_mul(max_row);
        sheet_rows.push((name, max_row));
    }

    if row_product > limits.max_row_product {
        return Err(XlsxCrossError::TooManyRows {
            product: row_product,
        });
    }

    Ok(AdmissionReport {
        sheet_rows,
        row_product,
    })
}

/// xl/workbook.xml の解析（プライベート）
///
/// `<sheets>`配下の`<sheet name=".." r:id=".."/>`を出現順に収集します。
fn parse_workbook_sheets(
    archive: &mut ZipArchive<Cursor<&[u8]>>,
) -> Result<Vec<(String, String)>, XlsxCrossError> {
    let mut workbook_file = archive.by_name("xl/workbook.xml").map_err(|_| {
        XlsxCrossError::MalformedInput("xl/workbook.xml is missing".to_string())
    })?;

    let mut xml_content = Vec::new();
    workbook_file.read_to_end(&mut xml_content)?;

    use quick_xml::events::Event;
    use quick_xml::Reader;

    let mut reader = Reader::from_reader(xml_content.as_slice());
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut sheets = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                if e.name().as_ref() == b"sheet" {
                    let mut name: Option<String> = None;
                    let mut rid: Option<String> = None;

                    for attr in e.attributes() {
                        let attr = attr.map_err(|e| {
                            XlsxCrossError::MalformedInput(format!("XML attribute error: {}", e))
                        })?;
                        match attr.key.as_ref() {
                            b"name" => {
                                name = Some(attr_to_string(&attr.value)?);
                            }
                            b"r:id" => {
                                rid = Some(attr_to_string(&attr.value)?);
                            }
                            _ => {}
                        }
                    }

                    match (name, rid) {
                        (Some(name), Some(rid)) => sheets.push((name, rid)),
                        _ => {
                            return Err(XlsxCrossError::MalformedInput(
                                "sheet element without name or r:id".to_string(),
                            ))
                        }
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(XlsxCrossError::MalformedInput(format!(
                    "XML parse error in workbook.xml: {}",
                    e
                )))
            }
            _ => {}
        }
        buf.clear();
    }

    if sheets.is_empty() {
        return Err(XlsxCrossError::MalformedInput(
            "workbook.xml lists no sheets".to_string(),
        ));
    }

    Ok(sheets)
}

/// xl/_rels/workbook.xml.rels の解析（プライベート）
///
/// `Relationship`要素の Id → Target の対応を収集します。
fn parse_workbook_rels(
    archive: &mut ZipArchive<Cursor<&[u8]>>,
) -> Result<Vec<(String, String)>, XlsxCrossError> {
    let mut rels_file = archive.by_name("xl/_rels/workbook.xml.rels").map_err(|_| {
        XlsxCrossError::MalformedInput("xl/_rels/workbook.xml.rels is missing".to_string())
    })?;

    let mut xml_content = Vec::new();
    rels_file.read_to_end(&mut xml_content)?;

    use quick_xml::events::Event;
    use quick_xml::Reader;

    let mut reader = Reader::from_reader(xml_content.as_slice());
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut rels = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                if e.name().as_ref() == b"Relationship" {
                    let mut id: Option<String> = None;
                    let mut target: Option<String> = None;

                    for attr in e.attributes() {
                        let attr = attr.map_err(|e| {
                            XlsxCrossError::MalformedInput(format!("XML attribute error: {}", e))
                        })?;
                        match attr.key.as_ref() {
                            b"Id" => {
                                id = Some(attr_to_string(&attr.value)?);
                            }
                            b"Target" => {
                                target = Some(attr_to_string(&attr.value)?);
                            }
                            _ => {}
                        }
                    }

                    if let (Some(id), Some(target)) = (id, target) {
                        rels.push((id, target));
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(XlsxCrossError::MalformedInput(format!(
                    "XML parse error in workbook.xml.rels: {}",
                    e
                )))
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(rels)
}

/// ワークシートXMLから生の最大行番号を読み取る（プライベート）
///
/// `<dimension ref="A1:C42"/>`が見つかればその行境界を返し、見つからない
/// 場合は`<row>`要素の`r`属性（なければ出現順の連番）の最大値を返します。
/// どちらの経路でもセル値は復号しません。空のシートは1を返します
/// （openpyxlの`max_row`と同じ下限）。
fn sheet_max_row(
    archive: &mut ZipArchive<Cursor<&[u8]>>,
    part: &str,
) -> Result<u64, XlsxCrossError> {
    let mut sheet_file = archive.by_name(part).map_err(|_| {
        XlsxCrossError::MalformedInput(format!("worksheet part '{}' is missing", part))
    })?;

    let mut xml_content = Vec::new();
    sheet_file.read_to_end(&mut xml_content)?;

    use quick_xml::events::Event;
    use quick_xml::Reader;

    let mut reader = Reader::from_reader(xml_content.as_slice());
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut max_row: u64 = 0;
    let mut rows_seen: u64 = 0;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"dimension" => {
                    for attr in e.attributes() {
                        let attr = attr.map_err(|e| {
                            XlsxCrossError::MalformedInput(format!("XML attribute error: {}", e))
                        })?;
                        if attr.key.as_ref() == b"ref" {
                            let ref_str = attr_to_string(&attr.value)?;
                            if let Some(row) = max_row_of_ref(&ref_str) {
                                // dimensionがあれば走査は不要
                                return Ok(row.max(1));
                            }
                        }
                    }
                }
                b"row" => {
                    rows_seen += 1;
                    let mut row_number: Option<u64> = None;
                    for attr in e.attributes() {
                        let attr = attr.map_err(|e| {
                            XlsxCrossError::MalformedInput(format!("XML attribute error: {}", e))
                        })?;
                        if attr.key.as_ref() == b"r" {
                            let r_str = attr_to_string(&attr.value)?;
                            row_number = r_str.parse::<u64>().ok();
                        }
                    }
                    max_row = max_row.max(row_number.unwrap_or(rows_seen));
                }
                _ => {}
            },
            Ok(Event::End(e)) => {
                // セル範囲を越えて走査しない
                if e.name().as_ref() == b"sheetData" {
                    break;
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(XlsxCrossError::MalformedInput(format!(
                    "XML parse error in '{}': {}",
                    part, e
                )))
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(max_row.max(1))
}

/// セル範囲参照（"A1:C42"）の末尾セルから行番号を取り出す（プライベート）
fn max_row_of_ref(ref_str: &str) -> Option<u64> {
    let last_cell = ref_str.rsplit(':').next()?;
    let digits: String = last_cell.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse::<u64>().ok()
}

/// Relationshipターゲットをアーカイブ内のパーツパスへ解決（プライベート）
///
/// ターゲットは通常 "worksheets/sheet1.xml" のような相対パスですが、
/// "/xl/worksheets/sheet1.xml" の形式の絶対パスも許容します。
fn resolve_part_path(target: &str) -> String {
    if let Some(stripped) = target.strip_prefix('/') {
        stripped.to_string()
    } else {
        format!("xl/{}", target)
    }
}

/// 属性値をUTF-8文字列へ変換（プライベート）
fn attr_to_string(value: &[u8]) -> Result<String, XlsxCrossError> {
    std::str::from_utf8(value)
        .map(|s| s.to_string())
        .map_err(|e| XlsxCrossError::MalformedInput(format!("invalid UTF-8 in attribute: {}", e)))
}
