// ==========================================
// 排班派工系统 - 文件解析器实现
// ==========================================
// 阶段 0: 文件读取与解析
// 支持: 分隔文本 (.csv/.txt, 单字节编码) / Excel (.xlsx/.xls)
// ==========================================

use crate::config::FileFormat;
use crate::importer::error::{ImportError, ImportResult};
use calamine::{open_workbook_auto_from_rs, Reader};
use csv::{QuoteStyle, ReaderBuilder, WriterBuilder};
use std::io::Cursor;
use std::path::{Path, PathBuf};

// ==========================================
// RawTable - 有序表头 + 行
// ==========================================
// 每行长度与表头一致（短行补空、长行截断）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        Self { headers, rows }
    }

    pub fn width(&self) -> usize {
        self.headers.len()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// 某列全部取值（按行顺序）
    pub fn column_values(&self, col: usize) -> impl Iterator<Item = &str> + '_ {
        self.rows
            .iter()
            .map(move |r| r.get(col).map(String::as_str).unwrap_or(""))
    }

    pub fn column_index(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == header)
    }

    /// 追加一列（已存在时返回原列序号）
    pub fn ensure_column(&mut self, header: &str) -> usize {
        if let Some(idx) = self.column_index(header) {
            return idx;
        }
        self.headers.push(header.to_string());
        for row in &mut self.rows {
            row.push(String::new());
        }
        self.headers.len() - 1
    }

    pub fn set_cell(&mut self, row: usize, col: usize, value: impl Into<String>) {
        if let Some(cell) = self.rows.get_mut(row).and_then(|r| r.get_mut(col)) {
            *cell = value.into();
        }
    }
}

// ==========================================
// ExtractSource - 数据来源（路径或内存字节）
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractSource {
    Path(PathBuf),
    Bytes { name: String, data: Vec<u8> },
}

impl ExtractSource {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        ExtractSource::Path(path.into())
    }

    pub fn bytes(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        ExtractSource::Bytes {
            name: name.into(),
            data: data.into(),
        }
    }

    /// 用于结果记录/日志的文件名
    pub fn display_name(&self) -> String {
        match self {
            ExtractSource::Path(p) => p
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| p.display().to_string()),
            ExtractSource::Bytes { name, .. } => name.clone(),
        }
    }

    pub fn exists(&self) -> bool {
        match self {
            ExtractSource::Path(p) => p.is_file(),
            ExtractSource::Bytes { .. } => true,
        }
    }
}

// ==========================================
// FileParser Trait
// ==========================================
pub trait FileParser {
    /// 解析内存字节为 RawTable
    fn parse_bytes(&self, bytes: &[u8]) -> ImportResult<RawTable>;
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser {
    format: FileFormat,
}

impl CsvParser {
    pub fn new(format: FileFormat) -> Self {
        Self { format }
    }
}

impl FileParser for CsvParser {
    fn parse_bytes(&self, bytes: &[u8]) -> ImportResult<RawTable> {
        // 解码（带 BOM 时以 BOM 为准）
        let (text, _encoding_used, had_errors) = self.format.encoding.decode(bytes);
        if had_errors {
            tracing::warn!(encoding = self.format.encoding.name(), "存在无法解码的字节，已替换");
        }

        let mut reader = ReaderBuilder::new()
            .delimiter(self.format.delimiter)
            .has_headers(true)
            .flexible(true) // 允许行长度不一致
            .from_reader(text.as_bytes());

        // 读取表头
        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        if headers.iter().all(|h| h.is_empty()) {
            return Err(ImportError::MissingHeader("表头为空".to_string()));
        }

        // 读取所有行
        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            let row: Vec<String> = record.iter().map(|v| v.trim().to_string()).collect();

            // 跳过完全空白的行
            if row.iter().all(|v| v.is_empty()) {
                continue;
            }
            rows.push(row);
        }

        Ok(RawTable::new(headers, rows))
    }
}

// ==========================================
// Excel Parser 实现（读取第一个 sheet）
// ==========================================
pub struct ExcelParser;

impl FileParser for ExcelParser {
    fn parse_bytes(&self, bytes: &[u8]) -> ImportResult<RawTable> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;

        let sheet_names = workbook.sheet_names();
        let sheet_name = sheet_names
            .first()
            .cloned()
            .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无工作表".to_string()))?;
        let range = workbook.worksheet_range(&sheet_name)?;

        // 提取表头（第一行）
        let mut rows_iter = range.rows();
        let header_row = rows_iter
            .next()
            .ok_or_else(|| ImportError::MissingHeader(sheet_name.clone()))?;
        let headers: Vec<String> = header_row
            .iter()
            .map(|cell| cell.to_string().trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for data_row in rows_iter {
            let row: Vec<String> = data_row
                .iter()
                .map(|cell| cell.to_string().trim().to_string())
                .collect();
            if row.iter().all(|v| v.is_empty()) {
                continue;
            }
            rows.push(row);
        }

        Ok(RawTable::new(headers, rows))
    }
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser {
    format: FileFormat,
}

impl UniversalFileParser {
    pub fn new(format: FileFormat) -> Self {
        Self { format }
    }

    /// 按文件名扩展名选择解析器（无扩展名按分隔文本处理）
    pub fn parse_named(&self, name: &str, bytes: &[u8]) -> ImportResult<RawTable> {
        let ext = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "" | "csv" | "txt" => CsvParser::new(self.format).parse_bytes(bytes),
            "xlsx" | "xls" => ExcelParser.parse_bytes(bytes),
            _ => Err(ImportError::UnsupportedFormat(ext)),
        }
    }

    pub fn parse_path(&self, path: &Path) -> ImportResult<RawTable> {
        if !path.is_file() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        self.parse_named(&name, &bytes)
    }

    pub fn parse_source(&self, source: &ExtractSource) -> ImportResult<RawTable> {
        match source {
            ExtractSource::Path(p) => self.parse_path(p),
            ExtractSource::Bytes { name, data } => self.parse_named(name, data),
        }
    }
}

// ==========================================
// 分隔文本写出（按配置编码）
// ==========================================
pub fn write_delimited(table: &RawTable, format: &FileFormat) -> ImportResult<Vec<u8>> {
    let mut writer = WriterBuilder::new()
        .delimiter(format.delimiter)
        .quote_style(QuoteStyle::Necessary)
        .from_writer(Vec::new());

    writer.write_record(&table.headers)?;
    for row in &table.rows {
        writer.write_record(row)?;
    }
    let utf8 = writer
        .into_inner()
        .map_err(|e| ImportError::InternalError(e.to_string()))?;
    let text = String::from_utf8(utf8).map_err(|e| ImportError::InternalError(e.to_string()))?;

    // 无法映射的字符以数字字符引用写出
    let (encoded, _, had_unmappable) = format.encoding.encode(&text);
    if had_unmappable {
        tracing::warn!(encoding = format.encoding.name(), "存在目标编码无法表示的字符");
    }
    Ok(encoded.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn cp1252(text: &str) -> Vec<u8> {
        encoding_rs::WINDOWS_1252.encode(text).0.into_owned()
    }

    #[test]
    fn test_csv_parser_decodes_windows_1252() {
        let bytes = cp1252("Nom;Compétence\nZoé;A1\n");
        let table = CsvParser::new(FileFormat::default()).parse_bytes(&bytes).unwrap();

        assert_eq!(table.headers, vec!["Nom", "Compétence"]);
        assert_eq!(table.rows, vec![vec!["Zoé".to_string(), "A1".to_string()]]);
    }

    #[test]
    fn test_csv_parser_pads_short_rows_and_skips_blank() {
        let bytes = cp1252("a;b;c\n1;2\n;;\n4;5;6;7\n");
        let table = CsvParser::new(FileFormat::default()).parse_bytes(&bytes).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0], vec!["1", "2", ""]);
        assert_eq!(table.rows[1], vec!["4", "5", "6"]);
    }

    #[test]
    fn test_csv_parser_rejects_empty_input() {
        let result = CsvParser::new(FileFormat::default()).parse_bytes(b"");
        assert!(matches!(result, Err(ImportError::MissingHeader(_))));
    }

    #[test]
    fn test_universal_parser_file_not_found() {
        let parser = UniversalFileParser::new(FileFormat::default());
        let result = parser.parse_path(Path::new("non_existent.csv"));
        assert!(matches!(result, Err(ImportError::FileNotFound(_))));
    }

    #[test]
    fn test_universal_parser_rejects_unknown_extension() {
        let parser = UniversalFileParser::new(FileFormat::default());
        let result = parser.parse_named("data.json", b"{}");
        assert!(matches!(result, Err(ImportError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_universal_parser_reads_path() {
        let mut temp_file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        temp_file.write_all(&cp1252("x;y\n1;2\n")).unwrap();

        let parser = UniversalFileParser::new(FileFormat::default());
        let table = parser.parse_path(temp_file.path()).unwrap();
        assert_eq!(table.cell(0, 1), "2");
    }

    #[test]
    fn test_write_delimited_encodes_and_quotes() {
        let table = RawTable::new(
            vec!["Nom".to_string(), "Note".to_string()],
            vec![vec!["Zoé".to_string(), "a;b".to_string()]],
        );
        let bytes = write_delimited(&table, &FileFormat::default()).unwrap();
        assert_eq!(bytes, cp1252("Nom;Note\nZoé;\"a;b\"\n"));
    }

    #[test]
    fn test_ensure_column_appends_once() {
        let mut table = RawTable::new(vec!["a".to_string()], vec![vec!["1".to_string()]]);
        let idx = table.ensure_column("b");
        assert_eq!(idx, 1);
        assert_eq!(table.ensure_column("b"), 1);
        table.set_cell(0, idx, "x");
        assert_eq!(table.cell(0, 1), "x");
    }
}
