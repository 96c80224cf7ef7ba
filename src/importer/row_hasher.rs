// ==========================================
// 排班派工系统 - 行内容哈希
// ==========================================
// 哈希 = SHA-256( 按规范化列名排序后的单元格值，以 U+241F 连接 )
// 列顺序与源文件列顺序无关；分区值作为 partition_tag 列参与排序
// ==========================================

use sha2::{Digest, Sha256};

/// 单元格分隔符（SYMBOL FOR UNIT SEPARATOR）
pub const CELL_SEPARATOR: char = '\u{241F}';

/// 计算一行的内容哈希（64 位十六进制）
///
/// # 参数
/// - cells: (规范化列名, 单元格值) 列表，顺序任意
pub fn row_hash<'a, I>(cells: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut ordered: Vec<(&str, &str)> = cells.into_iter().collect();
    ordered.sort_by(|a, b| a.0.cmp(b.0));

    let mut hasher = Sha256::new();
    let mut buf = [0u8; 4];
    for (idx, (_, value)) in ordered.iter().enumerate() {
        if idx > 0 {
            hasher.update(CELL_SEPARATOR.encode_utf8(&mut buf).as_bytes());
        }
        hasher.update(value.trim().as_bytes());
    }
    hex::encode(hasher.finalize())
}
