use itertools::Itertools;

use crate::types::{Attribute, Row};

/// 二进制结构体：表示未经过解码的字节数组
pub struct Raw;

impl Raw {
    /// Formats raw bytes as escaped ASCII strings.
    pub fn bytes(bytes: &[u8]) -> String {
        let escaped = bytes.iter().copied().flat_map(std::ascii::escape_default).collect_vec();
        format!("\"{}\"", String::from_utf8_lossy(&escaped))
    }
}

/// 把查询结果渲染成带边框的文本表格
///
/// 每列的宽度取表头和所有值中最长的一个，表头大写。
pub fn render_table(headers: &[String], rows: &[Row]) -> String {
    let headers = headers.iter().map(|h| h.to_uppercase()).collect_vec();
    let widths = headers
        .iter()
        .enumerate()
        .map(|(idx, header)| {
            rows.iter()
                .filter_map(|row| row.get(idx))
                .map(|value| value.display_len())
                .chain([header.chars().count(), 1])
                .max()
                .unwrap_or(1)
        })
        .collect_vec();

    let border = format!("+{}+", widths.iter().map(|w| "-".repeat(w + 2)).join("+"));
    let line = |cells: Vec<String>| {
        let cells = cells.iter().zip(&widths).map(|(cell, &width)| format!(" {cell:<width$} ")).join("|");
        format!("|{cells}|")
    };

    let mut out = vec![border.clone(), line(headers.clone()), border.clone()];
    out.extend(rows.iter().map(|row| line(row.iter().map(|v| v.to_string()).collect())));
    out.push(border);
    out.join("\n")
}

/// DESCRIBE 的输出
pub fn render_schema(name: &str, schema: &[Attribute]) -> String {
    let separator = "-".repeat(49);
    let mut out = vec![format!("table_name [{name}]"), separator.clone()];
    out.push(format!("{:<30}{:<20}{:<10}{:<10}", "column_name", "type", "null", "key"));
    for attr in schema {
        let nullable = if attr.nullable { "Y" } else { "N" };
        out.push(
            format!("{:<30}{:<20}{:<10}{:<10}", attr.name, attr.type_name(), nullable, attr.key_marker())
                .trim_end()
                .to_string(),
        );
    }
    out.push(separator);
    out.join("\n")
}
