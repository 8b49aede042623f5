//! HTML 索引页。

use maud::{html, Markup, PreEscaped, DOCTYPE};

use super::RenderError;
use crate::{Listing, Row};

const STYLE: &str = include_str!("../../templates/dir_header.css");
const SCRIPT: &str = include_str!("../../templates/dir_header.js");

pub(super) fn render_html(listing: &Listing) -> Result<Vec<u8>, RenderError> {
    let rows_json = rows_json(&listing.rows)?;
    Ok(page(listing, &rows_json).into_string().into_bytes())
}

fn page(listing: &Listing, rows_json: &str) -> Markup {
    let header = &listing.header;
    let parent = header
        .parent_dir_text
        .as_deref()
        .filter(|text| !text.is_empty());

    html! {
        (DOCTYPE)
        html dir=(header.text_direction.as_str()) lang=(header.language) {
            head {
                meta charset="utf-8";
                meta name="color-scheme" content="light dark";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (header.title) }
                style { (PreEscaped(STYLE)) }
            }
            body {
                h1 id="header" { (header.title) }
                @if let Some(text) = parent {
                    div id="parentDirLinkBox" {
                        a id="parentDirLink" class="icon up" href=".." { (text) }
                    }
                }
                table {
                    thead {
                        tr class="header" id="theader" {
                            th data-column="0" { (header.header_name) }
                            th data-column="1" class="detailsColumn" { (header.header_size) }
                            th data-column="2" class="detailsColumn" { (header.header_date_modified) }
                        }
                    }
                    tbody id="tbody" {
                        @for row in &listing.rows {
                            (table_row(row))
                        }
                    }
                }
                script type="application/json" id="rows" { (PreEscaped(rows_json)) }
                script { (PreEscaped(SCRIPT)) }
            }
        }
    }
}

fn table_row(row: &Row) -> Markup {
    let (class, href, label) = if row.is_dir {
        ("icon dir", format!("{}/", row.url), format!("{}/", row.name))
    } else {
        ("icon file", row.url.clone(), row.name.clone())
    };

    html! {
        tr {
            td data-value=(row.name) {
                a class=(class) href=(href) { (label) }
            }
            // 目录的大小没有意义，页面上留空。
            td class="detailsColumn" data-value=(row.size) {
                @if !row.is_dir {
                    (row.size_string)
                }
            }
            td class="detailsColumn" data-value=(row.date_modified) {
                (row.date_modified_string)
            }
        }
    }
}

/// 嵌在 `<script>` 中的条目 JSON。
///
/// `<`、`>`、`&` 以及 U+2028、U+2029 都只可能出现在字符串内部，
/// 替换为 `\uXXXX` 后 JSON 的值不变，且任何名称都无法闭合 `<script>` 元素。
fn rows_json(rows: &[Row]) -> Result<String, RenderError> {
    let json = serde_json::to_string(rows)?;
    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        match c {
            '<' => out.push_str("\\u003c"),
            '>' => out.push_str("\\u003e"),
            '&' => out.push_str("\\u0026"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c => out.push(c),
        }
    }
    Ok(out)
}
