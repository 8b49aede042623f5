//! 目录列表的渲染。

mod html;

use crate::Listing;

/// 输出格式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Format {
    /// 基于内置模板的 HTML 页面。
    #[default]
    Html,
    /// 包含页头和条目的 JSON 文档。
    Json,
    /// 每行一个名称的纯文本，目录以 `/` 结尾。
    Plain,
}

impl Format {
    /// 根据查询参数 `format` 的值选择格式。
    ///
    /// `json` 对应 [`Format::Json`]，`simple` 对应 [`Format::Plain`]，
    /// 其余取值以及缺失时均为 [`Format::Html`]。
    pub fn from_query(value: Option<&str>) -> Self {
        match value {
            Some("json") => Format::Json,
            Some("simple") => Format::Plain,
            _ => Format::Html,
        }
    }

    /// 该格式的 `Content-Type`。
    pub fn content_type(self) -> &'static str {
        match self {
            Format::Html => "text/html; charset=utf-8",
            Format::Json => "application/json",
            Format::Plain => "text/plain",
        }
    }
}

/// 渲染结果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    /// 响应主体。
    pub body: Vec<u8>,
    /// 响应的 `Content-Type`。
    pub content_type: &'static str,
}

/// 将目录列表渲染为指定格式。
///
/// 渲染要么完整成功，要么返回 [`RenderError`]，不会产生不完整的页面。
pub fn render(listing: &Listing, format: Format) -> Result<Rendered, RenderError> {
    let body = match format {
        Format::Html => html::render_html(listing)?,
        Format::Json => serde_json::to_vec(listing)?,
        Format::Plain => render_plain(listing),
    };
    Ok(Rendered {
        body,
        content_type: format.content_type(),
    })
}

fn render_plain(listing: &Listing) -> Vec<u8> {
    let mut out = String::new();
    for row in &listing.rows {
        out.push_str(&row.name);
        if row.is_dir {
            out.push('/');
        }
        out.push('\n');
    }
    out.into_bytes()
}

/// 渲染失败。
#[derive(Debug)]
pub enum RenderError {
    /// 序列化 JSON 失败。
    Json(serde_json::Error),
}

impl std::fmt::Display for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderError::Json(e) => write!(f, "failed to serialize listing ({e})"),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::Json(e) => Some(e),
        }
    }
}

impl From<serde_json::Error> for RenderError {
    fn from(error: serde_json::Error) -> Self {
        RenderError::Json(error)
    }
}
