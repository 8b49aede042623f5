//! 目录索引服务。
//!
//! 每个请求依次经过读取、规范化、渲染和响应四个阶段，任一阶段失败即结束，不会重试。

use std::path::PathBuf;

use dirheader_core::{
    build_header, DirEntries, DirectoryReadError, Format, Listing, Locale, RenderError,
};
use http::StatusCode;
use serde::Deserialize;
use tokio::task::JoinError;

use crate::response::{IntoResponse, Response};

/// 处理单个目录请求所处的阶段。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListingStage {
    /// 读取目录条目。
    Reading,
    /// 获取元数据并生成条目。
    Normalizing,
    /// 渲染输出。
    Rendering,
    /// 写出响应。
    Responding,
}

impl std::fmt::Display for ListingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ListingStage::Reading => "reading",
            ListingStage::Normalizing => "normalizing",
            ListingStage::Rendering => "rendering",
            ListingStage::Responding => "responding",
        })
    }
}

/// 为目录生成索引页的服务。
///
/// 只持有不可变的配置，可以在多个请求之间共享。
#[derive(Debug, Clone, Copy, Default)]
pub struct ListingService {
    locale: Locale,
}

impl ListingService {
    /// 使用指定语言创建服务。
    pub fn new(locale: Locale) -> Self {
        Self { locale }
    }

    /// 读取目录 `dir` 并以指定格式生成响应。
    ///
    /// `dir` 应当是已经确认存在的目录，`path` 是对应的、已经清理过的请求路径。
    /// 读取目录的阻塞操作在 tokio 的阻塞线程池中执行。
    pub async fn respond(
        &self,
        dir: PathBuf,
        path: &str,
        format: Format,
    ) -> Result<Response, ListingError> {
        let header = build_header(path, self.locale);

        let span = tracing::Span::current();
        let rows = tokio::task::spawn_blocking(move || {
            let _enter = span.enter();
            tracing::trace!(stage = %ListingStage::Reading, dir = %dir.display());
            let entries = DirEntries::read(dir)?;

            tracing::trace!(stage = %ListingStage::Normalizing, entries = entries.len());
            Ok::<_, DirectoryReadError>(entries.normalize())
        })
        .await??;

        tracing::trace!(stage = %ListingStage::Rendering, ?format);
        let rendered = Listing::new(header, rows).render(format)?;

        tracing::trace!(stage = %ListingStage::Responding, bytes = rendered.body.len());
        Ok(rendered.into_response())
    }
}

/// 目录索引的查询参数。
#[derive(Debug, Default, Deserialize)]
struct ListingQuery {
    format: Option<String>,
}

/// 根据查询字符串中的 `format` 参数选择输出格式。
///
/// 查询字符串无法解析、参数缺失或取值未知时均为 HTML。
pub fn format_from_query(query: Option<&str>) -> Format {
    let query: ListingQuery = query
        .and_then(|query| serde_urlencoded::from_str(query).ok())
        .unwrap_or_default();
    Format::from_query(query.format.as_deref())
}

/// 生成目录索引失败。
#[derive(Debug)]
pub enum ListingError {
    /// 无法读取目录。
    Read(DirectoryReadError),
    /// 读取目录的阻塞任务没有完成。
    Task(JoinError),
    /// 渲染失败。
    Render(RenderError),
}

impl ListingError {
    /// 失败时所处的阶段。
    pub fn stage(&self) -> ListingStage {
        match self {
            ListingError::Read(_) | ListingError::Task(_) => ListingStage::Reading,
            ListingError::Render(_) => ListingStage::Rendering,
        }
    }

    /// 响应的状态码。
    pub fn status(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    /// 返回给客户端的提示信息，不包含底层错误。
    pub fn message(&self) -> &'static str {
        match self.stage() {
            ListingStage::Rendering => "Error render",
            _ => "Error reading directory",
        }
    }
}

impl IntoResponse for ListingError {
    fn into_response(self) -> Response {
        (self.status(), self.message()).into_response()
    }
}

impl std::fmt::Display for ListingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListingError::Read(e) => write!(f, "{e}"),
            ListingError::Task(e) => write!(f, "error reading directory ({e})"),
            ListingError::Render(e) => write!(f, "error render ({e})"),
        }
    }
}

impl std::error::Error for ListingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ListingError::Read(e) => Some(e),
            ListingError::Task(e) => Some(e),
            ListingError::Render(e) => Some(e),
        }
    }
}

impl From<DirectoryReadError> for ListingError {
    fn from(error: DirectoryReadError) -> Self {
        ListingError::Read(error)
    }
}

impl From<JoinError> for ListingError {
    fn from(error: JoinError) -> Self {
        ListingError::Task(error)
    }
}

impl From<RenderError> for ListingError {
    fn from(error: RenderError) -> Self {
        ListingError::Render(error)
    }
}
