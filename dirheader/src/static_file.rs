//! 静态文件服务。

use std::borrow::Cow;
use std::fs::Metadata;
use std::io::{self, SeekFrom};
use std::ops::Bound;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::Poll;

use bytes::{Bytes, BytesMut};
use dirheader_core::Locale;
use futures_util::future::{self, Either};
use futures_util::{ready, stream, FutureExt, Stream, StreamExt};
use headers::{
    AcceptRanges, ContentLength, ContentRange, ContentType, HeaderMap, HeaderMapExt,
    IfModifiedSince, IfRange, IfUnmodifiedSince, LastModified, Range,
};
use http::request::Parts;
use http::{header, HeaderValue, Method, Request, StatusCode, Uri};
use tokio::fs::File as TkFile;
use tokio::io::AsyncSeekExt;
use tokio_util::io::poll_read_buf;

use crate::body::Body;
use crate::listing::{format_from_query, ListingError, ListingService};
use crate::response::{IntoResponse, Response};
use crate::service::Service;

/// 提供 `root` 下的文件，并为目录生成索引页。
///
/// 目录请求的路径必须以 `/` 结尾，否则重定向到以 `/` 结尾的地址，
/// 以保证索引页中的相对链接指向正确的位置。
///
/// # 例子
///
/// ```
/// use dirheader::static_file::ServeDir;
/// use dirheader::Locale;
///
/// let service = ServeDir::new("/srv/files").locale(Locale::Zh);
/// assert_eq!(service.root().to_str(), Some("/srv/files"));
/// ```
#[derive(Debug, Clone)]
pub struct ServeDir {
    root: PathBuf,
    listing: ListingService,
}

impl ServeDir {
    /// 使用指定的根目录创建 [`ServeDir`]。
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            listing: ListingService::default(),
        }
    }

    /// 设置索引页使用的语言，默认为英语。
    pub fn locale(mut self, locale: Locale) -> Self {
        self.listing = ListingService::new(locale);
        self
    }

    /// 根目录。
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl<B> Service<Request<B>> for ServeDir
where
    B: Send,
{
    type Response = Response;
    type Error = ServeError;

    async fn call(&self, req: Request<B>) -> Result<Self::Response, Self::Error> {
        let head = req.method() == Method::HEAD;
        if !head && req.method() != Method::GET {
            return Err(ServeError::NotFound);
        }

        let (parts, _) = req.into_parts();
        let mut res = self.respond(&parts).await?;
        if head {
            *res.body_mut() = Body::empty();
        }
        Ok(res)
    }
}

impl ServeDir {
    async fn respond(&self, req: &Parts) -> Result<Response, ServeError> {
        let Some(path) = clean_path(req.uri.path()) else {
            return Err(ServeError::NotFound);
        };
        let full_path = self.root.join(path.trim_start_matches('/'));

        let file = TkFile::open(&full_path).await.map_err(ServeError::from_io)?;
        let (file, meta) = metadata(file).await?;

        if !meta.is_dir() {
            let conditionals = Conditionals::from(&req.headers);
            return read_file(file, meta, &full_path, conditionals).await;
        }
        drop(file);

        if !path.ends_with('/') {
            return Ok(redirect_to_dir(&req.uri));
        }

        let format = format_from_query(req.uri.query());
        Ok(self.listing.respond(full_path, &path, format).await?)
    }
}

/// 清理请求路径并逐段解码。
///
/// 先按 `/` 切分再解码，编码后的 `%2F` 不会成为分隔符。
/// 合并重复的 `/`，去掉 `.`，在不越过根目录的前提下解析 `..`，保留结尾的 `/`。
/// 解码后含有 `/`、`\`（Windows 上还包括 `:`）的路径段视为无效。
fn clean_path(raw: &str) -> Option<String> {
    let mut segments: Vec<Cow<'_, str>> = Vec::new();
    for seg in raw.split('/') {
        let seg = percent_encoding::percent_decode_str(seg).decode_utf8().ok()?;
        if seg.is_empty() || seg == "." {
            continue;
        }
        if seg == ".." {
            segments.pop();
            continue;
        }
        if seg.contains(['/', '\\']) || (cfg!(windows) && seg.contains(':')) {
            return None;
        }
        segments.push(seg);
    }

    let mut path = String::with_capacity(raw.len() + 1);
    for seg in &segments {
        path.push('/');
        path.push_str(seg);
    }
    if segments.is_empty() || raw.ends_with('/') {
        path.push('/');
    }
    Some(path)
}

/// 重定向到以 `/` 结尾的目录地址。
///
/// `Location` 只包含请求路径的最后一段，是相对地址，无法指向其他主机。
fn redirect_to_dir(uri: &Uri) -> Response {
    let path = uri.path();
    let base = path.rsplit('/').next().unwrap_or(path);
    let location = match uri.query() {
        Some(query) => format!("{base}/?{query}"),
        None => format!("{base}/"),
    };

    let mut res = StatusCode::MOVED_PERMANENTLY.into_response();
    match HeaderValue::try_from(location) {
        Ok(location) => {
            res.headers_mut().insert(header::LOCATION, location);
        }
        Err(_) => *res.status_mut() = StatusCode::BAD_REQUEST,
    }
    res
}

#[derive(Debug)]
struct Conditionals {
    if_modified_since: Option<IfModifiedSince>,
    if_unmodified_since: Option<IfUnmodifiedSince>,
    if_range: Option<IfRange>,
    range: Option<Range>,
}

enum Cond {
    NoBody(Response),
    WithBody(Option<Range>),
}

impl Conditionals {
    fn check(self, last_modified: Option<LastModified>) -> Cond {
        if let Some(since) = self.if_unmodified_since {
            let precondition = last_modified
                .map(|time| since.precondition_passes(time.into()))
                .unwrap_or(false);

            if !precondition {
                return Cond::NoBody(StatusCode::PRECONDITION_FAILED.into_response());
            }
        }
        if let Some(since) = self.if_modified_since {
            // 没有修改时间的文件总是视为已修改。
            let unmodified = last_modified
                .map(|time| !since.is_modified(time.into()))
                .unwrap_or(false);

            if unmodified {
                return Cond::NoBody(StatusCode::NOT_MODIFIED.into_response());
            }
        }
        if let Some(if_range) = self.if_range {
            if if_range.is_modified(None, last_modified.as_ref()) {
                return Cond::WithBody(None);
            }
        }
        Cond::WithBody(self.range)
    }
}

impl From<&HeaderMap> for Conditionals {
    fn from(headers: &HeaderMap) -> Self {
        Self {
            if_modified_since: headers.typed_get(),
            if_unmodified_since: headers.typed_get(),
            if_range: headers.typed_get(),
            range: headers.typed_get(),
        }
    }
}

async fn metadata(f: TkFile) -> Result<(TkFile, Metadata), ServeError> {
    match f.metadata().await {
        Ok(meta) => Ok((f, meta)),
        Err(e) => Err(ServeError::from_io(e)),
    }
}

async fn read_file(
    file: TkFile,
    meta: Metadata,
    path: &Path,
    conditionals: Conditionals,
) -> Result<Response, ServeError> {
    let mut len = meta.len();
    let modified = meta.modified().ok().map(LastModified::from);

    let range = match conditionals.check(modified) {
        Cond::NoBody(res) => return Ok(res),
        Cond::WithBody(range) => range,
    };

    let Some((start, end)) = bytes_range(range, len) else {
        return Ok(range_not_satisfiable(len));
    };

    let sub_len = end - start;
    let buf_size = optimal_buf_size(&meta);
    let stream = file_to_stream(file, buf_size, (start, end));

    let mut res = Response::new(Body::from_stream(stream));

    if sub_len != len {
        let Ok(content_range) = ContentRange::bytes(start..end, len) else {
            return Ok(range_not_satisfiable(len));
        };
        *res.status_mut() = StatusCode::PARTIAL_CONTENT;
        res.headers_mut().typed_insert(content_range);
        len = sub_len;
    }

    let mime = mime_guess::from_path(path).first_or_octet_stream();

    res.headers_mut().typed_insert(ContentLength(len));
    res.headers_mut().typed_insert(ContentType::from(mime));
    res.headers_mut().typed_insert(AcceptRanges::bytes());

    if let Some(last_modified) = modified {
        res.headers_mut().typed_insert(last_modified);
    }

    Ok(res)
}

fn range_not_satisfiable(len: u64) -> Response {
    let mut res = StatusCode::RANGE_NOT_SATISFIABLE.into_response();
    res.headers_mut()
        .typed_insert(ContentRange::unsatisfied_bytes(len));
    res
}

/// 计算要发送的字节区间 `[start, end)`，无法满足时返回 `None`。
fn bytes_range(range: Option<Range>, max_len: u64) -> Option<(u64, u64)> {
    let Some(range) = range else {
        return Some((0, max_len));
    };

    let range = range
        .satisfiable_ranges(max_len)
        .map(|(start, end)| {
            let start = match start {
                Bound::Unbounded => 0,
                Bound::Included(s) => s,
                Bound::Excluded(s) => s + 1,
            };

            let end = match end {
                Bound::Unbounded => max_len,
                // 结尾恰好等于文件长度时不再加一。
                Bound::Included(s) if s == max_len => s,
                Bound::Included(s) => s + 1,
                Bound::Excluded(s) => s,
            };

            (start < end && end <= max_len).then_some((start, end))
        })
        .next()
        .unwrap_or(Some((0, max_len)));
    range
}

fn file_to_stream(
    mut file: TkFile,
    buf_size: usize,
    (start, end): (u64, u64),
) -> impl Stream<Item = Result<Bytes, io::Error>> + Send {
    let seek = async move {
        if start != 0 {
            file.seek(SeekFrom::Start(start)).await?;
        }
        Ok(file)
    };

    seek.into_stream()
        .map(move |result| {
            let mut buf = BytesMut::new();
            let mut len = end - start;

            let mut f = match result {
                Ok(f) => f,
                Err(e) => return Either::Left(stream::once(future::err(e))),
            };

            Either::Right(stream::poll_fn(move |cx| {
                if len == 0 {
                    return Poll::Ready(None);
                }
                if buf.capacity() - buf.len() < buf_size {
                    buf.reserve(buf_size);
                }

                let n = match ready!(poll_read_buf(Pin::new(&mut f), cx, &mut buf)) {
                    Ok(n) => n as u64,
                    Err(err) => return Poll::Ready(Some(Err(err))),
                };

                if n == 0 {
                    return Poll::Ready(None);
                }

                let mut chunk = buf.split().freeze();
                if n > len {
                    chunk = chunk.split_to(len as usize);
                    len = 0;
                } else {
                    len -= n;
                }

                Poll::Ready(Some(Ok(chunk)))
            }))
        })
        .flatten()
}

const DEFAULT_READ_BUF_SIZE: usize = 8_192;

fn optimal_buf_size(metadata: &Metadata) -> usize {
    // 文件比块小时不必分配整块的缓冲区。
    std::cmp::min(block_size(metadata) as u64, metadata.len()).max(1) as usize
}

#[cfg(unix)]
fn block_size(metadata: &Metadata) -> usize {
    use std::os::unix::fs::MetadataExt;
    usize::try_from(metadata.blksize())
        .unwrap_or(DEFAULT_READ_BUF_SIZE)
        .max(DEFAULT_READ_BUF_SIZE)
}

#[cfg(not(unix))]
fn block_size(_metadata: &Metadata) -> usize {
    DEFAULT_READ_BUF_SIZE
}

/// 提供文件或目录时的错误。
///
/// 转换为响应时只包含固定的提示信息，不会暴露底层错误或文件系统路径。
#[derive(Debug)]
pub enum ServeError {
    /// 文件不存在，或请求的方法和路径无效。
    NotFound,
    /// 没有访问权限。
    PermissionDenied(io::Error),
    /// 打开文件失败。
    OpenFailed(io::Error),
    /// 生成目录索引失败。
    Listing(ListingError),
}

impl ServeError {
    fn from_io(error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::NotFound => ServeError::NotFound,
            io::ErrorKind::PermissionDenied => ServeError::PermissionDenied(error),
            _ => ServeError::OpenFailed(error),
        }
    }

    /// 响应的状态码。
    pub fn status(&self) -> StatusCode {
        match self {
            ServeError::NotFound => StatusCode::NOT_FOUND,
            ServeError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            ServeError::OpenFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServeError::Listing(e) => e.status(),
        }
    }

    /// 返回给客户端的提示信息。
    pub fn message(&self) -> &'static str {
        match self {
            ServeError::NotFound => "404 page not found",
            ServeError::PermissionDenied(_) => "403 Forbidden",
            ServeError::OpenFailed(_) => "500 Internal Server Error",
            ServeError::Listing(e) => e.message(),
        }
    }
}

impl IntoResponse for ServeError {
    fn into_response(self) -> Response {
        (self.status(), self.message()).into_response()
    }
}

impl std::fmt::Display for ServeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServeError::NotFound => f.write_str("file not found"),
            ServeError::PermissionDenied(e) => write!(f, "file permission denied ({e})"),
            ServeError::OpenFailed(e) => write!(f, "file open failed ({e})"),
            ServeError::Listing(e) => std::fmt::Display::fmt(e, f),
        }
    }
}

impl std::error::Error for ServeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServeError::NotFound => None,
            ServeError::PermissionDenied(e) | ServeError::OpenFailed(e) => Some(e),
            ServeError::Listing(e) => Some(e),
        }
    }
}

impl From<ListingError> for ServeError {
    fn from(error: ListingError) -> Self {
        ServeError::Listing(error)
    }
}

#[cfg(test)]
mod tests {
    use headers::Range;
    use http::{header, StatusCode, Uri};

    use super::{bytes_range, clean_path, redirect_to_dir};

    #[test]
    fn clean_root() {
        assert_eq!(clean_path("/").as_deref(), Some("/"));
        assert_eq!(clean_path("").as_deref(), Some("/"));
        assert_eq!(clean_path("//").as_deref(), Some("/"));
    }

    #[test]
    fn clean_keeps_trailing_slash() {
        assert_eq!(clean_path("/bin/").as_deref(), Some("/bin/"));
        assert_eq!(clean_path("/bin").as_deref(), Some("/bin"));
        assert_eq!(clean_path("/a//b/./c/").as_deref(), Some("/a/b/c/"));
    }

    #[test]
    fn clean_resolves_parent_without_escaping_root() {
        assert_eq!(clean_path("/a/b/../c").as_deref(), Some("/a/c"));
        assert_eq!(clean_path("/../../etc/passwd").as_deref(), Some("/etc/passwd"));
        assert_eq!(clean_path("/%2e%2e/etc").as_deref(), Some("/etc"));
        assert_eq!(clean_path("/a/..").as_deref(), Some("/"));
    }

    #[test]
    fn clean_decodes() {
        assert_eq!(clean_path("/a%20b/").as_deref(), Some("/a b/"));
        assert_eq!(clean_path("/%E4%B8%AD").as_deref(), Some("/中"));
    }

    #[test]
    fn clean_decodes_after_splitting() {
        assert_eq!(clean_path("/bin%2F"), None);
        assert_eq!(clean_path("/a%2Fb/c"), None);
        assert_eq!(clean_path("/a%252F").as_deref(), Some("/a%2F"));
    }

    #[test]
    fn clean_rejects() {
        assert_eq!(clean_path("/a\\b"), None);
        assert_eq!(clean_path("/%5c"), None);
        assert_eq!(clean_path("/%ff"), None);
    }

    #[test]
    fn redirect_is_relative() {
        let res = redirect_to_dir(&Uri::from_static("/docs/bin?format=json"));
        assert_eq!(res.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(res.headers()[header::LOCATION], "bin/?format=json");

        let res = redirect_to_dir(&Uri::from_static("//evil.example"));
        assert_eq!(res.headers()[header::LOCATION], "evil.example/");
    }

    #[test]
    fn full_range_without_header() {
        assert_eq!(bytes_range(None, 10), Some((0, 10)));
    }

    #[test]
    fn partial_range() {
        let range = Range::bytes(2..5).unwrap();
        assert_eq!(bytes_range(Some(range), 10), Some((2, 5)));

        let range = Range::bytes(4..).unwrap();
        assert_eq!(bytes_range(Some(range), 10), Some((4, 10)));
    }
}
