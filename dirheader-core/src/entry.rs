//! 目录条目的读取与规范化。

use std::borrow::Cow;
use std::ffi::{OsStr, OsString};
use std::fs::{self, DirEntry, Metadata};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Local};
use percent_encoding::{AsciiSet, CONTROLS};
use serde::{Deserialize, Serialize};

use crate::size::format_size;

/// 路径段中需要转义的字符。
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

const DATE_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// 目录中一个条目的规范化表示，可直接用于渲染。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Row {
    /// 条目名称，不带结尾的斜杠。
    pub name: String,
    /// 由名称转义得到的相对链接。
    pub url: String,
    /// 是否为目录，指向目录的符号链接也视为目录。
    #[serde(rename = "isdir")]
    pub is_dir: bool,
    /// 字节数。符号链接取目标的大小，无法解析时为 0。
    pub size: i64,
    /// 便于阅读的大小，见 [`format_size`]。
    pub size_string: String,
    /// 修改时间的 Unix 时间戳（秒），未知时为 0。
    pub date_modified: i64,
    /// 服务器本地时区的修改时间，格式为 `YYYY/MM/DD HH:MM:SS`。
    pub date_modified_string: String,
}

impl Row {
    fn new(name: &OsStr, stat: &EntryStat) -> Self {
        Row {
            name: name.to_string_lossy().into_owned(),
            url: entry_url(name),
            is_dir: stat.is_dir,
            size: stat.size,
            size_string: format_size(stat.size),
            date_modified: unix_seconds(stat.modified),
            date_modified_string: local_time_string(stat.modified),
        }
    }
}

/// 已读取并按名称排序、尚未获取元数据的目录条目。
#[derive(Debug)]
pub struct DirEntries {
    entries: Vec<(OsString, DirEntry)>,
}

impl DirEntries {
    /// 读取目录中的全部条目，并按名称的字节序排序。
    ///
    /// 目录不存在、不是目录、没有权限或读取中途出错时返回 [`DirectoryReadError`]。
    pub fn read(dir: impl Into<PathBuf>) -> Result<Self, DirectoryReadError> {
        let mut entries = fs::read_dir(dir.into())?
            .map(|entry| entry.map(|entry| (entry.file_name(), entry)))
            .collect::<io::Result<Vec<_>>>()?;
        entries.sort_by(|(a, _), (b, _)| a.cmp(b));
        Ok(Self { entries })
    }

    /// 条目数量。
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 目录是否为空。
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 获取每个条目的元数据，生成与条目顺序一致的 [`Row`] 序列。
    ///
    /// 单个条目的失败不会中断整个目录：无法解析的符号链接以及读取元数据失败的条目，
    /// 都以大小 0、Unix 纪元时间、非目录的形式出现。
    pub fn normalize(self) -> Vec<Row> {
        self.entries
            .iter()
            .map(|(name, entry)| Row::new(name, &stat_entry(entry)))
            .collect()
    }
}

/// 读取目录并生成按名称排序的 [`Row`] 序列。
///
/// 等价于 [`DirEntries::read`] 之后调用 [`DirEntries::normalize`]。
pub fn read_rows(dir: impl Into<PathBuf>) -> Result<Vec<Row>, DirectoryReadError> {
    DirEntries::read(dir).map(DirEntries::normalize)
}

struct EntryStat {
    is_dir: bool,
    size: i64,
    modified: SystemTime,
}

impl EntryStat {
    fn stub() -> Self {
        Self {
            is_dir: false,
            size: 0,
            modified: UNIX_EPOCH,
        }
    }
}

impl From<&Metadata> for EntryStat {
    fn from(meta: &Metadata) -> Self {
        Self {
            is_dir: meta.is_dir(),
            size: i64::try_from(meta.len()).unwrap_or(i64::MAX),
            modified: meta.modified().unwrap_or(UNIX_EPOCH),
        }
    }
}

fn stat_entry(entry: &DirEntry) -> EntryStat {
    // `DirEntry::metadata` 不会跟随符号链接。
    let meta = match entry.metadata() {
        Ok(meta) => meta,
        Err(e) => {
            tracing::debug!(path = %entry.path().display(), error = %e, "entry metadata unavailable");
            return EntryStat::stub();
        }
    };

    if !meta.file_type().is_symlink() {
        return EntryStat::from(&meta);
    }

    match resolve_symlink(&entry.path()) {
        Ok(target) => EntryStat::from(&target),
        Err(e) => {
            tracing::debug!(error = %e, "listing symlink as stub");
            EntryStat::stub()
        }
    }
}

fn resolve_symlink(link: &Path) -> Result<Metadata, SymlinkResolutionError> {
    let target = fs::canonicalize(link).map_err(|e| SymlinkResolutionError::new(link, e))?;
    fs::metadata(&target).map_err(|e| SymlinkResolutionError::new(link, e))
}

fn entry_url(name: &OsStr) -> String {
    let url = percent_encoding::percent_encode(&name_bytes(name), SEGMENT).to_string();
    // 避免第一个路径段被当作 URL 协议。
    if url.contains(':') {
        format!("./{url}")
    } else {
        url
    }
}

#[cfg(unix)]
fn name_bytes(name: &OsStr) -> Cow<'_, [u8]> {
    use std::os::unix::ffi::OsStrExt;
    Cow::Borrowed(name.as_bytes())
}

#[cfg(not(unix))]
fn name_bytes(name: &OsStr) -> Cow<'_, [u8]> {
    match name.to_string_lossy() {
        Cow::Borrowed(s) => Cow::Borrowed(s.as_bytes()),
        Cow::Owned(s) => Cow::Owned(s.into_bytes()),
    }
}

fn unix_seconds(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => i64::try_from(d.as_secs()).unwrap_or(i64::MAX),
        Err(e) => i64::try_from(e.duration().as_secs()).map_or(i64::MIN, |secs| -secs),
    }
}

fn local_time_string(time: SystemTime) -> String {
    DateTime::<Local>::from(time).format(DATE_FORMAT).to_string()
}

/// 无法列出目录时的错误。
#[derive(Debug)]
pub struct DirectoryReadError(io::Error);

impl std::fmt::Display for DirectoryReadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "error reading directory ({})", self.0)
    }
}

impl std::error::Error for DirectoryReadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

impl From<io::Error> for DirectoryReadError {
    fn from(error: io::Error) -> Self {
        DirectoryReadError(error)
    }
}

/// 无法解析符号链接或获取其目标元数据时的错误。
///
/// 该错误只影响对应的条目，不会传递给调用者。
#[derive(Debug)]
pub struct SymlinkResolutionError {
    link: PathBuf,
    error: io::Error,
}

impl SymlinkResolutionError {
    fn new(link: &Path, error: io::Error) -> Self {
        Self {
            link: link.to_path_buf(),
            error,
        }
    }
}

impl std::fmt::Display for SymlinkResolutionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "failed to resolve symlink `{}` ({})",
            self.link.display(),
            self.error
        )
    }
}

impl std::error::Error for SymlinkResolutionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}
