//! `dirheader`的目录读取与渲染核心。
//!
//! 读取目录条目并规范化为 [`Row`]，根据请求路径和语言构建 [`DirectoryHeader`]，
//! 最后将二者组成的 [`Listing`] 渲染为 HTML、JSON 或纯文本。

#![forbid(unsafe_code)]
#![warn(
    missing_debug_implementations,
    missing_docs,
    rust_2018_idioms,
    unreachable_pub
)]
#![cfg_attr(docsrs, feature(doc_auto_cfg, doc_cfg))]

pub mod entry;
pub mod header;
pub mod render;
pub mod size;

mod listing;

pub use entry::{read_rows, DirEntries, DirectoryReadError, Row, SymlinkResolutionError};
pub use header::{build_header, DirectoryHeader, Locale, ParseLocaleError, TextDirection};
pub use listing::Listing;
pub use render::{render, Format, RenderError, Rendered};
