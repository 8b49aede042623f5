//! 提供静态文件并为目录生成索引页的HTTP服务器。
//!
//! 目录请求交给 [`listing::ListingService`] 处理，根据查询参数 `format`
//! 返回 HTML、JSON 或纯文本格式的索引；其余路径按普通文件提供，支持范围请求和条件请求。

#![forbid(unsafe_code)]
#![deny(unreachable_pub)]
#![warn(missing_debug_implementations)]
#![cfg_attr(docsrs, feature(doc_auto_cfg, doc_cfg))]

pub use dirheader_core::{Format, Listing, Locale};

pub mod body;
pub mod config;
pub mod listener;
pub mod listing;
pub mod response;
pub mod server;
pub mod service;
pub mod static_file;

/// 类型擦除的错误类型别名
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
