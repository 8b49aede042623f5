//! 命令行与环境变量配置。

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use dirheader_core::Locale;

use crate::static_file::ServeDir;

/// 服务器配置。
#[derive(Debug, Clone, Parser)]
#[command(name = "dirheader", version, about = "Serve a directory tree over HTTP")]
pub struct Config {
    /// 监听地址
    #[arg(long, env = "DIRHEADER_BIND", default_value = "0.0.0.0:8080")]
    pub bind: String,

    /// 根目录
    #[arg(long, env = "DIRHEADER_ROOT", default_value = "/")]
    pub root: PathBuf,

    /// 索引页的语言（en 或 zh）
    #[arg(long, env = "DIRHEADER_LOCALE", default_value = "en")]
    pub locale: Locale,

    /// 关机时等待剩余连接的秒数
    #[arg(long, env = "DIRHEADER_SHUTDOWN_TIMEOUT", default_value_t = 30)]
    pub shutdown_timeout: u64,
}

impl Config {
    /// 关机时等待剩余连接的时长。
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout)
    }

    /// 按照配置创建文件服务。
    pub fn serve_dir(&self) -> ServeDir {
        ServeDir::new(&self.root).locale(self.locale)
    }
}

/// 启动提示中显示的地址，`[::]` 显示为 `0.0.0.0`。
pub fn display_addr(addr: SocketAddr) -> String {
    if addr.ip().is_unspecified() {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), addr.port()).to_string()
    } else {
        addr.to_string()
    }
}
