use std::future::Future;
use std::time::Duration;

use hyper_util::server::graceful::{self, GracefulConnection};

/// 跟踪服务器上所有的连接，关机时通知它们在处理完当前请求后关闭。
pub struct GracefulShutdown(graceful::GracefulShutdown);

impl std::fmt::Debug for GracefulShutdown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("GracefulShutdown").finish()
    }
}

impl GracefulShutdown {
    pub(super) fn new() -> Self {
        Self(graceful::GracefulShutdown::new())
    }

    /// 跟踪一个连接，返回的future需要被驱动直到连接结束。
    pub(super) fn watch<C>(&self, conn: C) -> impl Future<Output = C::Output>
    where
        C: GracefulConnection,
    {
        self.0.watch(conn)
    }

    /// 通知所有连接关闭，并在指定时间内等待它们结束。
    ///
    /// 超时时间为 `None` 时一直等待。返回 `false` 表示超时时仍有连接未结束。
    pub async fn shutdown(self, timeout: Option<Duration>) -> bool {
        let closed = self.0.shutdown();
        match timeout {
            Some(timeout) => tokio::time::timeout(timeout, closed).await.is_ok(),
            None => {
                closed.await;
                true
            }
        }
    }
}
