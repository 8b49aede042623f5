//! HTTP服务器。

mod graceful_shutdown;
pub use graceful_shutdown::GracefulShutdown;

use std::convert::Infallible;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use http::Request;
use hyper::body::Incoming;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::Instrument;

use crate::listener::{ConnectionInfo, Listener};
use crate::response::{IntoResponse, Response};
use crate::service::Service;
use crate::BoxError;

/// HTTP服务器。
///
/// 每个连接在独立的任务中处理，请求之间不共享可变状态。
pub struct Server<L> {
    listener: L,
    builder: Builder<TokioExecutor>,
}

impl<L> std::fmt::Debug for Server<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("listener", &std::any::type_name::<L>())
            .field("builder", &self.builder)
            .finish()
    }
}

impl<L> Server<L>
where
    L: Listener,
    L::IO: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// 使用指定的监听器创建服务器。
    pub fn new(listener: L) -> Self {
        Self {
            listener,
            builder: Builder::new(TokioExecutor::new()),
        }
    }

    /// 运行服务器，直到关机信号完成。
    ///
    /// 关机信号的输出是等待剩余连接的超时时间，`None` 表示一直等待。
    pub async fn run_with_graceful_shutdown<S, G>(
        &mut self,
        service: S,
        signal: G,
    ) -> Result<(), RunError<L::Error>>
    where
        S: Service<Request<Incoming>, Response = Response> + 'static,
        S::Error: IntoResponse + Display,
        G: Future<Output = Option<Duration>> + Send + 'static,
    {
        let mut signal = std::pin::pin!(signal);
        let service = Arc::new(service);
        let graceful = GracefulShutdown::new();

        let timeout = loop {
            tokio::select! {
                timeout = signal.as_mut() => {
                    break timeout;
                }
                incoming = self.listener.accept() => {
                    let (conn, info) = match incoming {
                        Ok(value) => value,
                        Err(e) => return Err(RunError::Listener(e, graceful)),
                    };

                    let service = service.clone();
                    let service = hyper::service::service_fn(move |mut req: Request<Incoming>| {
                        if let Some(info) = info {
                            req.extensions_mut().insert(info);
                        }
                        let service = service.clone();
                        async move { Ok::<_, Infallible>(handle(&*service, req).await) }
                    });

                    let conn = self
                        .builder
                        .serve_connection(TokioIo::new(conn), service)
                        .into_owned();
                    let conn = graceful.watch(conn);

                    tokio::spawn(async move {
                        if let Err(e) = conn.await {
                            let e = ResponseWriteError(e);
                            tracing::warn!(remote = ?info.map(|info| info.remote), error = %e, "connection closed with error");
                        }
                    });
                }
            }
        };

        tracing::info!(?timeout, "shutting down");

        if !graceful.shutdown(timeout).await {
            return Err(RunError::GracefulShutdownTimeout);
        }

        Ok(())
    }
}

async fn handle<S>(service: &S, req: Request<Incoming>) -> Response
where
    S: Service<Request<Incoming>, Response = Response>,
    S::Error: IntoResponse + Display,
{
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    let remote = req
        .extensions()
        .get::<ConnectionInfo>()
        .map(|info| info.remote);

    let span = tracing::info_span!("request", %method, %path);
    let res = match service.call(req).instrument(span).await {
        Ok(res) => res,
        Err(e) => {
            let error = e.to_string();
            let res = e.into_response();
            if res.status().is_server_error() {
                tracing::error!(%method, %path, %error, "request failed");
            } else {
                tracing::debug!(%method, %path, %error, "request rejected");
            }
            res
        }
    };

    tracing::info!(
        %method,
        %path,
        ?remote,
        status = res.status().as_u16(),
        elapsed = ?start.elapsed(),
        "request"
    );

    res
}

/// 服务器运行错误。
#[derive(Debug)]
pub enum RunError<E> {
    /// 优雅关机超时。
    GracefulShutdownTimeout,
    /// 监听器发生错误。
    Listener(E, GracefulShutdown),
}

impl<E: std::fmt::Display> std::fmt::Display for RunError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunError::GracefulShutdownTimeout => write!(f, "server graceful shutdown timeout"),
            RunError::Listener(e, _) => {
                write!(f, "the server encountered an error while running ({e})")
            }
        }
    }
}

impl<E: std::error::Error> std::error::Error for RunError<E> {}

/// 发送响应时连接出错，例如客户端提前断开。
///
/// 此时响应可能已经发送了一部分，因此只记录日志，不会重试。
#[derive(Debug)]
pub struct ResponseWriteError(BoxError);

impl std::fmt::Display for ResponseWriteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "error writing body ({})", self.0)
    }
}

impl std::error::Error for ResponseWriteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&*self.0)
    }
}
