//! 服务的特征。

use std::future::Future;

/// 处理请求并异步返回响应的服务。
pub trait Service<Req>: Send + Sync {
    /// 成功时的响应。
    type Response;
    /// 失败时的错误。
    type Error;

    /// 处理请求。
    fn call(&self, req: Req) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send;
}
