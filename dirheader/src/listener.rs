//! 连接的监听器。

use std::future::Future;
use std::io;
use std::net::SocketAddr;

/// 连接的地址信息，服务器会将其插入到请求的扩展中。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionInfo {
    /// 本地地址。
    pub local: SocketAddr,
    /// 对端地址。
    pub remote: SocketAddr,
}

/// 接受新连接的监听器。
pub trait Listener {
    /// 连接的类型。
    type IO;
    /// 监听器的错误类型。
    type Error;

    /// 等待并接受一个新连接。
    fn accept(
        &mut self,
    ) -> impl Future<Output = Result<(Self::IO, Option<ConnectionInfo>), Self::Error>> + Send;
}

impl Listener for tokio::net::TcpListener {
    type IO = tokio::net::TcpStream;
    type Error = io::Error;

    async fn accept(&mut self) -> io::Result<(Self::IO, Option<ConnectionInfo>)> {
        tokio::net::TcpListener::accept(self)
            .await
            .and_then(|(conn, remote)| {
                self.local_addr()
                    .map(|local| (conn, Some(ConnectionInfo { local, remote })))
            })
    }
}
