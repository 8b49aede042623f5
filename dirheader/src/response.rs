//! HTTP响应。

use dirheader_core::Rendered;
use http::{header, HeaderValue, StatusCode};

use crate::body::Body;

/// HTTP响应。
pub type Response<T = Body> = http::Response<T>;

/// 可以转换为响应的类型。
pub trait IntoResponse {
    /// 转换为响应。
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response {
        self
    }
}

impl IntoResponse for StatusCode {
    fn into_response(self) -> Response {
        let mut res = Response::new(Body::empty());
        *res.status_mut() = self;
        res
    }
}

/// 纯文本的错误响应，主体为消息加换行。
impl IntoResponse for (StatusCode, &'static str) {
    fn into_response(self) -> Response {
        let (status, message) = self;
        let mut res = Response::new(Body::from(format!("{message}\n")));
        *res.status_mut() = status;
        res.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(mime::TEXT_PLAIN_UTF_8.as_ref()),
        );
        res.headers_mut().insert(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        );
        res
    }
}

impl IntoResponse for Rendered {
    fn into_response(self) -> Response {
        let mut res = Response::new(Body::from(self.body));
        res.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(self.content_type),
        );
        res
    }
}
