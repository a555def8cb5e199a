//! Proxy collaborator: forwards a request upstream and reports the outcome as
//! data. Implementations never fail; transport problems come back as a
//! [`ProxyResponse`] with `status == 0`.

mod client;
mod types;

use std::sync::Arc;

use async_trait::async_trait;

pub use client::{infer_content_type, prepare_body, ProxyError, ReqwestProxy};
pub use types::{HttpMethod, ProxyRequest, ProxyResponse, StatusClass};

/// Anything that can execute a proxied request
#[async_trait]
pub trait ProxyInvoke: Send + Sync {
    async fn invoke(&self, request: ProxyRequest) -> ProxyResponse;
}

#[async_trait]
impl<T: ProxyInvoke + ?Sized> ProxyInvoke for Arc<T> {
    async fn invoke(&self, request: ProxyRequest) -> ProxyResponse {
        (**self).invoke(request).await
    }
}
