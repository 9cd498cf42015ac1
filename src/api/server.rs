//! 监听与启动

use std::io;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::warn;

use crate::config::ServerConfig;
use crate::orchestrator::Pipeline;
use crate::utils::logging;

/// 绑定端口，被占用时依次尝试下一个端口
///
/// 最多尝试 `attempts` 个端口；非"端口占用"类错误立即返回。
pub async fn bind_with_fallback(host: &str, port: u16, attempts: u16) -> io::Result<TcpListener> {
    let mut last_error = None;

    for offset in 0..attempts.max(1) {
        let Some(candidate) = port.checked_add(offset) else {
            break;
        };
        match TcpListener::bind((host, candidate)).await {
            Ok(listener) => return Ok(listener),
            Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
                warn!("⚠️ 端口 {} 已被占用，尝试下一个端口", candidate);
                last_error = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    Err(last_error.unwrap_or_else(|| {
        io::Error::new(io::ErrorKind::AddrInUse, format!("没有可用端口 (起始 {})", port))
    }))
}

/// 启动 HTTP 服务直到进程退出
pub async fn serve(server: &ServerConfig, pipeline: Arc<Pipeline>) -> io::Result<()> {
    let listener = bind_with_fallback(&server.host, server.port, server.port_attempts).await?;
    logging::log_listening(&listener.local_addr()?);
    axum::serve(listener, super::router(pipeline)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_falls_back_to_next_port_when_taken() {
        let occupied = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let taken = occupied.local_addr().unwrap().port();

        let listener = bind_with_fallback("127.0.0.1", taken, 10).await.unwrap();
        let bound = listener.local_addr().unwrap().port();
        assert!(bound > taken && bound < taken.saturating_add(10));
    }

    #[tokio::test]
    async fn test_single_attempt_on_taken_port_fails() {
        let occupied = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let taken = occupied.local_addr().unwrap().port();

        let err = bind_with_fallback("127.0.0.1", taken, 1).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AddrInUse);
    }
}
