//! 日志工具模块
//!
//! 初始化 tracing 订阅者，并提供启动信息的格式化输出

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// 初始化全局日志
///
/// `RUST_LOG` 优先；未设置时默认 `info`，`verbose` 为真时默认 `debug`。
/// 重复调用不会报错。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
///
/// # 参数
/// - `config`: 当前生效的配置
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 漫画目录与章节抓取服务");
    info!(
        "启动时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("📚 目录地址: {}", config.catalog_url);
    info!(
        "🖥️ 浏览器: {}",
        if config.browser.headless { "无头模式" } else { "有界面模式" }
    );
    info!("{}", "=".repeat(60));
}

/// 记录服务监听地址
pub fn log_listening(addr: &std::net::SocketAddr) {
    info!("🌐 服务已启动: http://{}", addr);
}
