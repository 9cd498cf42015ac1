use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use panel_harvest::api;
use panel_harvest::utils::logging;
use panel_harvest::{Config, Pipeline};

#[tokio::main]
async fn main() -> Result<()> {
    // 第一个参数可指定配置文件，否则读取 CONFIG_FILE
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = Config::load(config_path.as_deref())?;

    // 初始化日志
    logging::init(config.verbose_logging);
    logging::log_startup(&config);

    let server = config.server.clone();
    let pipeline = Arc::new(Pipeline::from_config(config)?);

    api::serve(&server, pipeline).await?;
    Ok(())
}
