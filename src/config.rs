use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::browser::ResourceClass;
use crate::error::{AppResult, ConfigError};

/// 程序配置
///
/// 所有组件都从这里拿到选择器、超时和资源屏蔽列表，
/// 不存在进程级的可变全局配置。
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 目录页 URL
    pub catalog_url: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    pub server: ServerConfig,
    pub browser: BrowserSettings,
    pub timeouts: TimeoutConfig,
    pub pagination: PaginationConfig,
    pub selectors: SelectorConfig,
    /// 目录页会话中要屏蔽的资源类型
    pub blocked_resources: Vec<ResourceClass>,
    /// 规范化时 JPEG 的编码质量
    pub jpeg_quality: u8,
}

/// HTTP 服务配置
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    /// 起始端口
    pub port: u16,
    /// 端口被占用时依次尝试的端口数量
    pub port_attempts: u16,
}

/// 无头浏览器配置
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    /// 浏览器可执行文件路径，为空时由 chromiumoxide 自动查找
    pub chrome_executable: Option<PathBuf>,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub user_agent: String,
    /// 额外的启动参数
    pub args: Vec<String>,
}

/// 超时配置（毫秒）
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// 页面导航超时
    pub navigation_ms: u64,
    /// 单次查找"加载更多"按钮的超时，必须远小于导航超时
    pub control_lookup_ms: u64,
    /// 点击后等待网络空闲的超时
    pub network_idle_ms: u64,
    /// 两次点击之间的固定间隔
    pub click_delay_ms: u64,
    /// 章节页等待首张分镜出现的超时
    pub panel_wait_ms: u64,
    /// 单张分镜下载超时
    pub panel_fetch_ms: u64,
    /// 两次分镜下载之间的固定间隔
    pub panel_delay_ms: u64,
}

/// 分页循环配置
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    /// 最大点击次数，防止页面永远重新渲染按钮导致死循环
    pub max_iterations: usize,
}

/// 选择器配置
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// "加载更多"按钮
    pub load_more: String,
    /// 目录列表容器
    pub container: String,
    /// 标题（在 `<a>` 内查找）
    pub title: String,
    /// 连载状态（在 `<a>` 内查找）
    pub status: String,
    /// 封面图（在 `<a>` 内查找）
    pub image: String,
    /// 章节数（在 `<a>` 内查找）
    pub chapters: String,
    /// 章节页中的分镜图片
    pub panel: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            catalog_url: "https://reaperscans.com/comics".to_string(),
            verbose_logging: false,
            server: ServerConfig::default(),
            browser: BrowserSettings::default(),
            timeouts: TimeoutConfig::default(),
            pagination: PaginationConfig::default(),
            selectors: SelectorConfig::default(),
            blocked_resources: vec![
                ResourceClass::Image,
                ResourceClass::Stylesheet,
                ResourceClass::Font,
                ResourceClass::Media,
            ],
            jpeg_quality: 100,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            port_attempts: 10,
        }
    }
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            chrome_executable: None,
            headless: true,
            viewport_width: 1920,
            viewport_height: 1080,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36".to_string(),
            args: vec![
                "--no-sandbox".to_string(),
                "--disable-setuid-sandbox".to_string(),
                "--disable-dev-shm-usage".to_string(),
                "--disable-accelerated-2d-canvas".to_string(),
                "--disable-gpu".to_string(),
            ],
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            navigation_ms: 15_000,
            control_lookup_ms: 1_000,
            network_idle_ms: 1_000,
            click_delay_ms: 1_000,
            panel_wait_ms: 5_000,
            panel_fetch_ms: 30_000,
            panel_delay_ms: 500,
        }
    }
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self { max_iterations: 200 }
    }
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            load_more: r"button.justify-center.whitespace-nowrap.rounded-md.text-sm.font-medium.bg-primary.text-primary-foreground.h-10.px-4.py-2.flex.flex-row.gap-2.items-center".to_string(),
            container: r"div.grid.grid-cols-1.lg\:grid-cols-2.gap-2".to_string(),
            title: "h1.text-foreground.font-bold.text-lg.line-clamp-1".to_string(),
            status: "div.text-muted-foreground.text-sm".to_string(),
            image: "img".to_string(),
            chapters: r"span.text-muted-foreground.hidden.lg\:flex.flex-row.text-xxs.gap-2.items-center.line-clamp-1".to_string(),
            panel: r#"img[src*="reaperscans.com"]"#.to_string(),
        }
    }
}

impl TimeoutConfig {
    pub fn navigation(&self) -> Duration {
        Duration::from_millis(self.navigation_ms)
    }

    pub fn control_lookup(&self) -> Duration {
        Duration::from_millis(self.control_lookup_ms)
    }

    pub fn network_idle(&self) -> Duration {
        Duration::from_millis(self.network_idle_ms)
    }

    pub fn click_delay(&self) -> Duration {
        Duration::from_millis(self.click_delay_ms)
    }

    pub fn panel_wait(&self) -> Duration {
        Duration::from_millis(self.panel_wait_ms)
    }

    pub fn panel_fetch(&self) -> Duration {
        Duration::from_millis(self.panel_fetch_ms)
    }

    pub fn panel_delay(&self) -> Duration {
        Duration::from_millis(self.panel_delay_ms)
    }
}

impl Config {
    /// 仅从环境变量加载（在默认值之上覆盖）
    pub fn from_env() -> AppResult<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// 加载配置：先读取可选的 TOML 文件，再用环境变量覆盖
    ///
    /// `path` 为空时读取 `CONFIG_FILE` 环境变量指定的文件；两者都没有则使用默认值。
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        let from_env = std::env::var("CONFIG_FILE").ok().map(PathBuf::from);
        let mut config = match path.map(Path::to_path_buf).or(from_env) {
            Some(p) => Self::from_toml_file(&p)?,
            None => Self::default(),
        };
        config.apply_env()?;
        Ok(config)
    }

    /// 从 TOML 文件读取，缺省字段使用默认值
    pub fn from_toml_file(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content, &path.display().to_string())
    }

    pub fn from_toml_str(content: &str, origin: &str) -> AppResult<Self> {
        let config: Config = toml::from_str(content).map_err(|source| ConfigError::TomlParse {
            path: origin.to_string(),
            source,
        })?;
        Ok(config)
    }

    /// 用环境变量覆盖当前配置
    pub fn apply_env(&mut self) -> AppResult<()> {
        if let Some(port) = env_parse::<u16>("PORT")? {
            self.server.port = port;
        }
        if let Ok(url) = std::env::var("CATALOG_URL") {
            self.catalog_url = url;
        }
        if let Ok(path) = std::env::var("CHROME_EXECUTABLE") {
            self.browser.chrome_executable = Some(PathBuf::from(path));
        }
        if let Some(ms) = env_parse::<u64>("NAVIGATION_TIMEOUT_MS")? {
            self.timeouts.navigation_ms = ms;
        }
        if let Some(ms) = env_parse::<u64>("PANEL_DELAY_MS")? {
            self.timeouts.panel_delay_ms = ms;
        }
        if let Some(max) = env_parse::<usize>("MAX_PAGINATION_CLICKS")? {
            self.pagination.max_iterations = max;
        }
        if let Some(verbose) = env_parse::<bool>("VERBOSE_LOGGING")? {
            self.verbose_logging = verbose;
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(var_name: &str) -> AppResult<Option<T>> {
    match std::env::var(var_name) {
        Ok(value) => value.trim().parse::<T>().map(Some).map_err(|_| {
            ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value,
                expected_type: std::any::type_name::<T>().to_string(),
            }
            .into()
        }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_constants() {
        let config = Config::default();
        assert_eq!(config.timeouts.navigation_ms, 15_000);
        assert_eq!(config.timeouts.control_lookup_ms, 1_000);
        assert_eq!(config.timeouts.panel_delay_ms, 500);
        assert_eq!(config.pagination.max_iterations, 200);
        assert_eq!(config.jpeg_quality, 100);
        assert!(config.timeouts.control_lookup() < config.timeouts.navigation());
        assert_eq!(config.blocked_resources.len(), 4);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let toml = r#"
            catalog_url = "https://example.com/series"
            blocked_resources = ["image", "font"]

            [timeouts]
            navigation_ms = 20000

            [selectors]
            panel = "img.panel"
        "#;
        let config = Config::from_toml_str(toml, "inline").unwrap();
        assert_eq!(config.catalog_url, "https://example.com/series");
        assert_eq!(config.timeouts.navigation_ms, 20_000);
        assert_eq!(config.timeouts.control_lookup_ms, 1_000);
        assert_eq!(config.selectors.panel, "img.panel");
        assert_eq!(config.selectors.image, "img");
        assert_eq!(
            config.blocked_resources,
            vec![ResourceClass::Image, ResourceClass::Font]
        );
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn test_bad_toml_is_config_error() {
        let err = Config::from_toml_str("timeouts = 3", "inline").unwrap_err();
        assert_eq!(err.kind(), "config");
    }
}
