use thiserror::Error;

/// 应用程序错误类型
///
/// 所有致命错误最终都以这一类型到达编排层边界，
/// HTTP 层再根据 [`AppError::kind`] 生成错误信封。
#[derive(Debug, Error)]
pub enum AppError {
    /// 浏览器相关错误
    #[error("浏览器错误: {0}")]
    Browser(#[from] BrowserError),
    /// 分镜下载 / 解码错误
    #[error("下载错误: {0}")]
    Fetch(#[from] FetchError),
    /// 文档合成错误
    #[error("合成错误: {0}")]
    Assembly(#[from] AssemblyError),
    /// 业务逻辑错误
    #[error("业务错误: {0}")]
    Business(#[from] BusinessError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

/// 浏览器相关错误
#[derive(Debug, Error)]
pub enum BrowserError {
    /// 启动浏览器失败
    #[error("启动无头浏览器失败: {source}")]
    LaunchFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 创建页面失败
    #[error("创建页面失败: {source}")]
    PageCreationFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 导航失败
    #[error("导航到 {url} 失败: {source}")]
    NavigationFailed {
        url: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 导航超时
    #[error("导航到 {url} 超时 ({timeout_ms} ms)")]
    NavigationTimeout { url: String, timeout_ms: u64 },
    /// 执行脚本失败
    #[error("执行脚本失败: {source}")]
    ScriptExecutionFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 启用请求拦截失败
    #[error("启用请求拦截失败: {source}")]
    InterceptionFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// 分镜下载 / 规范化错误
#[derive(Debug, Error)]
pub enum FetchError {
    /// 网络请求失败（含超时）
    #[error("第 {index} 张分镜请求失败 ({url}): {source}")]
    RequestFailed {
        index: usize,
        url: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 服务器返回非成功状态码
    #[error("第 {index} 张分镜返回状态码 {status} ({url})")]
    BadStatus {
        index: usize,
        url: String,
        status: u16,
    },
    /// 图片解码失败
    #[error("第 {index} 张分镜解码失败 ({url}): {source}")]
    DecodeFailed {
        index: usize,
        url: String,
        source: image::ImageError,
    },
    /// 重新编码失败
    #[error("第 {index} 张分镜重新编码失败: {source}")]
    EncodeFailed {
        index: usize,
        source: image::ImageError,
    },
}

/// 文档合成错误
#[derive(Debug, Error)]
pub enum AssemblyError {
    /// 没有任何输入图片
    #[error("没有可合成的图片")]
    Empty,
    /// 解码已规范化的图片失败
    #[error("读取第 {sequence_index} 张图片失败: {source}")]
    DecodeFailed {
        sequence_index: usize,
        source: image::ImageError,
    },
    /// 输出编码失败
    #[error("输出编码失败: {source}")]
    EncodeFailed { source: image::ImageError },
}

/// 业务逻辑错误
#[derive(Debug, Error)]
pub enum BusinessError {
    /// 章节页面没有任何分镜
    #[error("页面中未找到任何分镜图片: {url}")]
    NoPanels { url: String },
    /// 请求缺少必填参数
    #[error("缺少必填参数: {name}")]
    MissingParameter { name: String },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// CSS 选择器无法解析
    #[error("无法解析选择器 '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },
    /// 读取配置文件失败
    #[error("读取配置文件失败 ({path}): {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParse {
        path: String,
        source: toml::de::Error,
    },
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 浏览器配置无效
    #[error("浏览器配置无效: {message}")]
    InvalidBrowserConfig { message: String },
    /// HTTP 客户端构建失败
    #[error("HTTP 客户端构建失败: {source}")]
    HttpClient { source: reqwest::Error },
}

// ========== 从常见错误类型转换 ==========

impl From<chromiumoxide::error::CdpError> for AppError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        AppError::Browser(BrowserError::ScriptExecutionFailed {
            source: Box::new(err),
        })
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Browser(BrowserError::ScriptExecutionFailed {
            source: Box::new(err),
        })
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建导航失败错误
    pub fn navigation_failed(
        url: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Browser(BrowserError::NavigationFailed {
            url: url.into(),
            source: Box::new(source),
        })
    }

    /// 创建分镜请求失败错误
    pub fn panel_request_failed(
        index: usize,
        url: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Fetch(FetchError::RequestFailed {
            index,
            url: url.into(),
            source: Box::new(source),
        })
    }

    /// 创建"未找到分镜"错误
    pub fn no_panels(url: impl Into<String>) -> Self {
        AppError::Business(BusinessError::NoPanels { url: url.into() })
    }

    /// 错误类别标签，写入 HTTP 错误信封的 `kind` 字段
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Browser(BrowserError::NavigationFailed { .. })
            | AppError::Browser(BrowserError::NavigationTimeout { .. }) => "navigation",
            AppError::Browser(_) => "browser",
            AppError::Fetch(FetchError::DecodeFailed { .. })
            | AppError::Fetch(FetchError::EncodeFailed { .. }) => "panel_decode",
            AppError::Fetch(_) => "panel_fetch",
            AppError::Assembly(_) => "assembly",
            AppError::Business(BusinessError::NoPanels { .. }) => "no_panels",
            AppError::Business(BusinessError::MissingParameter { .. }) => "bad_request",
            AppError::Config(_) => "config",
        }
    }

    /// 是否属于调用方的请求错误（而非服务端故障）
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AppError::Business(BusinessError::MissingParameter { .. })
        )
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
