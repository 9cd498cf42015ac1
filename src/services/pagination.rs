//! 分页驱动 - 业务能力层
//!
//! 反复点击"加载更多"，直到按钮消失或点击次数用完。

use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::browser::{ControlLookup, DomQuery};
use crate::config::Config;

/// 分页循环结束的原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminationReason {
    /// 按钮不再出现，内容已全部展开
    Exhausted,
    /// 查找或点击按钮时出错，按策略视为已展开
    TransientError(String),
    /// 达到最大点击次数
    Capped,
}

/// 状态机的状态，`Exhausted` 为终态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaginationState {
    Loading,
    Exhausted(TerminationReason),
}

/// 一次分页循环的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationOutcome {
    pub clicks: usize,
    pub reason: TerminationReason,
}

/// 分页驱动
///
/// 职责：
/// - 在短超时内查找"加载更多"按钮
/// - 找到则点击、等待、继续；找不到则结束
/// - 不解析任何记录
pub struct PaginationDriver {
    control_selector: String,
    lookup_timeout: Duration,
    click_delay: Duration,
    network_idle_timeout: Duration,
    max_iterations: usize,
}

impl PaginationDriver {
    pub fn new(config: &Config) -> Self {
        Self {
            control_selector: config.selectors.load_more.clone(),
            lookup_timeout: config.timeouts.control_lookup(),
            click_delay: config.timeouts.click_delay(),
            network_idle_timeout: config.timeouts.network_idle(),
            max_iterations: config.pagination.max_iterations,
        }
    }

    /// 覆盖最大点击次数
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// 单步状态转换
    ///
    /// `NotFound` 与 `TransientError` 在这里被合并为同一个终态转换，
    /// 但保留各自的结束原因。
    pub fn transition(state: &PaginationState, lookup: ControlLookup) -> PaginationState {
        match (state, lookup) {
            (PaginationState::Exhausted(reason), _) => PaginationState::Exhausted(reason.clone()),
            (PaginationState::Loading, ControlLookup::Found) => PaginationState::Loading,
            (PaginationState::Loading, ControlLookup::NotFound) => {
                PaginationState::Exhausted(TerminationReason::Exhausted)
            }
            (PaginationState::Loading, ControlLookup::TransientError(msg)) => {
                PaginationState::Exhausted(TerminationReason::TransientError(msg))
            }
        }
    }

    /// 驱动分页直到结束
    pub async fn run<D: DomQuery + ?Sized>(&self, dom: &D) -> PaginationOutcome {
        info!("🔄 开始点击加载更多...");
        let mut state = PaginationState::Loading;
        let mut clicks = 0;

        loop {
            if clicks >= self.max_iterations {
                warn!("⚠️ 已达到最大点击次数 {}，停止分页", self.max_iterations);
                state = PaginationState::Exhausted(TerminationReason::Capped);
            }

            if let PaginationState::Exhausted(reason) = state {
                match &reason {
                    TerminationReason::Exhausted => info!("✅ 没有更多内容可加载"),
                    TerminationReason::TransientError(msg) => {
                        warn!("⚠️ 查找加载按钮出错，视为已加载完毕: {}", msg)
                    }
                    TerminationReason::Capped => {}
                }
                info!("📊 总点击次数: {}", clicks);
                return PaginationOutcome { clicks, reason };
            }

            let lookup = dom
                .wait_for_selector(&self.control_selector, self.lookup_timeout)
                .await;
            state = Self::transition(&state, lookup);
            if state != PaginationState::Loading {
                continue;
            }

            clicks += 1;
            info!("🖱️ 点击加载更多 ({})...", clicks);
            if let Err(e) = dom.click(&self.control_selector).await {
                state = Self::transition(&state, ControlLookup::TransientError(e.to_string()));
                continue;
            }

            sleep(self.click_delay).await;
            if let Err(e) = dom.wait_for_network_idle(self.network_idle_timeout).await {
                debug!("等待网络空闲失败（忽略）: {}", e);
            }
        }
    }
}
