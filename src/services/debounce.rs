// 防抖与取消
//
// DebounceSession 持有唯一的定时器、唯一的有效中止信号和已稳定的筛选状态。
// - 只改了分类 / 内容类型 / 排序的变更立即提交
// - 其他变更等待防抖延迟后提交
// - 每次变更和每次提交都会中止上一次的信号，保证同一时刻最多只有一个有效请求
//
// 变更的分类始终以"已稳定状态"为基准做差异比较，而不是上一次的原始状态

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::models::FilterState;

/// 默认防抖延迟
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(250);

/// 请求中止信号
///
/// 中止一个已经完成的请求不会产生任何效果
#[derive(Debug, Clone, Default)]
pub struct AbortSignal {
    token: CancellationToken,
}

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.token.cancel();
    }

    pub fn is_aborted(&self) -> bool {
        self.token.is_cancelled()
    }

    /// 等待信号被中止
    pub async fn aborted(&self) {
        self.token.cancelled().await
    }
}

/// 变更类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    /// 立即提交
    Instant,
    /// 等待防抖延迟
    Debounced,
    /// 与已稳定状态相同
    Unchanged,
}

/// 一次提交的结果
#[derive(Debug, Clone)]
pub struct Commit {
    /// 提交序号，从 0（初始状态）开始
    pub sequence: u64,
    pub state: FilterState,
    /// 与这次提交绑定的请求中止信号
    pub signal: AbortSignal,
}

struct Inner {
    settled: FilterState,
    pending: Option<FilterState>,
    signal: AbortSignal,
    generation: u64,
    commits: u64,
    aborted: u64,
}

impl Inner {
    /// 中止当前信号并签发新信号
    fn rotate_signal(&mut self) -> AbortSignal {
        if !self.signal.is_aborted() {
            self.signal.abort();
            self.aborted += 1;
        }
        self.signal = AbortSignal::new();
        self.generation += 1;
        self.signal.clone()
    }

    fn commit(&mut self, state: FilterState, tx: &watch::Sender<Commit>) {
        self.settled = state;
        self.pending = None;
        self.commits += 1;
        let commit = Commit {
            sequence: self.commits,
            state: self.settled.clone(),
            signal: self.signal.clone(),
        };
        tracing::debug!("Committed settled filter state #{}", commit.sequence);
        tx.send_replace(commit);
    }
}

/// 防抖会话
///
/// 需要在 Tokio 运行时中使用；销毁时会取消定时器并中止当前信号
pub struct DebounceSession {
    inner: Arc<Mutex<Inner>>,
    tx: Arc<watch::Sender<Commit>>,
    timer: Option<JoinHandle<()>>,
    delay: Duration,
}

impl DebounceSession {
    pub fn new(initial: FilterState, delay: Duration) -> Self {
        let signal = AbortSignal::new();
        let (tx, _rx) = watch::channel(Commit {
            sequence: 0,
            state: initial.clone(),
            signal: signal.clone(),
        });

        Self {
            inner: Arc::new(Mutex::new(Inner {
                settled: initial,
                pending: None,
                signal,
                generation: 0,
                commits: 0,
                aborted: 0,
            })),
            tx: Arc::new(tx),
            timer: None,
            delay,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // 锁内不会 panic，中毒时直接取回数据
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }

    /// 处理一次筛选状态变更
    pub fn transition(&mut self, next: FilterState) -> TransitionKind {
        let changed = self.lock().settled.changed_fields(&next);

        if changed.is_empty() {
            self.cancel_timer();
            let mut inner = self.lock();
            if inner.pending.is_some() {
                // 用户改回了已稳定状态：上一次的请求已被中止，需要重新提交
                inner.rotate_signal();
                inner.commit(next, &self.tx);
            } else {
                // 只有界面状态变化
                inner.settled.ui = next.ui;
            }
            return TransitionKind::Unchanged;
        }

        let kind = if changed.iter().all(|f| f.is_instant()) {
            TransitionKind::Instant
        } else {
            TransitionKind::Debounced
        };

        self.cancel_timer();
        match kind {
            TransitionKind::Instant => {
                let mut inner = self.lock();
                inner.rotate_signal();
                inner.commit(next, &self.tx);
            }
            _ => {
                let generation = {
                    let mut inner = self.lock();
                    inner.rotate_signal();
                    inner.pending = Some(next);
                    inner.generation
                };
                self.timer = Some(self.spawn_timer(generation));
            }
        }

        tracing::debug!("Filter transition {:?} changed {:?}", kind, changed);
        kind
    }

    fn spawn_timer(&self, generation: u64) -> JoinHandle<()> {
        let inner = Arc::clone(&self.inner);
        let tx = Arc::clone(&self.tx);
        let delay = self.delay;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let mut inner = inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            // 已被更新的变更取代
            if inner.generation != generation {
                return;
            }
            if let Some(state) = inner.pending.take() {
                inner.rotate_signal();
                inner.commit(state, &tx);
            }
        })
    }

    /// 立即提交正在等待的状态
    pub fn flush(&mut self) -> bool {
        self.cancel_timer();
        let mut inner = self.lock();
        match inner.pending.take() {
            Some(state) => {
                inner.rotate_signal();
                inner.commit(state, &self.tx);
                true
            }
            None => false,
        }
    }

    /// 中止当前请求并丢弃等待中的状态，已稳定状态保持不变
    pub fn cancel(&mut self) {
        self.cancel_timer();
        let mut inner = self.lock();
        inner.pending = None;
        if !inner.signal.is_aborted() {
            inner.signal.abort();
            inner.aborted += 1;
        }
    }

    /// 跳过防抖直接提交（用于 URL 水合、浏览器前进后退）
    pub fn commit_now(&mut self, state: FilterState) {
        self.cancel_timer();
        let mut inner = self.lock();
        inner.rotate_signal();
        inner.commit(state, &self.tx);
    }

    pub fn settled(&self) -> FilterState {
        self.lock().settled.clone()
    }

    pub fn is_settling(&self) -> bool {
        self.lock().pending.is_some()
    }

    pub fn has_pending_timer(&self) -> bool {
        self.is_settling()
    }

    /// 当前有效的中止信号
    pub fn current_signal(&self) -> AbortSignal {
        self.lock().signal.clone()
    }

    pub fn commit_count(&self) -> u64 {
        self.lock().commits
    }

    /// 已中止的信号数量
    pub fn aborted_count(&self) -> u64 {
        self.lock().aborted
    }

    pub fn subscribe(&self) -> watch::Receiver<Commit> {
        self.tx.subscribe()
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// 结束会话
    pub fn dispose(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        self.cancel_timer();
        let mut inner = self.lock();
        inner.pending = None;
        inner.signal.abort();
    }
}

impl Drop for DebounceSession {
    fn drop(&mut self) {
        self.teardown();
    }
}
