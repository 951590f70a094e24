// 筛选会话
//
// 把筛选状态存储、防抖会话和 URL 同步器串起来：
// 界面事件 -> 存储 -> 防抖 -> (目录请求, URL 写入)
// 浏览器前进 / 后退 -> URL 同步器 -> 存储 -> 立即提交

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::external::{CatalogPage, CatalogPort};
use crate::models::{ContentType, FilterState};
use crate::ports::NavigationPort;
use crate::services::debounce::{Commit, DebounceSession, TransitionKind};
use crate::services::error::CatalogError;
use crate::services::filter_store::FilterStore;
use crate::services::preset_merger::PresetCatalog;
use crate::services::query_builder::build_catalog_request;
use crate::services::url_sync::{HistoryMode, SyncOutcome, UrlSynchronizer};

/// 会话选项
#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    /// 当前页面的内容类型
    pub content_type: ContentType,
    pub debounce: Duration,
    pub presets: PresetCatalog,
}

impl SessionOptions {
    pub fn new(content_type: ContentType) -> Self {
        Self {
            content_type,
            debounce: crate::services::debounce::DEFAULT_DEBOUNCE,
            presets: PresetCatalog::default(),
        }
    }
}

/// URL 写入状态，由会话和提交监听任务共享
struct UrlState<N: NavigationPort> {
    sync: UrlSynchronizer<N>,
    next_mode: HistoryMode,
    /// 最后一次写入（或确认一致）的提交序号
    synced: u64,
}

impl<N: NavigationPort> UrlState<N> {
    fn apply(&mut self, commit: &Commit) -> SyncOutcome {
        if commit.sequence <= self.synced {
            return SyncOutcome::Unchanged;
        }
        let outcome = self.sync.on_settled(&commit.state, self.next_mode);
        // 水合未完成时保留这次提交，等下一次再试
        if outcome != SyncOutcome::Deferred {
            self.synced = commit.sequence;
            self.next_mode = HistoryMode::Replace;
        }
        outcome
    }
}

fn lock_url<N: NavigationPort>(url: &Mutex<UrlState<N>>) -> MutexGuard<'_, UrlState<N>> {
    url.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// 一个页面的筛选会话
///
/// 需要在 Tokio 运行时中创建：后台任务监听防抖提交并写入 URL
pub struct FilterSession<N: NavigationPort + 'static> {
    store: FilterStore,
    debounce: DebounceSession,
    url: Arc<Mutex<UrlState<N>>>,
    commits: watch::Receiver<Commit>,
    listener: JoinHandle<()>,
}

impl<N: NavigationPort + 'static> FilterSession<N> {
    pub fn new(nav: N, options: SessionOptions) -> Self {
        let store = FilterStore::new(options.content_type, options.presets);
        let debounce = DebounceSession::new(store.state().clone(), options.debounce);
        let url = Arc::new(Mutex::new(UrlState {
            sync: UrlSynchronizer::new(nav, options.content_type),
            next_mode: HistoryMode::Replace,
            synced: 0,
        }));
        let commits = debounce.subscribe();
        let listener = Self::spawn_listener(Arc::clone(&url), debounce.subscribe());

        Self {
            store,
            debounce,
            url,
            commits,
            listener,
        }
    }

    fn spawn_listener(
        url: Arc<Mutex<UrlState<N>>>,
        mut rx: watch::Receiver<Commit>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let commit = rx.borrow_and_update().clone();
                lock_url(&url).apply(&commit);
            }
        })
    }

    pub fn store(&self) -> &FilterStore {
        &self.store
    }

    pub fn debounce(&self) -> &DebounceSession {
        &self.debounce
    }

    /// 读取 URL 同步器
    pub fn with_url<R>(&self, f: impl FnOnce(&UrlSynchronizer<N>) -> R) -> R {
        f(&lock_url(&self.url).sync)
    }

    /// 修改 URL 同步器（例如模拟浏览器前进后退）
    pub fn with_url_mut<R>(&self, f: impl FnOnce(&mut UrlSynchronizer<N>) -> R) -> R {
        f(&mut lock_url(&self.url).sync)
    }

    pub fn current_query(&self) -> String {
        self.with_url(|url| url.nav().current_query())
    }

    pub fn is_hydrated(&self) -> bool {
        self.with_url(|url| url.is_hydrated())
    }

    pub fn settled(&self) -> FilterState {
        self.debounce.settled()
    }

    pub fn is_settling(&self) -> bool {
        self.debounce.is_settling()
    }

    /// 首次挂载时从 URL 水合
    pub fn hydrate(&mut self) -> SyncOutcome {
        let mut url = lock_url(&self.url);
        match url.sync.hydrate() {
            Some(parsed) => {
                self.store.replace_state(parsed);
                self.debounce.commit_now(self.store.state().clone());
                let commit = self.commits.borrow().clone();
                url.apply(&commit)
            }
            None => SyncOutcome::Unchanged,
        }
    }

    /// 修改筛选状态，写 URL 时替换当前历史记录
    pub fn update<F>(&mut self, mutate: F) -> TransitionKind
    where
        F: FnOnce(&mut FilterStore),
    {
        mutate(&mut self.store);
        let kind = self.debounce.transition(self.store.state().clone());
        self.sync_url();
        kind
    }

    /// 修改筛选状态，并在稳定后新增一条历史记录
    pub fn navigate<F>(&mut self, mutate: F) -> TransitionKind
    where
        F: FnOnce(&mut FilterStore),
    {
        lock_url(&self.url).next_mode = HistoryMode::Push;
        self.update(mutate)
    }

    /// 如果最新的提交尚未写入 URL，立即写入
    pub fn sync_url(&self) -> SyncOutcome {
        let commit = self.commits.borrow().clone();
        lock_url(&self.url).apply(&commit)
    }

    /// 等待正在防抖的状态稳定，然后同步 URL
    pub async fn wait_settled(&mut self) -> Commit {
        let mut rx = self.debounce.subscribe();
        while self.debounce.is_settling() {
            if rx.changed().await.is_err() {
                break;
            }
        }
        self.sync_url();
        let commit = rx.borrow().clone();
        commit
    }

    /// 立即提交正在防抖的状态（例如离开页面前）
    pub fn flush(&mut self) -> SyncOutcome {
        self.debounce.flush();
        self.sync_url()
    }

    /// 取消正在防抖的状态和进行中的请求
    pub fn cancel(&mut self) {
        self.debounce.cancel();
    }

    /// 处理 popstate 或外部修改 URL，返回状态是否被更新
    pub fn on_popstate(&mut self) -> bool {
        let current = self.debounce.settled();
        let mut url = lock_url(&self.url);
        match url.sync.on_navigation(&current) {
            Some(parsed) => {
                self.store.replace_state(parsed);
                self.debounce.commit_now(self.store.state().clone());
                let commit = self.commits.borrow().clone();
                url.apply(&commit);
                true
            }
            None => false,
        }
    }

    /// 按已稳定状态请求目录
    ///
    /// 请求被更新的状态取代时返回 `CatalogError::Aborted`
    pub async fn fetch<C>(&self, catalog: &C) -> Result<CatalogPage, CatalogError>
    where
        C: CatalogPort + ?Sized,
    {
        let request = build_catalog_request(&self.debounce.settled());
        let signal = self.debounce.current_signal();
        catalog.fetch(&request, signal).await
    }
}

impl<N: NavigationPort + 'static> Drop for FilterSession<N> {
    fn drop(&mut self) {
        self.listener.abort();
    }
}
