// URL 同步
//
// 在筛选状态和地址栏查询串之间做双向映射：
// - 水合：首次加载时从 URL 解析出筛选状态
// - 写入：已稳定状态变化后写回 URL
// - 回读：浏览器前进 / 后退或手动修改地址后，把 URL 解析回筛选状态
//
// 水合完成之前不会写 URL，避免默认状态覆盖掉还没应用的深链接

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeSet;
use tokio::sync::watch;

use crate::models::{
    create_default_filters, ContentType, DateRange, FilterField, FilterState, MonetizationType,
    NumericRange, RangeFacet, SortBy,
};
use crate::ports::NavigationPort;
use crate::services::query_builder::{bool_param, join_ids, push_range, QueryParams};

lazy_static! {
    static ref LANGUAGE_CODE: Regex = Regex::new(r"^[a-z]{2}$").unwrap();
    static ref COUNTRY_CODE: Regex = Regex::new(r"^[A-Z]{2}$").unwrap();
}

/// 规范化语言代码（ISO 639-1），不合法时返回 `None`
pub fn normalize_language(value: &str) -> Option<String> {
    let value = value.trim().to_ascii_lowercase();
    LANGUAGE_CODE.is_match(&value).then_some(value)
}

/// 规范化国家代码（ISO 3166-1），不合法时返回 `None`
pub fn normalize_country(value: &str) -> Option<String> {
    let value = value.trim().to_ascii_uppercase();
    COUNTRY_CODE.is_match(&value).then_some(value)
}

/// 筛选状态与 URL 查询串之间的编解码
///
/// `context` 是当前页面的内容类型：与它相同时不输出 `type` 参数，
/// URL 中缺少 `type` 时也回落到它
#[derive(Debug, Clone, Copy)]
pub struct UrlCodec {
    context: ContentType,
}

impl UrlCodec {
    pub fn new(context: ContentType) -> Self {
        Self { context }
    }

    pub fn context(&self) -> ContentType {
        self.context
    }

    /// 只输出非默认、非空的字段
    pub fn to_params(&self, state: &FilterState) -> QueryParams {
        let mut params = QueryParams::new();

        if state.content_type != self.context {
            params.push("type", state.content_type.as_str());
        }
        if !state.is_field_default(FilterField::Category) {
            params.push("category", state.category.trim());
        }
        if !state.is_field_default(FilterField::SearchQuery) {
            if let Some(ref query) = state.search_query {
                params.push("query", query.trim());
            }
        }
        if !state.is_field_default(FilterField::SortBy) {
            params.push("sort_by", state.sort_by.to_param(state.content_type));
        }
        if !state.is_field_default(FilterField::Page) {
            params.push("page", state.page.to_string());
        }
        if !state.is_field_default(FilterField::IncludeAdult) {
            params.push("include_adult", bool_param(state.include_adult));
        }

        params.push("with_genres", join_ids(state.genres_include.iter()));
        params.push("without_genres", join_ids(state.genres_exclude.iter()));
        params.push("with_keywords", join_ids(state.keywords_include.iter()));
        params.push("without_keywords", join_ids(state.keywords_exclude.iter()));

        // 两组日期都写入，切换内容类型后不会丢失
        push_dates(&mut params, "primary_release_date", &state.release_date);
        push_dates(&mut params, "first_air_date", &state.air_date);

        push_range(&mut params, state, FilterField::Runtime, &state.runtime);
        push_range(&mut params, state, FilterField::VoteAverage, &state.vote_average);
        push_range(&mut params, state, FilterField::VoteCount, &state.vote_count);

        if let Some(code) = state.original_language.as_deref().and_then(normalize_language) {
            params.push("with_original_language", code);
        }
        if let Some(code) = state.region.as_deref().and_then(normalize_country) {
            params.push("region", code);
        }
        if let Some(code) = state.watch_region.as_deref().and_then(normalize_country) {
            params.push("watch_region", code);
        }
        params.push("with_watch_providers", join_ids(state.watch_providers.iter()));
        params.push(
            "with_watch_monetization_types",
            state
                .monetization_types
                .iter()
                .map(|m| m.as_str())
                .collect::<Vec<_>>()
                .join("|"),
        );
        params.push("with_people", join_ids(state.people.iter()));
        params.push("with_companies", join_ids(state.companies.iter()));
        params.push("with_networks", join_ids(state.networks.iter()));

        if let Some(code) = state.certification_country.as_deref().and_then(normalize_country) {
            params.push("certification_country", code);
        }
        if let Some(ref certification) = state.certification {
            params.push("certification", certification.trim());
        }

        params
    }

    /// 序列化为规范查询串（不带 `?`）
    pub fn serialize(&self, state: &FilterState) -> String {
        encode_params(&self.to_params(state))
    }

    /// 解析查询串，不合法的值被静默丢弃
    pub fn parse(&self, query: &str) -> FilterState {
        let query = query.trim().trim_start_matches('?');
        let pairs: Vec<(String, String)> = url::form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        let content_type = pairs
            .iter()
            .find(|(k, _)| k == "type")
            .and_then(|(_, v)| ContentType::parse(v))
            .unwrap_or(self.context);

        let mut state = create_default_filters(content_type);
        for (key, value) in &pairs {
            if !apply_param(&mut state, key, value) {
                tracing::debug!("Dropped URL parameter {}={}", key, value);
            }
        }
        state
    }

    /// 规范化一个查询串：解析后再序列化
    pub fn normalize(&self, query: &str) -> String {
        self.serialize(&self.parse(query))
    }
}

fn push_dates(params: &mut QueryParams, prefix: &str, range: &Option<DateRange>) {
    if let Some(range) = range {
        if let Some(start) = range.start {
            params.push(&format!("{}.gte", prefix), start.format("%Y-%m-%d").to_string());
        }
        if let Some(end) = range.end {
            params.push(&format!("{}.lte", prefix), end.format("%Y-%m-%d").to_string());
        }
    }
}

/// 编码查询串，列表分隔符 `,` 和 `|` 保持原样以便阅读
fn encode_params(params: &QueryParams) -> String {
    params
        .iter()
        .map(|(key, value)| {
            let value: String = url::form_urlencoded::byte_serialize(value.as_bytes()).collect();
            format!("{}={}", key, value.replace("%2C", ",").replace("%7C", "|"))
        })
        .collect::<Vec<_>>()
        .join("&")
}

fn parse_ids(value: &str) -> Option<BTreeSet<u32>> {
    let ids: BTreeSet<u32> = value
        .split([',', '|'])
        .filter_map(|part| part.trim().parse::<u32>().ok())
        .collect();
    (!ids.is_empty()).then_some(ids)
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

fn parse_number(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|v| v.is_finite() && *v >= 0.0)
}

fn set_bound(range: &mut Option<NumericRange>, facet: RangeFacet, lower: bool, value: f64) -> bool {
    let current = range.unwrap_or_default();
    let (min, max) = if lower {
        (Some(value), current.max)
    } else {
        (current.min, Some(value))
    };
    *range = NumericRange::from_slider(facet, min, max);
    true
}

fn set_date(range: &mut Option<DateRange>, lower: bool, value: NaiveDate) -> bool {
    let current = range.unwrap_or_default();
    *range = if lower {
        DateRange::new(Some(value), current.end)
    } else {
        DateRange::new(current.start, Some(value))
    };
    true
}

/// 应用一个 URL 参数，返回是否被接受
fn apply_param(state: &mut FilterState, key: &str, value: &str) -> bool {
    let value = value.trim();
    if value.is_empty() {
        return false;
    }

    if let Some((prefix, bound)) = key.rsplit_once('.') {
        let lower = match bound {
            "gte" => true,
            "lte" => false,
            _ => return false,
        };
        return match prefix {
            "primary_release_date" => parse_date(value)
                .map(|d| set_date(&mut state.release_date, lower, d))
                .unwrap_or(false),
            "first_air_date" => parse_date(value)
                .map(|d| set_date(&mut state.air_date, lower, d))
                .unwrap_or(false),
            "with_runtime" => parse_number(value)
                .map(|n| set_bound(&mut state.runtime, RangeFacet::Runtime, lower, n))
                .unwrap_or(false),
            "vote_average" => parse_number(value)
                .map(|n| set_bound(&mut state.vote_average, RangeFacet::VoteAverage, lower, n))
                .unwrap_or(false),
            "vote_count" => parse_number(value)
                .map(|n| set_bound(&mut state.vote_count, RangeFacet::VoteCount, lower, n))
                .unwrap_or(false),
            _ => false,
        };
    }

    let ids_field = match key {
        "with_genres" => Some(FilterField::GenresInclude),
        "without_genres" => Some(FilterField::GenresExclude),
        "with_keywords" => Some(FilterField::KeywordsInclude),
        "without_keywords" => Some(FilterField::KeywordsExclude),
        "with_watch_providers" => Some(FilterField::WatchProviders),
        "with_people" => Some(FilterField::People),
        "with_companies" => Some(FilterField::Companies),
        "with_networks" => Some(FilterField::Networks),
        _ => None,
    };
    if let Some(field) = ids_field {
        return match (parse_ids(value), state.id_set_mut(field)) {
            (Some(ids), Some(set)) => {
                *set = ids;
                true
            }
            _ => false,
        };
    }

    match key {
        // 已在解析开始时处理
        "type" => ContentType::parse(value).is_some(),
        "category" => {
            state.category = value.to_string();
            true
        }
        "query" => {
            state.search_query = Some(value.to_string());
            true
        }
        "sort_by" => SortBy::parse(value)
            .map(|sort| state.sort_by = sort)
            .is_some(),
        "page" => value
            .parse::<u32>()
            .ok()
            .filter(|p| *p >= 1)
            .map(|p| state.page = p)
            .is_some(),
        "include_adult" => match value {
            "true" => {
                state.include_adult = true;
                true
            }
            "false" => {
                state.include_adult = false;
                true
            }
            _ => false,
        },
        "with_original_language" => normalize_language(value)
            .map(|code| state.original_language = Some(code))
            .is_some(),
        "region" => normalize_country(value)
            .map(|code| state.region = Some(code))
            .is_some(),
        "watch_region" => normalize_country(value)
            .map(|code| state.watch_region = Some(code))
            .is_some(),
        "certification_country" => normalize_country(value)
            .map(|code| state.certification_country = Some(code))
            .is_some(),
        "certification" => {
            state.certification = Some(value.to_string());
            true
        }
        "with_watch_monetization_types" => {
            let kinds: BTreeSet<MonetizationType> = value
                .split(['|', ','])
                .filter_map(MonetizationType::parse)
                .collect();
            if kinds.is_empty() {
                false
            } else {
                state.monetization_types = kinds;
                true
            }
        }
        _ => false,
    }
}

/// 水合阶段
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum HydrationPhase {
    NotStarted,
    /// 已从 URL 解析出状态，等待已稳定状态与之一致
    Pending { target: String },
    Complete,
}

/// 写入历史的方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryMode {
    /// 新增一条可后退的记录
    Push,
    /// 替换当前记录
    Replace,
}

/// 一次同步的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// 水合尚未完成，跳过写入
    Deferred,
    /// URL 已经与状态一致
    Unchanged,
    Written(String),
}

/// URL 同步器
pub struct UrlSynchronizer<N: NavigationPort> {
    nav: N,
    codec: UrlCodec,
    phase: HydrationPhase,
    notify: watch::Sender<String>,
}

impl<N: NavigationPort> UrlSynchronizer<N> {
    pub fn new(nav: N, context: ContentType) -> Self {
        let (notify, _rx) = watch::channel(nav.current_query());
        Self {
            nav,
            codec: UrlCodec::new(context),
            phase: HydrationPhase::NotStarted,
            notify,
        }
    }

    pub fn codec(&self) -> &UrlCodec {
        &self.codec
    }

    pub fn phase(&self) -> &HydrationPhase {
        &self.phase
    }

    pub fn is_hydrated(&self) -> bool {
        self.phase == HydrationPhase::Complete
    }

    pub fn nav(&self) -> &N {
        &self.nav
    }

    pub fn nav_mut(&mut self) -> &mut N {
        &mut self.nav
    }

    /// 订阅内部的 URL 变化通知
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.notify.subscribe()
    }

    /// 首次加载时从 URL 解析状态
    ///
    /// URL 没有参数时直接进入完成阶段并返回 `None`
    pub fn hydrate(&mut self) -> Option<FilterState> {
        if self.phase != HydrationPhase::NotStarted {
            return None;
        }

        let query = self.nav.current_query();
        if query.trim().trim_start_matches('?').is_empty() {
            self.phase = HydrationPhase::Complete;
            return None;
        }

        let parsed = self.codec.parse(&query);
        let target = self.codec.serialize(&parsed);
        tracing::debug!("Hydrating filters from URL: {}", target);
        self.phase = HydrationPhase::Pending { target };
        Some(parsed)
    }

    /// 已稳定状态变化后写回 URL
    pub fn on_settled(&mut self, state: &FilterState, mode: HistoryMode) -> SyncOutcome {
        let query = self.codec.serialize(state);

        match &self.phase {
            HydrationPhase::NotStarted => return SyncOutcome::Deferred,
            HydrationPhase::Pending { target } => {
                if *target != query {
                    return SyncOutcome::Deferred;
                }
                tracing::debug!("URL hydration complete");
                self.phase = HydrationPhase::Complete;
            }
            HydrationPhase::Complete => {}
        }

        if self.codec.normalize(&self.nav.current_query()) == query {
            return SyncOutcome::Unchanged;
        }

        match mode {
            HistoryMode::Push => self.nav.push(&query),
            HistoryMode::Replace => self.nav.replace(&query),
        }
        tracing::debug!("URL updated ({:?}): {}", mode, query);
        self.notify.send_replace(query.clone());
        SyncOutcome::Written(query)
    }

    /// 浏览器前进 / 后退或外部修改 URL 后回读
    ///
    /// URL 描述的状态与当前状态不同时返回解析结果，由调用方写回存储
    pub fn on_navigation(&mut self, current: &FilterState) -> Option<FilterState> {
        if self.phase == HydrationPhase::NotStarted {
            return None;
        }

        let parsed = self.codec.parse(&self.nav.current_query());
        let target = self.codec.serialize(&parsed);
        if target == self.codec.serialize(current) {
            return None;
        }

        if let HydrationPhase::Pending { .. } = self.phase {
            self.phase = HydrationPhase::Pending {
                target: target.clone(),
            };
        }
        tracing::debug!("URL changed externally: {}", target);
        Some(parsed)
    }
}
