// 目录查询参数构建
//
// 把已稳定的筛选状态映射为目录 API 的端点和有序参数。
// 处于默认值的字段不输出；同一类型既包含又排除时以排除为准

use serde::Serialize;

use crate::models::{ContentType, FilterField, FilterState, NumericRange};

/// 有序的查询参数列表
///
/// 不会包含值为空字符串的参数
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        if value.is_empty() {
            return;
        }
        self.0.push((name.to_string(), value));
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// 编码为 `a=1&b=2` 形式
    pub fn to_query_string(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.iter())
            .finish()
    }
}

/// 目录 API 端点
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "content_type", rename_all = "snake_case")]
pub enum CatalogEndpoint {
    Discover(ContentType),
    Search(ContentType),
}

impl CatalogEndpoint {
    pub fn path(&self) -> String {
        match self {
            CatalogEndpoint::Discover(content_type) => format!("discover/{}", content_type),
            CatalogEndpoint::Search(content_type) => format!("search/{}", content_type),
        }
    }
}

/// 一次目录查询
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogRequest {
    pub endpoint: CatalogEndpoint,
    pub params: QueryParams,
}

impl CatalogRequest {
    /// 规范化的请求标识，可作为缓存键
    pub fn cache_key(&self) -> String {
        format!("{}?{}", self.endpoint.path(), self.params.to_query_string())
    }
}

/// 根据筛选状态构建目录查询
///
/// 有搜索词时走搜索端点，只带搜索相关的参数；否则走 discover 端点
pub fn build_catalog_request(state: &FilterState) -> CatalogRequest {
    if state.is_field_default(FilterField::SearchQuery) {
        CatalogRequest {
            endpoint: CatalogEndpoint::Discover(state.content_type),
            params: build_query_params(state),
        }
    } else {
        CatalogRequest {
            endpoint: CatalogEndpoint::Search(state.content_type),
            params: build_search_params(state),
        }
    }
}

fn build_search_params(state: &FilterState) -> QueryParams {
    let mut params = QueryParams::new();
    if let Some(ref query) = state.search_query {
        params.push("query", query.trim());
    }
    if !state.is_field_default(FilterField::Page) {
        params.push("page", state.page.to_string());
    }
    if !state.is_field_default(FilterField::IncludeAdult) {
        params.push("include_adult", bool_param(state.include_adult));
    }
    if state.content_type == ContentType::Movie && !state.is_field_default(FilterField::Region) {
        push_text(&mut params, "region", &state.region);
    }
    params
}

/// 把筛选状态映射为 discover 端点的查询参数
pub fn build_query_params(state: &FilterState) -> QueryParams {
    let mut params = QueryParams::new();
    let is_movie = state.content_type == ContentType::Movie;

    if !state.is_field_default(FilterField::SortBy) {
        params.push("sort_by", state.sort_by.to_param(state.content_type));
    }
    if !state.is_field_default(FilterField::Page) {
        params.push("page", state.page.to_string());
    }
    if !state.is_field_default(FilterField::IncludeAdult) {
        params.push("include_adult", bool_param(state.include_adult));
    }

    // 同时出现在包含和排除中的 ID 只作为排除条件
    params.push(
        "with_genres",
        join_ids(state.genres_include.difference(&state.genres_exclude)),
    );
    params.push("without_genres", join_ids(state.genres_exclude.iter()));
    params.push(
        "with_keywords",
        join_ids(state.keywords_include.difference(&state.keywords_exclude)),
    );
    params.push("without_keywords", join_ids(state.keywords_exclude.iter()));

    if !state.is_field_default(state.active_date_field()) {
        let prefix = date_param_prefix(state.content_type);
        if let Some(range) = state.active_date_range() {
            if let Some(start) = range.start {
                params.push(&format!("{}.gte", prefix), start.format("%Y-%m-%d").to_string());
            }
            if let Some(end) = range.end {
                params.push(&format!("{}.lte", prefix), end.format("%Y-%m-%d").to_string());
            }
        }
    }

    push_range(&mut params, state, FilterField::Runtime, &state.runtime);
    push_range(&mut params, state, FilterField::VoteAverage, &state.vote_average);
    push_range(&mut params, state, FilterField::VoteCount, &state.vote_count);

    push_text(&mut params, "with_original_language", &state.original_language);
    if is_movie {
        push_text(&mut params, "region", &state.region);
    }
    push_text(&mut params, "watch_region", &state.watch_region);
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

    if is_movie {
        params.push("with_people", join_ids(state.people.iter()));
    }
    params.push("with_companies", join_ids(state.companies.iter()));
    if !is_movie {
        params.push("with_networks", join_ids(state.networks.iter()));
    }

    if is_movie {
        push_text(&mut params, "certification_country", &state.certification_country);
        push_text(&mut params, "certification", &state.certification);
    }

    params
}

/// 当前内容类型的日期参数前缀
pub fn date_param_prefix(content_type: ContentType) -> &'static str {
    match content_type {
        ContentType::Movie => "primary_release_date",
        ContentType::Tv => "first_air_date",
    }
}

pub(crate) fn join_ids<'a>(ids: impl Iterator<Item = &'a u32>) -> String {
    ids.map(|id| id.to_string()).collect::<Vec<_>>().join(",")
}

pub(crate) fn bool_param(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

pub(crate) fn format_number(value: f64) -> String {
    // f64 的 Display 不会输出多余的 ".0"
    value.to_string()
}

fn push_text(params: &mut QueryParams, name: &str, value: &Option<String>) {
    if let Some(value) = value {
        params.push(name, value.trim());
    }
}

/// 输出 `.gte` / `.lte` 两个独立边界，哨兵值不输出
pub(crate) fn push_range(
    params: &mut QueryParams,
    state: &FilterState,
    field: FilterField,
    range: &Option<NumericRange>,
) {
    let Some(facet) = field.range_facet() else {
        return;
    };
    if state.is_field_default(field) {
        return;
    }
    if let Some(range) = range {
        let (min, max) = range.effective(facet);
        if let Some(min) = min {
            params.push(&format!("{}.gte", facet.param_name()), format_number(min));
        }
        if let Some(max) = max {
            params.push(&format!("{}.lte", facet.param_name()), format_number(max));
        }
    }
}
