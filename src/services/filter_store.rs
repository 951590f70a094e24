// 筛选状态存储
//
// 所有修改都以"复制 - 修改 - 整体替换"的方式进行，不会原地修改嵌套结构，
// 下游可以放心依赖值比较做变更检测。存储本身没有副作用，网络请求和
// URL 写入都由下游（防抖会话、URL 同步器）负责

use chrono::NaiveDate;
use std::collections::BTreeSet;

use crate::models::{
    create_default_filters, ContentType, DateRange, FilterField, FilterState, MonetizationType,
    NumericRange, SortBy,
};
use crate::services::preset_merger::PresetCatalog;

/// 最近使用的类型最多保留几个
const RECENT_PICKS_LIMIT: usize = 8;

/// 单个字段的更新
#[derive(Debug, Clone, PartialEq)]
pub enum FilterUpdate {
    ContentType(ContentType),
    Category(String),
    SortBy(SortBy),
    Page(u32),
    SearchQuery(Option<String>),
    IncludeAdult(bool),
    OriginalLanguage(Option<String>),
    Region(Option<String>),
    WatchRegion(Option<String>),
    CertificationCountry(Option<String>),
    Certification(Option<String>),
    ReleaseDate(Option<DateRange>),
    AirDate(Option<DateRange>),
    /// 整体替换某个 ID 集合字段
    Ids(FilterField, BTreeSet<u32>),
    MonetizationTypes(BTreeSet<MonetizationType>),
    /// 直接设置范围（不做哨兵转换）
    Range(FilterField, Option<NumericRange>),
}

impl FilterUpdate {
    fn field(&self) -> FilterField {
        match self {
            FilterUpdate::ContentType(_) => FilterField::ContentType,
            FilterUpdate::Category(_) => FilterField::Category,
            FilterUpdate::SortBy(_) => FilterField::SortBy,
            FilterUpdate::Page(_) => FilterField::Page,
            FilterUpdate::SearchQuery(_) => FilterField::SearchQuery,
            FilterUpdate::IncludeAdult(_) => FilterField::IncludeAdult,
            FilterUpdate::OriginalLanguage(_) => FilterField::OriginalLanguage,
            FilterUpdate::Region(_) => FilterField::Region,
            FilterUpdate::WatchRegion(_) => FilterField::WatchRegion,
            FilterUpdate::CertificationCountry(_) => FilterField::CertificationCountry,
            FilterUpdate::Certification(_) => FilterField::Certification,
            FilterUpdate::ReleaseDate(_) => FilterField::ReleaseDate,
            FilterUpdate::AirDate(_) => FilterField::AirDate,
            FilterUpdate::Ids(field, _) => *field,
            FilterUpdate::MonetizationTypes(_) => FilterField::MonetizationTypes,
            FilterUpdate::Range(field, _) => *field,
        }
    }

    fn apply(self, state: &mut FilterState) {
        match self {
            FilterUpdate::ContentType(v) => state.content_type = v,
            FilterUpdate::Category(v) => state.category = v,
            FilterUpdate::SortBy(v) => state.sort_by = v,
            FilterUpdate::Page(v) => state.page = v.max(1),
            FilterUpdate::SearchQuery(v) => state.search_query = non_blank(v),
            FilterUpdate::IncludeAdult(v) => state.include_adult = v,
            FilterUpdate::OriginalLanguage(v) => state.original_language = non_blank(v),
            FilterUpdate::Region(v) => state.region = non_blank(v),
            FilterUpdate::WatchRegion(v) => state.watch_region = non_blank(v),
            FilterUpdate::CertificationCountry(v) => state.certification_country = non_blank(v),
            FilterUpdate::Certification(v) => state.certification = non_blank(v),
            FilterUpdate::ReleaseDate(v) => state.release_date = v.filter(|r| !r.is_empty()),
            FilterUpdate::AirDate(v) => state.air_date = v.filter(|r| !r.is_empty()),
            FilterUpdate::Ids(field, ids) => {
                if let Some(set) = state.id_set_mut(field) {
                    *set = ids;
                } else {
                    tracing::warn!("{:?} is not an ID set field, update ignored", field);
                }
            }
            FilterUpdate::MonetizationTypes(v) => state.monetization_types = v,
            FilterUpdate::Range(field, range) => {
                if let Some(slot) = state.range_mut(field) {
                    *slot = range.and_then(|r| NumericRange::new(r.min, r.max));
                } else {
                    tracing::warn!("{:?} is not a range field, update ignored", field);
                }
            }
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// 筛选状态存储
#[derive(Debug, Clone)]
pub struct FilterStore {
    state: FilterState,
    presets: PresetCatalog,
}

impl FilterStore {
    pub fn new(content_type: ContentType, presets: PresetCatalog) -> Self {
        Self {
            state: presets.defaults_for(crate::models::DEFAULT_CATEGORY, content_type),
            presets,
        }
    }

    pub fn with_state(state: FilterState, presets: PresetCatalog) -> Self {
        Self { state, presets }
    }

    pub fn state(&self) -> &FilterState {
        &self.state
    }

    pub fn presets(&self) -> &PresetCatalog {
        &self.presets
    }

    pub fn has_active_filters(&self) -> bool {
        self.state.has_active_filters()
    }

    fn replace_with(&mut self, next: FilterState) -> &FilterState {
        self.state = next;
        &self.state
    }

    /// 更新单个字段
    ///
    /// 除翻页外的任何筛选变化都会回到第一页
    pub fn update_field(&mut self, update: FilterUpdate) -> &FilterState {
        let field = update.field();
        let mut next = self.state.clone();
        update.apply(&mut next);
        if field != FilterField::Page && !next.same_facets(&self.state) {
            next.page = 1;
        }
        self.replace_with(next)
    }

    /// 切换 ID 是否在集合中，返回切换后是否存在
    pub fn toggle_in_set(&mut self, field: FilterField, id: u32) -> bool {
        let mut next = self.state.clone();
        let Some(set) = next.id_set_mut(field) else {
            tracing::warn!("{:?} is not an ID set field, toggle ignored", field);
            return false;
        };

        let present = if set.remove(&id) {
            false
        } else {
            set.insert(id);
            true
        };

        if present && matches!(field, FilterField::GenresInclude | FilterField::GenresExclude) {
            remember_pick(&mut next.ui.recent_genres, id);
        }
        next.page = 1;
        self.replace_with(next);
        present
    }

    /// 切换付费方式
    pub fn toggle_monetization(&mut self, kind: MonetizationType) -> bool {
        let mut next = self.state.clone();
        let present = if next.monetization_types.remove(&kind) {
            false
        } else {
            next.monetization_types.insert(kind);
            true
        };
        next.page = 1;
        self.replace_with(next);
        present
    }

    /// 根据滑块值设置范围，滑块两端的哨兵值视为不限
    pub fn set_range(&mut self, field: FilterField, min: Option<f64>, max: Option<f64>) -> &FilterState {
        let Some(facet) = field.range_facet() else {
            tracing::warn!("{:?} is not a range field, set_range ignored", field);
            return &self.state;
        };
        let mut next = self.state.clone();
        if let Some(slot) = next.range_mut(field) {
            *slot = NumericRange::from_slider(facet, min, max);
        }
        next.page = 1;
        self.replace_with(next)
    }

    /// 设置当前内容类型的日期范围
    pub fn set_date_range(&mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> &FilterState {
        let range = DateRange::new(start, end);
        let update = match self.state.content_type {
            ContentType::Movie => FilterUpdate::ReleaseDate(range),
            ContentType::Tv => FilterUpdate::AirDate(range),
        };
        self.update_field(update)
    }

    /// 切换分类预设，保留粘性字段
    pub fn set_preset(&mut self, category: &str) -> &FilterState {
        let next = self.presets.apply_preset(&self.state, category);
        tracing::debug!("Switched category to {}", next.category);
        self.replace_with(next)
    }

    /// 清除所有筛选，保留内容类型和当前分类
    pub fn clear_all(&mut self) -> &FilterState {
        let mut next = self
            .presets
            .defaults_for(&self.state.category, self.state.content_type);
        next.ui = self.state.ui.clone();
        self.replace_with(next)
    }

    /// 恢复为默认状态，可附带若干覆盖项
    pub fn reset_to_defaults(&mut self, overrides: Vec<FilterUpdate>) -> &FilterState {
        let mut next = create_default_filters(self.state.content_type);
        for update in overrides {
            update.apply(&mut next);
        }
        self.replace_with(next)
    }

    /// 整体替换状态（URL 水合、加载预设时使用）
    pub fn replace_state(&mut self, state: FilterState) -> &FilterState {
        let ui = self.state.ui.clone();
        self.replace_with(FilterState { ui, ..state })
    }

    /// 切换面板的展开状态，只影响界面状态
    pub fn toggle_panel(&mut self, panel: &str) -> bool {
        let mut next = self.state.clone();
        let open = if next.ui.open_panels.remove(panel) {
            false
        } else {
            next.ui.open_panels.insert(panel.to_string());
            true
        };
        self.replace_with(next);
        open
    }
}

fn remember_pick(recent: &mut Vec<u32>, id: u32) {
    recent.retain(|existing| *existing != id);
    recent.insert(0, id);
    recent.truncate(RECENT_PICKS_LIMIT);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RangeFacet, SortDirection, SortField};

    fn store() -> FilterStore {
        FilterStore::new(
            ContentType::Movie,
            PresetCatalog::new(NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()),
        )
    }

    #[test]
    fn test_toggle_twice_restores_set() {
        let mut store = store();
        store.toggle_in_set(FilterField::GenresInclude, 35);
        let before = store.state().genres_include.clone();

        assert!(store.toggle_in_set(FilterField::GenresInclude, 28));
        assert!(!store.toggle_in_set(FilterField::GenresInclude, 28));
        assert_eq!(store.state().genres_include, before);
    }

    #[test]
    fn test_toggle_rejects_non_set_field() {
        let mut store = store();
        let before = store.state().clone();
        assert!(!store.toggle_in_set(FilterField::SortBy, 1));
        assert_eq!(store.state(), &before);
    }

    #[test]
    fn test_update_field_resets_page() {
        let mut store = store();
        store.update_field(FilterUpdate::Page(5));
        assert_eq!(store.state().page, 5);

        store.update_field(FilterUpdate::OriginalLanguage(Some(" ja ".to_string())));
        assert_eq!(store.state().original_language.as_deref(), Some("ja"));
        assert_eq!(store.state().page, 1);
    }

    #[test]
    fn test_update_field_produces_new_value() {
        let mut store = store();
        let snapshot = store.state().clone();
        store.update_field(FilterUpdate::Ids(
            FilterField::WatchProviders,
            [8, 9].into_iter().collect(),
        ));
        assert!(snapshot.watch_providers.is_empty());
        assert_eq!(store.state().watch_providers.len(), 2);
    }

    #[test]
    fn test_set_range_sentinels() {
        let mut store = store();
        store.set_range(FilterField::VoteAverage, Some(0.0), Some(10.0));
        assert_eq!(store.state().vote_average, None);
        assert!(!store.has_active_filters());

        store.set_range(FilterField::VoteAverage, Some(7.5), Some(10.0));
        let range = store.state().vote_average.unwrap();
        assert_eq!(range.effective(RangeFacet::VoteAverage), (Some(7.5), None));
        assert!(store.has_active_filters());
    }

    #[test]
    fn test_set_date_range_follows_content_type() {
        let mut store = store();
        store.update_field(FilterUpdate::ContentType(ContentType::Tv));
        store.set_date_range(NaiveDate::from_ymd_opt(2020, 1, 1), None);
        assert!(store.state().air_date.is_some());
        assert!(store.state().release_date.is_none());
    }

    #[test]
    fn test_set_preset_preserves_user_narrowing() {
        let mut store = store();
        store.toggle_in_set(FilterField::GenresInclude, 28);
        store.set_range(FilterField::VoteAverage, Some(7.5), None);
        store.update_field(FilterUpdate::SortBy(SortBy::new(SortField::Title, SortDirection::Asc)));

        store.set_preset("top_rated");
        let state = store.state();
        assert!(state.genres_include.contains(&28));
        assert_eq!(state.vote_average.unwrap().min, Some(7.5));
        assert_eq!(state.sort_by, SortBy::new(SortField::VoteAverage, SortDirection::Desc));
    }

    #[test]
    fn test_clear_all_keeps_category_and_ui() {
        let mut store = store();
        store.set_preset("top_rated");
        store.toggle_panel("genres");
        store.toggle_in_set(FilterField::People, 31);

        store.clear_all();
        assert_eq!(store.state().category, "top_rated");
        assert!(store.state().people.is_empty());
        assert!(store.state().ui.open_panels.contains("genres"));
    }

    #[test]
    fn test_reset_to_defaults_with_overrides() {
        let mut store = store();
        store.set_preset("top_rated");
        store.reset_to_defaults(vec![FilterUpdate::IncludeAdult(true)]);

        let mut expected = create_default_filters(ContentType::Movie);
        expected.include_adult = true;
        assert_eq!(store.state(), &expected);
    }

    #[test]
    fn test_recent_genre_picks() {
        let mut store = store();
        for id in [1, 2, 3, 1] {
            store.toggle_in_set(FilterField::GenresInclude, id);
            store.toggle_in_set(FilterField::GenresInclude, id);
        }
        assert_eq!(store.state().ui.recent_genres, vec![1, 3, 2]);
        assert!(!store.has_active_filters());
    }
}
