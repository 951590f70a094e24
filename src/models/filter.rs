// 高级筛选状态
//
// FilterState 是对目录查询的完整描述，所有下游（防抖、URL 同步、查询构建）
// 都以它为唯一数据源。某个字段是否处于默认值的判断集中在
// `FilterState::is_field_default`，查询构建和 `has_active_filters` 共用。

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::facets::{ContentType, MonetizationType, RangeFacet, SortBy};

/// 默认分类
pub const DEFAULT_CATEGORY: &str = "discover";

/// 数值范围，两端都可选
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct NumericRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl NumericRange {
    /// 两端都为空时返回 `None`
    pub fn new(min: Option<f64>, max: Option<f64>) -> Option<Self> {
        if min.is_none() && max.is_none() {
            None
        } else {
            Some(Self { min, max })
        }
    }

    /// 去掉滑块哨兵值后构建范围
    ///
    /// 例如评分滑块的 0 和 10 代表"不限"，不会被保留为显式边界
    pub fn from_slider(facet: RangeFacet, min: Option<f64>, max: Option<f64>) -> Option<Self> {
        let min = min.filter(|v| v.is_finite() && !facet.is_floor(*v));
        let max = max.filter(|v| v.is_finite() && !facet.is_ceiling(*v));
        Self::new(min, max)
    }

    /// 实际生效的边界（哨兵值视为未设置）
    pub fn effective(&self, facet: RangeFacet) -> (Option<f64>, Option<f64>) {
        (
            self.min.filter(|v| !facet.is_floor(*v)),
            self.max.filter(|v| !facet.is_ceiling(*v)),
        )
    }
}

/// 日期范围，两端都可选
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DateRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Option<Self> {
        if start.is_none() && end.is_none() {
            None
        } else {
            Some(Self { start, end })
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

/// 仅供界面使用的状态，不会进入 API 请求、URL 或预设
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UiState {
    pub open_panels: BTreeSet<String>,
    pub recent_genres: Vec<u32>,
}

/// FilterState 的顶层字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FilterField {
    ContentType,
    Category,
    GenresInclude,
    GenresExclude,
    KeywordsInclude,
    KeywordsExclude,
    ReleaseDate,
    AirDate,
    Runtime,
    VoteAverage,
    VoteCount,
    OriginalLanguage,
    Region,
    WatchRegion,
    WatchProviders,
    MonetizationTypes,
    People,
    Companies,
    Networks,
    IncludeAdult,
    CertificationCountry,
    Certification,
    SortBy,
    Page,
    SearchQuery,
}

impl FilterField {
    pub const ALL: [FilterField; 25] = [
        FilterField::ContentType,
        FilterField::Category,
        FilterField::GenresInclude,
        FilterField::GenresExclude,
        FilterField::KeywordsInclude,
        FilterField::KeywordsExclude,
        FilterField::ReleaseDate,
        FilterField::AirDate,
        FilterField::Runtime,
        FilterField::VoteAverage,
        FilterField::VoteCount,
        FilterField::OriginalLanguage,
        FilterField::Region,
        FilterField::WatchRegion,
        FilterField::WatchProviders,
        FilterField::MonetizationTypes,
        FilterField::People,
        FilterField::Companies,
        FilterField::Networks,
        FilterField::IncludeAdult,
        FilterField::CertificationCountry,
        FilterField::Certification,
        FilterField::SortBy,
        FilterField::Page,
        FilterField::SearchQuery,
    ];

    /// 变更后立即生效、不需要防抖的字段
    pub fn is_instant(&self) -> bool {
        matches!(
            self,
            FilterField::Category | FilterField::ContentType | FilterField::SortBy
        )
    }

    /// 数值范围字段对应的维度
    pub fn range_facet(&self) -> Option<RangeFacet> {
        match self {
            FilterField::Runtime => Some(RangeFacet::Runtime),
            FilterField::VoteAverage => Some(RangeFacet::VoteAverage),
            FilterField::VoteCount => Some(RangeFacet::VoteCount),
            _ => None,
        }
    }
}

/// 高级筛选状态
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterState {
    pub content_type: ContentType,
    pub category: String,

    pub genres_include: BTreeSet<u32>,
    pub genres_exclude: BTreeSet<u32>,
    pub keywords_include: BTreeSet<u32>,
    pub keywords_exclude: BTreeSet<u32>,

    /// 电影上映日期
    pub release_date: Option<DateRange>,
    /// 剧集首播日期
    pub air_date: Option<DateRange>,

    pub runtime: Option<NumericRange>,
    pub vote_average: Option<NumericRange>,
    pub vote_count: Option<NumericRange>,

    pub original_language: Option<String>,
    pub region: Option<String>,
    pub watch_region: Option<String>,
    pub watch_providers: BTreeSet<u32>,
    pub monetization_types: BTreeSet<MonetizationType>,

    pub people: BTreeSet<u32>,
    pub companies: BTreeSet<u32>,
    pub networks: BTreeSet<u32>,

    pub include_adult: bool,
    pub certification_country: Option<String>,
    pub certification: Option<String>,

    pub sort_by: SortBy,
    pub page: u32,
    pub search_query: Option<String>,

    #[serde(skip)]
    pub ui: UiState,
}

/// 创建某个内容类型的默认筛选状态
///
/// 每次调用都返回一个全新的值，不与其他状态共享任何嵌套结构
pub fn create_default_filters(content_type: ContentType) -> FilterState {
    FilterState {
        content_type,
        category: DEFAULT_CATEGORY.to_string(),
        genres_include: BTreeSet::new(),
        genres_exclude: BTreeSet::new(),
        keywords_include: BTreeSet::new(),
        keywords_exclude: BTreeSet::new(),
        release_date: None,
        air_date: None,
        runtime: None,
        vote_average: None,
        vote_count: None,
        original_language: None,
        region: None,
        watch_region: None,
        watch_providers: BTreeSet::new(),
        monetization_types: BTreeSet::new(),
        people: BTreeSet::new(),
        companies: BTreeSet::new(),
        networks: BTreeSet::new(),
        include_adult: false,
        certification_country: None,
        certification: None,
        sort_by: SortBy::default(),
        page: 1,
        search_query: None,
        ui: UiState::default(),
    }
}

impl Default for FilterState {
    fn default() -> Self {
        create_default_filters(ContentType::Movie)
    }
}

fn text_is_blank(value: &Option<String>) -> bool {
    value.as_deref().map(|s| s.trim().is_empty()).unwrap_or(true)
}

fn range_is_unset(range: &Option<NumericRange>, facet: RangeFacet) -> bool {
    match range {
        None => true,
        Some(r) => r.effective(facet) == (None, None),
    }
}

fn date_is_unset(range: &Option<DateRange>) -> bool {
    range.map(|r| r.is_empty()).unwrap_or(true)
}

impl FilterState {
    pub fn new(content_type: ContentType) -> Self {
        create_default_filters(content_type)
    }

    /// 当前内容类型下生效的日期范围
    pub fn active_date_range(&self) -> Option<DateRange> {
        match self.content_type {
            ContentType::Movie => self.release_date,
            ContentType::Tv => self.air_date,
        }
    }

    pub fn active_date_field(&self) -> FilterField {
        match self.content_type {
            ContentType::Movie => FilterField::ReleaseDate,
            ContentType::Tv => FilterField::AirDate,
        }
    }

    /// 字段是否处于默认值（即序列化时会被省略）
    pub fn is_field_default(&self, field: FilterField) -> bool {
        match field {
            // 内容类型决定了默认值本身，永远视为默认
            FilterField::ContentType => true,
            FilterField::Category => self.category.trim().is_empty() || self.category == DEFAULT_CATEGORY,
            FilterField::GenresInclude => self.genres_include.is_empty(),
            FilterField::GenresExclude => self.genres_exclude.is_empty(),
            FilterField::KeywordsInclude => self.keywords_include.is_empty(),
            FilterField::KeywordsExclude => self.keywords_exclude.is_empty(),
            FilterField::ReleaseDate => date_is_unset(&self.release_date),
            FilterField::AirDate => date_is_unset(&self.air_date),
            FilterField::Runtime => range_is_unset(&self.runtime, RangeFacet::Runtime),
            FilterField::VoteAverage => range_is_unset(&self.vote_average, RangeFacet::VoteAverage),
            FilterField::VoteCount => range_is_unset(&self.vote_count, RangeFacet::VoteCount),
            FilterField::OriginalLanguage => text_is_blank(&self.original_language),
            FilterField::Region => text_is_blank(&self.region),
            FilterField::WatchRegion => text_is_blank(&self.watch_region),
            FilterField::WatchProviders => self.watch_providers.is_empty(),
            FilterField::MonetizationTypes => self.monetization_types.is_empty(),
            FilterField::People => self.people.is_empty(),
            FilterField::Companies => self.companies.is_empty(),
            FilterField::Networks => self.networks.is_empty(),
            FilterField::IncludeAdult => !self.include_adult,
            FilterField::CertificationCountry => text_is_blank(&self.certification_country),
            FilterField::Certification => text_is_blank(&self.certification),
            FilterField::SortBy => self.sort_by == SortBy::default(),
            FilterField::Page => self.page <= 1,
            FilterField::SearchQuery => text_is_blank(&self.search_query),
        }
    }

    /// 是否有任何字段偏离了默认值
    pub fn has_active_filters(&self) -> bool {
        FilterField::ALL.iter().any(|f| !self.is_field_default(*f))
    }

    /// 两个状态之间发生变化的顶层字段（不含界面状态）
    pub fn changed_fields(&self, other: &FilterState) -> Vec<FilterField> {
        FilterField::ALL
            .iter()
            .copied()
            .filter(|field| !self.field_eq(other, *field))
            .collect()
    }

    /// 除界面状态外是否完全相同
    pub fn same_facets(&self, other: &FilterState) -> bool {
        FilterField::ALL.iter().all(|f| self.field_eq(other, *f))
    }

    fn field_eq(&self, other: &FilterState, field: FilterField) -> bool {
        match field {
            FilterField::ContentType => self.content_type == other.content_type,
            FilterField::Category => self.category == other.category,
            FilterField::GenresInclude => self.genres_include == other.genres_include,
            FilterField::GenresExclude => self.genres_exclude == other.genres_exclude,
            FilterField::KeywordsInclude => self.keywords_include == other.keywords_include,
            FilterField::KeywordsExclude => self.keywords_exclude == other.keywords_exclude,
            FilterField::ReleaseDate => self.release_date == other.release_date,
            FilterField::AirDate => self.air_date == other.air_date,
            FilterField::Runtime => self.runtime == other.runtime,
            FilterField::VoteAverage => self.vote_average == other.vote_average,
            FilterField::VoteCount => self.vote_count == other.vote_count,
            FilterField::OriginalLanguage => self.original_language == other.original_language,
            FilterField::Region => self.region == other.region,
            FilterField::WatchRegion => self.watch_region == other.watch_region,
            FilterField::WatchProviders => self.watch_providers == other.watch_providers,
            FilterField::MonetizationTypes => self.monetization_types == other.monetization_types,
            FilterField::People => self.people == other.people,
            FilterField::Companies => self.companies == other.companies,
            FilterField::Networks => self.networks == other.networks,
            FilterField::IncludeAdult => self.include_adult == other.include_adult,
            FilterField::CertificationCountry => {
                self.certification_country == other.certification_country
            }
            FilterField::Certification => self.certification == other.certification,
            FilterField::SortBy => self.sort_by == other.sort_by,
            FilterField::Page => self.page == other.page,
            FilterField::SearchQuery => self.search_query == other.search_query,
        }
    }

    /// 返回去掉界面状态的副本，用于持久化
    pub fn without_ui(&self) -> FilterState {
        FilterState {
            ui: UiState::default(),
            ..self.clone()
        }
    }

    /// 把 `source` 中某个字段的值复制过来
    pub fn copy_field_from(&mut self, source: &FilterState, field: FilterField) {
        match field {
            FilterField::ContentType => self.content_type = source.content_type,
            FilterField::Category => self.category = source.category.clone(),
            FilterField::GenresInclude => self.genres_include = source.genres_include.clone(),
            FilterField::GenresExclude => self.genres_exclude = source.genres_exclude.clone(),
            FilterField::KeywordsInclude => self.keywords_include = source.keywords_include.clone(),
            FilterField::KeywordsExclude => self.keywords_exclude = source.keywords_exclude.clone(),
            FilterField::ReleaseDate => self.release_date = source.release_date,
            FilterField::AirDate => self.air_date = source.air_date,
            FilterField::Runtime => self.runtime = source.runtime,
            FilterField::VoteAverage => self.vote_average = source.vote_average,
            FilterField::VoteCount => self.vote_count = source.vote_count,
            FilterField::OriginalLanguage => self.original_language = source.original_language.clone(),
            FilterField::Region => self.region = source.region.clone(),
            FilterField::WatchRegion => self.watch_region = source.watch_region.clone(),
            FilterField::WatchProviders => self.watch_providers = source.watch_providers.clone(),
            FilterField::MonetizationTypes => {
                self.monetization_types = source.monetization_types.clone()
            }
            FilterField::People => self.people = source.people.clone(),
            FilterField::Companies => self.companies = source.companies.clone(),
            FilterField::Networks => self.networks = source.networks.clone(),
            FilterField::IncludeAdult => self.include_adult = source.include_adult,
            FilterField::CertificationCountry => {
                self.certification_country = source.certification_country.clone()
            }
            FilterField::Certification => self.certification = source.certification.clone(),
            FilterField::SortBy => self.sort_by = source.sort_by,
            FilterField::Page => self.page = source.page,
            FilterField::SearchQuery => self.search_query = source.search_query.clone(),
        }
    }

    /// 整数 ID 集合字段的可变引用
    pub fn id_set_mut(&mut self, field: FilterField) -> Option<&mut BTreeSet<u32>> {
        match field {
            FilterField::GenresInclude => Some(&mut self.genres_include),
            FilterField::GenresExclude => Some(&mut self.genres_exclude),
            FilterField::KeywordsInclude => Some(&mut self.keywords_include),
            FilterField::KeywordsExclude => Some(&mut self.keywords_exclude),
            FilterField::WatchProviders => Some(&mut self.watch_providers),
            FilterField::People => Some(&mut self.people),
            FilterField::Companies => Some(&mut self.companies),
            FilterField::Networks => Some(&mut self.networks),
            _ => None,
        }
    }

    /// 数值范围字段的可变引用
    pub fn range_mut(&mut self, field: FilterField) -> Option<&mut Option<NumericRange>> {
        match field {
            FilterField::Runtime => Some(&mut self.runtime),
            FilterField::VoteAverage => Some(&mut self.vote_average),
            FilterField::VoteCount => Some(&mut self.vote_count),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filters_are_independent() {
        let a = create_default_filters(ContentType::Movie);
        let mut b = create_default_filters(ContentType::Movie);
        assert_eq!(a, b);

        b.genres_include.insert(28);
        b.ui.open_panels.insert("genres".to_string());
        assert!(a.genres_include.is_empty());
        assert!(a.ui.open_panels.is_empty());
        assert_ne!(a, b);
    }

    #[test]
    fn test_has_active_filters() {
        let mut state = create_default_filters(ContentType::Tv);
        assert!(!state.has_active_filters());

        // 界面状态不算筛选
        state.ui.open_panels.insert("dates".to_string());
        assert!(!state.has_active_filters());

        // 哨兵边界不算筛选
        state.vote_average = Some(NumericRange { min: Some(0.0), max: Some(10.0) });
        assert!(!state.has_active_filters());

        state.vote_average = Some(NumericRange { min: Some(6.0), max: None });
        assert!(state.has_active_filters());
    }

    #[test]
    fn test_changed_fields_ignores_ui() {
        let a = create_default_filters(ContentType::Movie);
        let mut b = a.clone();
        b.ui.recent_genres.push(12);
        assert!(a.changed_fields(&b).is_empty());
        assert!(a.same_facets(&b));

        b.sort_by = SortBy::parse("vote_average.desc").unwrap();
        b.genres_include.insert(12);
        assert_eq!(
            a.changed_fields(&b),
            vec![FilterField::GenresInclude, FilterField::SortBy]
        );
    }

    #[test]
    fn test_slider_range_drops_sentinels() {
        assert_eq!(
            NumericRange::from_slider(RangeFacet::VoteAverage, Some(0.0), Some(10.0)),
            None
        );
        assert_eq!(
            NumericRange::from_slider(RangeFacet::VoteAverage, Some(7.5), Some(10.0)),
            Some(NumericRange { min: Some(7.5), max: None })
        );
        assert_eq!(
            NumericRange::from_slider(RangeFacet::Runtime, Some(90.0), Some(180.0)),
            Some(NumericRange { min: Some(90.0), max: Some(180.0) })
        );
    }

    #[test]
    fn test_without_ui_and_serde_skip() {
        let mut state = create_default_filters(ContentType::Movie);
        state.ui.open_panels.insert("providers".to_string());
        state.genres_include.insert(18);

        let json = serde_json::to_string(&state).unwrap();
        assert!(!json.contains("open_panels"));

        let restored: FilterState = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, state.without_ui());
    }

    #[test]
    fn test_missing_fields_deserialize_to_defaults() {
        let restored: FilterState = serde_json::from_str(r#"{"content_type":"tv"}"#).unwrap();
        let mut expected = create_default_filters(ContentType::Tv);
        expected.content_type = ContentType::Tv;
        assert_eq!(restored.content_type, ContentType::Tv);
        assert_eq!(restored.page, 1);
        assert_eq!(restored.category, DEFAULT_CATEGORY);
        assert!(restored.same_facets(&expected));
    }
}
