// 分类预设与合并
//
// 切换分类时，新分类的默认值会替换掉旧分类的"脚手架"（排序、日期窗口等），
// 但用户明确设置过的收窄条件（粘性字段）会被保留下来

use chrono::{Duration, Local, NaiveDate};

use crate::models::{
    create_default_filters, ContentType, DateRange, FilterField, FilterState, NumericRange,
    SortBy, SortDirection, SortField, DEFAULT_CATEGORY,
};

/// 切换分类时保留的字段（需要显式加入）
pub const STICKY_FIELDS: [FilterField; 10] = [
    FilterField::GenresInclude,
    FilterField::GenresExclude,
    FilterField::KeywordsInclude,
    FilterField::KeywordsExclude,
    FilterField::VoteAverage,
    FilterField::VoteCount,
    FilterField::Runtime,
    FilterField::WatchProviders,
    FilterField::MonetizationTypes,
    FilterField::WatchRegion,
];

/// 分类预设目录
///
/// 部分预设依赖"今天"，日期在构造时注入
#[derive(Debug, Clone, Copy)]
pub struct PresetCatalog {
    today: NaiveDate,
}

impl PresetCatalog {
    pub fn new(today: NaiveDate) -> Self {
        Self { today }
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// 某个分类在给定内容类型下的默认筛选状态
    ///
    /// 未知分类使用 discover 的默认值，但保留传入的分类标签
    pub fn defaults_for(&self, category: &str, content_type: ContentType) -> FilterState {
        let mut state = create_default_filters(content_type);
        let category = category.trim();
        state.category = if category.is_empty() {
            DEFAULT_CATEGORY.to_string()
        } else {
            category.to_string()
        };

        let today = self.today;
        let window = |from: i64, to: i64| {
            DateRange::new(Some(today + Duration::days(from)), Some(today + Duration::days(to)))
        };

        match (category, content_type) {
            ("popular", _) => {
                state.vote_count = NumericRange::new(Some(50.0), None);
            }
            ("trending", _) => set_active_dates(&mut state, window(-30, 0)),
            ("top_rated", _) => {
                state.sort_by = SortBy::new(SortField::VoteAverage, SortDirection::Desc);
                state.vote_count = NumericRange::new(Some(200.0), None);
            }
            ("upcoming", ContentType::Movie) => {
                state.sort_by = SortBy::new(SortField::ReleaseDate, SortDirection::Asc);
                state.release_date = window(0, 60);
            }
            ("now_playing", ContentType::Movie) => state.release_date = window(-30, 0),
            ("airing_today", ContentType::Tv) => state.air_date = window(0, 0),
            ("on_the_air", ContentType::Tv) => state.air_date = window(0, 7),
            ("discover", _) => {}
            (other, _) => {
                tracing::debug!(
                    "Category {} has no {} preset, using discover defaults",
                    other,
                    content_type
                );
            }
        }

        state
    }

    /// 切换到新分类，同时保留用户设置过的粘性字段
    ///
    /// 与当前分类的预设值相同的字段属于预设本身，不会被带到新分类
    pub fn apply_preset(&self, current: &FilterState, category: &str) -> FilterState {
        let mut next = self.defaults_for(category, current.content_type);
        let leaving = self.defaults_for(&current.category, current.content_type);
        let narrowed = current.changed_fields(&leaving);

        for field in STICKY_FIELDS {
            if narrowed.contains(&field) && !current.is_field_default(field) {
                next.copy_field_from(current, field);
            }
        }

        next.ui = current.ui.clone();
        next
    }
}

impl Default for PresetCatalog {
    fn default() -> Self {
        Self::new(Local::now().date_naive())
    }
}

fn set_active_dates(state: &mut FilterState, range: Option<DateRange>) {
    match state.content_type {
        ContentType::Movie => state.release_date = range,
        ContentType::Tv => state.air_date = range,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> PresetCatalog {
        PresetCatalog::new(NaiveDate::from_ymd_opt(2024, 6, 15).unwrap())
    }

    #[test]
    fn test_preset_without_overrides_is_pure_reset() {
        let catalog = catalog();
        let mut current = catalog.defaults_for("upcoming", ContentType::Movie);
        current.page = 4;

        let next = catalog.apply_preset(&current, "top_rated");
        assert_eq!(next, catalog.defaults_for("top_rated", ContentType::Movie));
    }

    #[test]
    fn test_sticky_fields_survive_preset_switch() {
        let catalog = catalog();
        let mut current = catalog.defaults_for("upcoming", ContentType::Movie);
        current.genres_include.insert(28);
        current.vote_average = NumericRange::new(Some(7.5), None);

        let next = catalog.apply_preset(&current, "popular");
        assert!(next.genres_include.contains(&28));
        assert_eq!(next.vote_average.unwrap().min, Some(7.5));
        // 排序和日期窗口来自新预设
        assert_eq!(next.sort_by, SortBy::popularity_desc());
        assert_eq!(next.release_date, None);
        assert_eq!(next.category, "popular");
    }

    #[test]
    fn test_user_threshold_overrides_preset_threshold() {
        let catalog = catalog();
        let mut current = create_default_filters(ContentType::Movie);
        current.vote_count = NumericRange::new(Some(1000.0), None);

        let next = catalog.apply_preset(&current, "top_rated");
        assert_eq!(next.vote_count.unwrap().min, Some(1000.0));

        // 用户没设置时使用预设的门槛
        let next = catalog.apply_preset(&create_default_filters(ContentType::Movie), "top_rated");
        assert_eq!(next.vote_count.unwrap().min, Some(200.0));
    }

    #[test]
    fn test_preset_thresholds_do_not_leak() {
        let catalog = catalog();
        let popular = catalog.defaults_for("popular", ContentType::Movie);

        let next = catalog.apply_preset(&popular, "top_rated");
        assert_eq!(next, catalog.defaults_for("top_rated", ContentType::Movie));
        assert_eq!(next.vote_count.unwrap().min, Some(200.0));

        // 反方向同样不带走 top_rated 的门槛
        let next = catalog.apply_preset(&next, "popular");
        assert_eq!(next, popular);
    }

    #[test]
    fn test_user_change_to_preset_field_is_kept() {
        let catalog = catalog();
        let mut current = catalog.defaults_for("popular", ContentType::Movie);
        current.vote_count = NumericRange::new(Some(500.0), None);
        current.genres_include.insert(18);

        let next = catalog.apply_preset(&current, "top_rated");
        assert_eq!(next.vote_count.unwrap().min, Some(500.0));
        assert!(next.genres_include.contains(&18));
    }

    #[test]
    fn test_non_sticky_fields_are_dropped() {
        let catalog = catalog();
        let mut current = create_default_filters(ContentType::Movie);
        current.people.insert(500);
        current.search_query = Some("alien".to_string());
        current.sort_by = SortBy::new(SortField::Title, SortDirection::Asc);

        let next = catalog.apply_preset(&current, "discover");
        assert!(next.people.is_empty());
        assert_eq!(next.search_query, None);
        assert_eq!(next.sort_by, SortBy::popularity_desc());
    }

    #[test]
    fn test_unknown_category_falls_back_to_discover() {
        let catalog = catalog();
        let state = catalog.defaults_for("staff_picks", ContentType::Tv);
        let mut expected = create_default_filters(ContentType::Tv);
        expected.category = "staff_picks".to_string();
        assert_eq!(state, expected);

        // 电影专属分类用于剧集时同样回落
        let state = catalog.defaults_for("upcoming", ContentType::Tv);
        assert_eq!(state.air_date, None);
        assert_eq!(state.sort_by, SortBy::popularity_desc());
    }

    #[test]
    fn test_date_windows_use_injected_today() {
        let catalog = catalog();
        let state = catalog.defaults_for("on_the_air", ContentType::Tv);
        let range = state.air_date.unwrap();
        assert_eq!(range.start, NaiveDate::from_ymd_opt(2024, 6, 15));
        assert_eq!(range.end, NaiveDate::from_ymd_opt(2024, 6, 22));
    }

    #[test]
    fn test_content_type_is_kept() {
        let catalog = catalog();
        let current = create_default_filters(ContentType::Tv);
        let next = catalog.apply_preset(&current, "trending");
        assert_eq!(next.content_type, ContentType::Tv);
        assert!(next.air_date.is_some());
        assert!(next.release_date.is_none());
    }
}
