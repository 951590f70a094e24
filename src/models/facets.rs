// 筛选维度定义
//
// 定义了高级筛选中每个维度的取值类型：
// - 内容类型（电影 / 剧集）
// - 排序字段与方向
// - 观看渠道的付费方式
// - 数值范围维度及其滑块哨兵值

use serde::{Deserialize, Serialize};
use std::fmt;

/// 内容类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Movie,
    Tv,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Movie => "movie",
            ContentType::Tv => "tv",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "movie" | "movies" => Some(ContentType::Movie),
            "tv" | "series" => Some(ContentType::Tv),
            _ => None,
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 排序字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Popularity,
    VoteAverage,
    VoteCount,
    /// 电影为上映日期，剧集为首播日期
    ReleaseDate,
    /// 电影为原始标题，剧集为名称
    Title,
}

/// 排序方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// 排序键（字段 + 方向）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortBy {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortBy {
    pub const fn new(field: SortField, direction: SortDirection) -> Self {
        Self { field, direction }
    }

    pub const fn popularity_desc() -> Self {
        Self::new(SortField::Popularity, SortDirection::Desc)
    }

    /// 生成目录 API 的排序参数，例如 `popularity.desc`
    pub fn to_param(&self, content_type: ContentType) -> String {
        let field = match (self.field, content_type) {
            (SortField::Popularity, _) => "popularity",
            (SortField::VoteAverage, _) => "vote_average",
            (SortField::VoteCount, _) => "vote_count",
            (SortField::ReleaseDate, ContentType::Movie) => "primary_release_date",
            (SortField::ReleaseDate, ContentType::Tv) => "first_air_date",
            (SortField::Title, ContentType::Movie) => "original_title",
            (SortField::Title, ContentType::Tv) => "name",
        };
        format!("{}.{}", field, self.direction.as_str())
    }

    /// 解析排序参数，两种内容类型的字段名都接受
    pub fn parse(s: &str) -> Option<Self> {
        let (field, direction) = s.trim().rsplit_once('.')?;
        let field = match field {
            "popularity" => SortField::Popularity,
            "vote_average" => SortField::VoteAverage,
            "vote_count" => SortField::VoteCount,
            "primary_release_date" | "first_air_date" | "release_date" => SortField::ReleaseDate,
            "original_title" | "title" | "name" | "original_name" => SortField::Title,
            _ => return None,
        };
        let direction = match direction {
            "asc" => SortDirection::Asc,
            "desc" => SortDirection::Desc,
            _ => return None,
        };
        Some(Self::new(field, direction))
    }
}

impl Default for SortBy {
    fn default() -> Self {
        Self::popularity_desc()
    }
}

/// 观看渠道付费方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonetizationType {
    Flatrate,
    Free,
    Ads,
    Rent,
    Buy,
}

impl MonetizationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MonetizationType::Flatrate => "flatrate",
            MonetizationType::Free => "free",
            MonetizationType::Ads => "ads",
            MonetizationType::Rent => "rent",
            MonetizationType::Buy => "buy",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "flatrate" => Some(MonetizationType::Flatrate),
            "free" => Some(MonetizationType::Free),
            "ads" => Some(MonetizationType::Ads),
            "rent" => Some(MonetizationType::Rent),
            "buy" => Some(MonetizationType::Buy),
            _ => None,
        }
    }
}

/// 数值范围维度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeFacet {
    /// 时长（分钟）
    Runtime,
    /// 评分（0-10）
    VoteAverage,
    /// 评分人数
    VoteCount,
}

impl RangeFacet {
    /// 滑块的下限哨兵值，等于它的下界视为未设置
    pub fn floor(&self) -> f64 {
        0.0
    }

    /// 滑块的上限哨兵值，`None` 表示没有上限哨兵
    pub fn ceiling(&self) -> Option<f64> {
        match self {
            RangeFacet::Runtime => Some(400.0),
            RangeFacet::VoteAverage => Some(10.0),
            RangeFacet::VoteCount => None,
        }
    }

    /// 目录 API 中的参数前缀，后接 `.gte` / `.lte`
    pub fn param_name(&self) -> &'static str {
        match self {
            RangeFacet::Runtime => "with_runtime",
            RangeFacet::VoteAverage => "vote_average",
            RangeFacet::VoteCount => "vote_count",
        }
    }

    pub fn is_floor(&self, value: f64) -> bool {
        value <= self.floor()
    }

    pub fn is_ceiling(&self, value: f64) -> bool {
        self.ceiling().map(|c| value >= c).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_param_depends_on_content_type() {
        let sort = SortBy::new(SortField::ReleaseDate, SortDirection::Asc);
        assert_eq!(sort.to_param(ContentType::Movie), "primary_release_date.asc");
        assert_eq!(sort.to_param(ContentType::Tv), "first_air_date.asc");

        let sort = SortBy::new(SortField::Title, SortDirection::Desc);
        assert_eq!(sort.to_param(ContentType::Tv), "name.desc");
    }

    #[test]
    fn test_sort_parse_accepts_both_dialects() {
        let movie = SortBy::parse("primary_release_date.desc").unwrap();
        let tv = SortBy::parse("first_air_date.desc").unwrap();
        assert_eq!(movie, tv);
        assert!(SortBy::parse("popularity").is_none());
        assert!(SortBy::parse("budget.desc").is_none());
        assert!(SortBy::parse("popularity.sideways").is_none());
    }

    #[test]
    fn test_range_sentinels() {
        assert!(RangeFacet::VoteAverage.is_floor(0.0));
        assert!(RangeFacet::VoteAverage.is_ceiling(10.0));
        assert!(!RangeFacet::VoteAverage.is_ceiling(9.5));
        // 评分人数没有上限哨兵
        assert!(!RangeFacet::VoteCount.is_ceiling(1_000_000.0));
    }

    #[test]
    fn test_content_type_parse() {
        assert_eq!(ContentType::parse("TV"), Some(ContentType::Tv));
        assert_eq!(ContentType::parse("movie"), Some(ContentType::Movie));
        assert_eq!(ContentType::parse("anime"), None);
    }
}
