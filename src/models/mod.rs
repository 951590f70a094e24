pub mod facets;
pub mod filter;
pub mod preset;

pub use facets::{ContentType, MonetizationType, RangeFacet, SortBy, SortDirection, SortField};
pub use filter::{
    create_default_filters, DateRange, FilterField, FilterState, NumericRange, UiState,
    DEFAULT_CATEGORY,
};
pub use preset::{FilterPreset, NewPreset, PresetUpdate};
