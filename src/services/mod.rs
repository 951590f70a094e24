pub mod debounce;
pub mod error;
pub mod filter_session;
pub mod filter_store;
pub mod preset_library;
pub mod preset_merger;
pub mod query_builder;
pub mod url_sync;

pub use debounce::{AbortSignal, Commit, DebounceSession, TransitionKind, DEFAULT_DEBOUNCE};
pub use error::{CatalogError, PresetError, StorageError};
pub use filter_session::{FilterSession, SessionOptions};
pub use filter_store::{FilterStore, FilterUpdate};
pub use preset_library::{PresetLibrary, DEFAULT_MAX_PRESETS, PRESET_STORAGE_KEY};
pub use preset_merger::{PresetCatalog, STICKY_FIELDS};
pub use query_builder::{
    build_catalog_request, build_query_params, CatalogEndpoint, CatalogRequest, QueryParams,
};
pub use url_sync::{HistoryMode, HydrationPhase, SyncOutcome, UrlCodec, UrlSynchronizer};
