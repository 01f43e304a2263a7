pub mod paths;
pub mod service;
pub mod settings;
pub mod validation;

pub use paths::AppPaths;
pub use service::ConfigService;
pub use settings::{
    AppSettings, EmbeddingProviderKind, EmbeddingSettings, GenerationSettings, HistorySettings,
    IngestionSettings, RetrievalSettings, ServerSettings, VectorIndexKind, VectorIndexSettings,
};
