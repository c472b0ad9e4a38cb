//! Pure evaluation pipeline: raw provider output is normalized to a
//! White-relative form, viewed from a chosen side, then formatted or
//! compared for move quality.

pub mod cancel;
pub mod format;
pub mod normalize;
pub mod perspective;
pub mod provider;
pub mod quality;
pub mod raw;
pub mod tablebase;

pub use cancel::CancellationToken;
pub use format::{
    format_evaluation, Classification, FormatMetadata, FormattedEvaluation, FormatterConfig,
    MateNotation, NO_DATA_TEXT,
};
pub use normalize::{negate, normalize_engine, normalize_tablebase, EvaluationSource, NormalizedEvaluation};
pub use perspective::{to_perspective, to_perspective_code, PerspectiveEvaluation};
pub use provider::{EngineProvider, NoTablebase, ProviderError, TablebaseLookup, TablebaseProvider};
pub use quality::{classify_move, MoveQuality, MoveQualityResult};
pub use raw::{RawEngineEvaluation, RawTablebaseResult, TablebaseCategory};
pub use tablebase::{parse_tablebase_response, TablebaseResponse};
