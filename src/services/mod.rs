// ReviewSense Core Services

pub mod text_processor;
pub mod config_store;
pub mod providers;
pub mod clause_segmenter;
pub mod detection;

pub use text_processor::*;
pub use config_store::*;
pub use providers::*;
pub use clause_segmenter::ClauseSegmenter;

pub use detection::{
    aggregate,
    AnalysisError,
    AspectTagger,
    EntailmentClassifier,
    LexiconValenceClassifier,
    NeutralEntailmentClassifier,
    ResultAdjuster,
    SarcasmDetector,
    SentimentAnalyzer,
    ValenceClassifier,
};
