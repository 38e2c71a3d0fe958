mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from screenflow for tests
pub use screenflow::{
    FileDocumentSource, FlowSession, ImageLoad, ImageLoader, ImagePreloader, LoadOutcome,
    Navigation, ScreenFlowRuntime, ScreenRoute,
};
