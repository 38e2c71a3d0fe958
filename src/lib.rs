pub mod config;
pub mod derive;
pub mod model;
pub mod preloader;
pub mod route;
pub mod runtime;
pub mod session;
pub mod source;
pub mod store;

pub use config::{Config, ConfigError, SourceLocation};
pub use derive::FlowTreeIndex;
pub use model::{
    FlowDocument, FlowTree, FlowTreeNode, Hotspot, LinkHint, NodeRef, Project,
    ProjectOrientation, Screen, ScreenId,
};
pub use preloader::{HttpImageLoader, ImageLoad, ImageLoader, ImagePreloader, PreloadSettings};
pub use route::{Navigation, ScreenRoute};
pub use runtime::{FlowState, LoadOutcome, ScreenFlowRuntime};
pub use session::FlowSession;
pub use source::{DocumentSource, FileDocumentSource, HttpDocumentSource, SourceError};
pub use store::{Store, Subscription};
