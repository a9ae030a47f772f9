pub mod app;
pub mod panels;
pub mod state;

pub use app::BrainTumorApp;
pub use state::{AppState, ClassifiedUpload, UploadState};
