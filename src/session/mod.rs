//! Viewer and annotator state for opened documents

pub mod annotations;
pub mod store;
pub mod viewer;

pub use annotations::{Annotation, AnnotationLayer};
pub use store::{DocumentSession, SessionStore};
pub use viewer::Viewer;
