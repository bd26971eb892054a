//! Entry points a rendering shell calls. Each takes the shared
//! [`crate::AppState`] and returns serializable data or an [`crate::AppError`].

pub mod dashboard;
pub mod predictions;
pub mod selection;
pub mod settings;
