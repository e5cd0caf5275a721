// Re-export all models from their respective modules
pub mod api;
pub mod auth;
pub mod experiment;
pub mod forms;
pub mod project;
pub mod reference;
pub mod user;

// Re-export commonly used models
pub use api::*;
pub use auth::*;
pub use experiment::*;
pub use forms::*;
pub use project::*;
pub use reference::*;
pub use user::*;
