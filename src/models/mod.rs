//! Domain types shared by the analyzer, persistence layer and HTTP surface.
//!
//! Wire names are camelCase (the client is a browser app); database column
//! names are snake_case and map through `sqlx::FromRow` field names.

pub mod analysis;
pub mod category;
pub mod mail_item;
pub mod settings;
pub mod user;

pub use analysis::AnalysisResult;
pub use category::Category;
pub use mail_item::{MailItem, MailItemPatch, NewMailItem};
pub use settings::{SettingsPatch, SmtpOverride, UserSettings};
pub use user::{AuthProvider, User};
