//! Database repositories
//!
//! One repository per entity. Each exposes a trait used by the services and
//! an sqlx implementation that runs against SQLite or MySQL.

pub mod agriculture;
pub mod contact;
pub mod content_item;
pub mod cooperative;
pub mod feedback;
pub mod news;
pub mod one_time_token;
pub mod partner;
pub mod personnel;
pub mod tag;
pub mod user;
pub mod year;

pub use agriculture::{AgricultureRepository, SqlxAgricultureRepository};
pub use contact::{ContactRepository, SqlxContactRepository};
pub use content_item::{ContentItemRepository, ItemTable, SqlxContentItemRepository};
pub use cooperative::{CooperativeRepository, SqlxCooperativeRepository};
pub use feedback::{FeedbackRepository, SqlxFeedbackRepository};
pub use news::{NewsRepository, SqlxNewsRepository};
pub use one_time_token::{OneTimeTokenRepository, SqlxOneTimeTokenRepository};
pub use partner::{PartnerRepository, SqlxPartnerRepository};
pub use personnel::{PersonnelRepository, SqlxPersonnelRepository};
pub use tag::{SqlxTagRepository, TagRepository};
pub use user::{SqlxUserRepository, UserRepository};
pub use year::{SqlxYearRepository, YearRepository};
