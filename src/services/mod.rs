//! Services layer - Business logic
//!
//! Services validate input, coordinate repositories, media files and the
//! detail cache, and report failures as [`ServiceError`].

pub mod agriculture;
pub mod contact;
pub mod content_item;
pub mod cooperative;
pub mod error;
pub mod feedback;
pub mod mailer;
pub mod media;
pub mod news;
pub mod partner;
pub mod password;
pub mod personnel;
pub mod recruitment;
pub mod tag;
pub mod token;
pub mod user;
pub mod year;

pub use agriculture::AgricultureService;
pub use contact::ContactService;
pub use content_item::ContentItems;
pub use cooperative::CooperativeService;
pub use error::ServiceError;
pub use feedback::FeedbackService;
pub use mailer::{build_mailer, Attachment, LogMailer, Mail, Mailer, SmtpMailer};
pub use media::{MediaFolder, MediaKind, MediaStore, UploadedFile};
pub use news::{NewsPosters, NewsService};
pub use partner::PartnerService;
pub use password::{generate_secret, hash_password, verify_password};
pub use personnel::PersonnelService;
pub use recruitment::RecruitmentService;
pub use tag::TagService;
pub use token::{AccessClaims, RefreshClaims, TokenPair, TokenService};
pub use user::UserService;
pub use year::YearService;
