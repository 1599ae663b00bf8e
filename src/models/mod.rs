//! Data models
//!
//! Database entities of the site (news, agriculture, their content items,
//! tags, personnel, partners, cooperatives, feedback, contacts, timeline years
//! and users) plus the request types of their write endpoints and the
//! recruitment form. All JSON is camelCase.

mod agriculture;
mod contact;
mod content_item;
mod cooperative;
mod feedback;
mod news;
mod pagination;
mod partner;
mod personnel;
mod recruitment;
mod tag;
mod token;
mod user;
mod year;

pub use agriculture::{Agriculture, AgricultureDetail, AgricultureInput, UpdateAgricultureInput};
pub use contact::{Contact, ContactInput};
pub use content_item::{AgricultureItem, ContentItem, ItemInput, NewsItem, UpdateItemInput};
pub use cooperative::{Cooperative, CooperativeInput, UpdateCooperativeInput};
pub use feedback::{Feedback, FeedbackInput, UpdateFeedbackInput};
pub use news::{News, NewsDetail, NewsInput, UpdateNewsInput};
pub use pagination::{ListParams, PagedResult};
pub use partner::{Partner, PartnerInput, UpdatePartnerInput};
pub use personnel::{Personnel, PersonnelInput, UpdatePersonnelInput};
pub use recruitment::RecruitmentInput;
pub use tag::{Tag, TagInput};
pub use token::{OneTimeToken, TokenPurpose};
pub use user::{ChangePasswordInput, LoginInput, RegisterInput, ResetPasswordInput, User, UserRole};
pub use year::{UpdateYearInput, Year, YearInput};
