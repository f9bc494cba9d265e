//! # services
//!
//! Business logic over the `domains` ports. Three services:
//!
//! - [`feed::FeedService`] — the query composer: four feed views plus
//!   the post detail view, all ordered and paginated the same way.
//! - [`publish::PublishService`] — post creation and owner-only edits.
//! - [`engage::EngageService`] — comments and follow edges.
//!
//! Nothing here knows about HTTP, templates, SQL or Redis.

pub mod engage;
pub mod feed;
pub mod publish;

pub use engage::EngageService;
pub use feed::FeedService;
pub use publish::{ImageUpload, PostDraft, PublishService};
