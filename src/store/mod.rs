//! The store (C1): a single `SqlitePool` behind a typed, hand-written query
//! layer, split by aggregate root the way the teacher splits `db/*.rs`.

mod articles;
mod core;
mod feeds;
mod jobs;
mod schema;
mod stories;
pub mod types;

pub use core::Store;
pub use stories::{MemberArticle, NewStory};
pub use types::{
    Article, ArticleFilter, Feed, JobStatus, ScheduledJob, Story, StoryArticle, StoryFilter,
    StoryOrderBy, StoryStatusFilter,
};
