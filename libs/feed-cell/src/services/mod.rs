pub mod comments;
pub mod likes;
pub mod posts;
pub mod tags;
pub mod videos;

pub use comments::CommentService;
pub use likes::LikeService;
pub use posts::PostService;
pub use tags::TagService;
pub use videos::VideoService;
