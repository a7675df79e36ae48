pub mod compose;
pub mod normalize;

pub use compose::{DraftFormat, effective_subject, reply_subject};
pub use normalize::excerpt;
