pub mod resolver;
pub mod ytdlp;

pub use resolver::{AudioResolveError, AudioResolver};
pub use ytdlp::YtDlpSource;
