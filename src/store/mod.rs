pub mod cache;
pub mod feed;
pub mod remote;
pub mod repository;

pub use cache::{CacheError, LocalCache};
pub use feed::{ChangeEvent, RemoteFeed, Subscription};
pub use remote::{MemoryRemote, Remote, RemoteError, RemoteStore, SupabaseStore};
pub use repository::{RepoError, SaveOutcome, TaskRepository};
