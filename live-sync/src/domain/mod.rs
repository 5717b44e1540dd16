mod consistency;
mod events;
mod mount;
mod sync_status;
mod topic;
mod traits;
mod window;

pub use consistency::{ConsistencyMode, Stamp, WriteOutcome};
pub use events::{Credential, SessionEvent, SubscriptionHandle};
pub use mount::MountToken;
pub use sync_status::ViewPhase;
pub use topic::{Topic, TopicKind};
pub use traits::{
    AlarmStatusUpdater, ChannelError, Connector, FetchError, FrameSink, OrderReader, PageFetcher,
    ProductRepository, Session, UserRepository,
};
pub use window::{LiveSlot, PagedWindow};
