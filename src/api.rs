pub mod feed;
pub mod snapshot;

pub use self::{
    feed::{PriceFeed, SwitchFeed},
    snapshot::{Snapshot, SnapshotFile},
};
