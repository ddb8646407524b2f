pub mod cache;
pub mod catalog;
pub mod channel;
pub mod config;
pub mod errors;
pub mod fetcher;
pub mod lazy;
pub mod parser;
pub mod prober;
pub mod proxy;

pub use channel::{
    Channel, ChannelGroup, ChannelKind, ChannelStatus, OrganizationMode, OrganizedChannels,
    Quality,
};
pub use errors::{FetchError, GroupLoadError, LoadingStage, LoadingState};
