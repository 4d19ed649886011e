pub mod reputation;
pub mod signal;

pub use reputation::{
    IpReputationDetails, ReputationClient, ReputationLookup, ReputationOutcome, ReputationSummary,
};
pub use signal::{extract, Signal};
