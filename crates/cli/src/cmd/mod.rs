pub mod add;
pub mod output;
pub mod plan;
pub mod query;
pub mod reindex;
pub mod resolve;
pub mod session;
pub mod trait_set;
