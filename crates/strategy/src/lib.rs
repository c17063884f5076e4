pub mod normalize;
pub mod planner;
pub mod scorer;

pub use normalize::normalize;
pub use planner::{plan, Plan};
pub use scorer::{rank_order, score_pools};
