pub mod adaptive;
pub mod ensemble;
pub mod parallel;
pub mod sequential;
pub mod single;

pub use adaptive::AdaptiveStrategy;
pub use ensemble::EnsembleStrategy;
pub use parallel::ParallelStrategy;
pub use sequential::SequentialStrategy;
pub use single::SingleStrategy;
