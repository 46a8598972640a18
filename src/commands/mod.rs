pub mod ask;

pub use ask::run_interactive;
