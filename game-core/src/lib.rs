pub mod conundrum;
pub mod letter_pool;
pub mod match_history;
pub mod match_state;
pub mod pick_constraints;
pub mod rating;
pub mod word_validation;

// Re-export main components
pub use conundrum::*;
pub use letter_pool::*;
pub use match_history::*;
pub use match_state::*;
pub use pick_constraints::*;
pub use rating::*;
pub use word_validation::*;
