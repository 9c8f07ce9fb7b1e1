pub mod ai;
pub mod feedback;
pub mod interview;
pub mod progress;
pub mod question_bank;
