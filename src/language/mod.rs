pub mod classifier;
pub mod filter;
pub mod words;

pub use classifier::{ClassifierError, LanguageClassifier, LanguageScore, WhatlangClassifier};
pub use filter::{LanguageDecision, LanguageFilter, Thresholds, decide, evaluate};
pub use words::{DEFAULT_WORD_PATTERN, WordPattern};
