pub mod engine;
pub mod priority;
pub mod rates;

pub use engine::{
    classify_effort, compute_estimated_cost, CreateQuoteRequest, EstimationCatalog,
    EstimationOutcome, QuoteAdjustments, QuoteEngine,
};
pub use priority::{
    suggest_priority, DeterministicPriorityAdvisor, PriorityAdvisor, PrioritySuggestion,
};
pub use rates::{resolve_rate, DeterministicRateResolver, RateQuery, RateResolver};
