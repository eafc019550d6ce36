pub mod approval;
pub mod lookup;
pub mod pricing;
pub mod quote;
pub mod sla;
pub mod ticket;
