pub mod config;
pub mod estimate;
pub mod judgment;
pub mod report;
pub mod request;
pub mod trade;

pub use config::{AgentsConfig, NoroConfig, SizingConfig};
pub use estimate::{clamp_unit, Estimate};
pub use judgment::{AgreementLevel, ConsensusMethod, Judgment};
pub use report::{Degradation, MarketReport, ReportSummary};
pub use request::MarketRequest;
pub use trade::{SizingPolicy, TradeAction, TradeProposal};
