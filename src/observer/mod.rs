// Rule pipeline that validates patched entity snapshots ring by ring

pub mod context;
pub mod pipeline;
pub mod rules;
pub mod traits;

pub use context::RuleContext;
pub use pipeline::{Checked, RulePipeline};
pub use rules::{AcyclicParent, ForeignKey, NotNumericKey, Required, TenantBinding, Unique};
pub use traits::{Rule, RuleRing};
