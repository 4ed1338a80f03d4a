//! Security descriptors and the access evaluation over them.

mod mask;
mod ace;
mod descriptor;
mod encode;
mod evaluator;
mod api;

pub use mask::{AccessMask, AccessRequest};
pub use ace::{Ace, AceFlags, AceKind};
pub use descriptor::{DescriptorControl, SecurityDescriptor, DEFAULT_MAX_ENTRIES};
pub use encode::DescriptorBuilder;
pub use evaluator::{evaluate, evaluate_detailed, Evaluation};
pub use api::{AccessChecker, AccessDecision};
