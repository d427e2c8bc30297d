//! Classification result types

mod result;

pub use result::{Classification, ConfidenceLevel, LabelValue, UNDEFINED_LABEL_VALUE};
