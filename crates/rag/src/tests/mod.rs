//! End-to-end pipeline scenarios.

pub(crate) mod support;

mod retrieval_pipeline;
