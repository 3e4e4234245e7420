//! 调研管线 - 查询生成、检索扇出、章节合成与报告编译

pub mod compiler;
pub mod context;
pub mod curator;
pub mod orchestrator;
pub mod query_generator;
pub mod search_fanout;
pub mod synthesizer;
pub mod types;
pub mod workflow;

#[cfg(test)]
pub(crate) mod test_support;
