pub mod gradient;
pub mod histogram;
pub mod result_cache;
pub mod sampler;
pub mod selector;
