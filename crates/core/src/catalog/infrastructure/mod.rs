pub mod in_memory_result_store;
pub mod json_result_store;
