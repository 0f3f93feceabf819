pub mod log_view;
pub mod pipeline_view;
