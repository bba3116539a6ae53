pub mod connect_form;
pub mod log_view;
pub mod script_picker;
