pub mod alert;
pub mod level_bar;
pub mod pane_chrome;
pub mod scrollable_list;
pub mod status_bar;
pub mod text_field;
pub mod toast;
