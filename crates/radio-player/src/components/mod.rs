pub mod add_station_form;
pub mod header;
pub mod spectrum;
pub mod station_list;
pub mod volume_bar;
