pub mod elasticsearch;
pub mod openweather;
pub mod wikipedia;
