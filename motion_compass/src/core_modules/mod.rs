pub mod contours;
pub mod direction;
pub mod filters;
pub mod region;
