pub mod extract;
pub mod feed;
pub mod normalize;
pub mod schema;
pub mod translations;
