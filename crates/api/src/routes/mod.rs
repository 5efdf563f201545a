mod images;
mod listings;
mod misc;
mod payments;

pub use images::image_routes;
pub use listings::listing_routes;
pub use misc::misc_routes;
pub use payments::payment_routes;
