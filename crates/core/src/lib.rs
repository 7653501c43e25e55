pub mod imagery;
pub mod types;

pub use imagery::{
    image_date_from_millis, tile_url_template, ImageDateError, ImageSelection,
    EARTH_ENGINE_ATTRIBUTION, SENTINEL2_COLLECTION, WORLD_BBOX,
};
pub use types::{ErrorEnvelope, ImageDateEnvelope, TileParameters, TilesEnvelope};
