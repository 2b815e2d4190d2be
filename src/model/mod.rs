//! Domain model: quests, targets, payloads, geography, tiles.

mod geo;
mod quest;
mod tile;

pub use geo::{BoundingBox, LatLon};
pub use quest::{
    Element, ElementKind, ElementRef, NoteId, NoteRequest, Quest, QuestBody, QuestGroup, QuestId,
    QuestStatus, QuestTypeId, TagChanges, TagEdit,
};
pub use tile::{DEFAULT_TILE_ZOOM, Tile, TileRect, enclosing_tiles, tile_at};
