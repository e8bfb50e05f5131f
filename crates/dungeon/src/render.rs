//! Object rendering.
//!
//! [`ObjectRenderEngine`] ties the resolver, the sheet cache and the
//! rasterizer together. Batch renders bucket every sub-tile by source sheet so
//! each sheet is fetched from the cache once per call.
//!
//! Failure policy: calls with no usable input (no objects, empty or oversized
//! palette) fail immediately. Inside a batch, an object that cannot be
//! resolved is logged and skipped, and a sheet that cannot be fetched is drawn
//! as placeholder blocks.

use crate::object::DecodedObject;
use crate::rasterizer::{blit_tile, fill_placeholder};
use crate::resolver::ObjectTileResolver;
use crate::room::Room;
use crate::sheet_cache::{CacheStats, GraphicsSheetCache};
use crate::tile_info::TileInfo;
use crate::{validate_object_id, DungeonError, Result};
use rom_core::gfx::palette::MAX_COLORS;
use rom_core::gfx::{IndexedBitmap, IndexedPalette};
use rom_core::logging::{log, LogCategory, LogLevel};
use serde::Serialize;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Largest canvas edge for batch renders
pub const MAX_CANVAS_SIZE: usize = 2048;

/// Width cap for single-object previews
pub const MAX_PREVIEW_WIDTH: usize = 512;

/// Height of single-object previews
pub const PREVIEW_HEIGHT: usize = 32;

/// Snapshot of render and cache counters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct RenderStats {
    pub objects_rendered: u64,
    pub objects_skipped: u64,
    pub tiles_drawn: u64,
    pub placeholder_tiles: u64,
    pub cache: CacheStats,
}

#[derive(Default)]
struct Counters {
    objects_rendered: AtomicU64,
    objects_skipped: AtomicU64,
    tiles_drawn: AtomicU64,
    placeholder_tiles: AtomicU64,
}

/// One sub-tile placed on the output canvas.
#[derive(Debug, Clone, Copy)]
struct Placement {
    x: usize,
    y: usize,
    tile: TileInfo,
}

pub struct ObjectRenderEngine {
    resolver: ObjectTileResolver,
    cache: Arc<GraphicsSheetCache>,
    counters: Counters,
}

impl ObjectRenderEngine {
    pub fn new(resolver: ObjectTileResolver, cache: Arc<GraphicsSheetCache>) -> Self {
        Self {
            resolver,
            cache,
            counters: Counters::default(),
        }
    }

    pub fn resolver(&self) -> &ObjectTileResolver {
        &self.resolver
    }

    pub fn cache(&self) -> &Arc<GraphicsSheetCache> {
        &self.cache
    }

    pub fn stats(&self) -> RenderStats {
        RenderStats {
            objects_rendered: self.counters.objects_rendered.load(Ordering::Relaxed),
            objects_skipped: self.counters.objects_skipped.load(Ordering::Relaxed),
            tiles_drawn: self.counters.tiles_drawn.load(Ordering::Relaxed),
            placeholder_tiles: self.counters.placeholder_tiles.load(Ordering::Relaxed),
            cache: self.cache.stats(),
        }
    }

    /// Render a single object into a preview strip.
    ///
    /// The preview is a horizontal strip `clamp(tile16_count * 16, 16, 512)`
    /// pixels wide and 32 high. Each metatile gets one 16-pixel column, with
    /// its four sub-tiles filling the top 16x16 cell two per row. Metatiles
    /// are not stacked two per row the way `render_objects` places them in a
    /// room, so a 0- or 1-metatile object still gets a 16-pixel canvas and
    /// long objects are cut at 512 pixels.
    pub fn render_object(
        &self,
        object: &DecodedObject,
        palette: &dyn IndexedPalette,
    ) -> Result<IndexedBitmap> {
        validate_palette(palette)?;
        validate_object_id(object.id())?;

        let tiles = self.tiles_for(object)?;
        if tiles.is_empty() {
            return Err(DungeonError::FailedPrecondition(format!(
                "object {:#05X} resolved no tiles",
                object.id()
            )));
        }

        let tile16_count = tiles.len().div_ceil(4);
        let width = (tile16_count * 16).clamp(16, MAX_PREVIEW_WIDTH);
        let mut bitmap = IndexedBitmap::new(width, PREVIEW_HEIGHT);

        let placements = tiles.iter().enumerate().map(|(i, &tile)| {
            let (metatile, quadrant) = (i / 4, i % 4);
            Placement {
                x: metatile * 16 + (quadrant % 2) * 8,
                y: (quadrant / 2) * 8,
                tile,
            }
        });
        let mut buckets: BTreeMap<usize, Vec<Placement>> = BTreeMap::new();
        for p in placements {
            buckets.entry(p.tile.sheet_index()).or_default().push(p);
        }
        self.draw_buckets(&mut bitmap, &buckets, palette.len());

        self.counters.objects_rendered.fetch_add(1, Ordering::Relaxed);
        Ok(bitmap)
    }

    /// Render many objects onto one canvas.
    ///
    /// With `size` unset the canvas is the smallest power-of-two square per
    /// axis (capped at 2048) that covers every object's 16x16 footprint.
    pub fn render_objects(
        &self,
        objects: &[DecodedObject],
        palette: &dyn IndexedPalette,
        size: Option<(usize, usize)>,
    ) -> Result<IndexedBitmap> {
        if objects.is_empty() {
            return Err(DungeonError::InvalidArgument(
                "no objects to render".to_string(),
            ));
        }
        validate_palette(palette)?;
        let (width, height) = match size {
            Some((w, h)) => {
                if !(1..=MAX_CANVAS_SIZE).contains(&w) || !(1..=MAX_CANVAS_SIZE).contains(&h) {
                    return Err(DungeonError::InvalidArgument(format!(
                        "canvas {}x{} outside 1..={}",
                        w, h, MAX_CANVAS_SIZE
                    )));
                }
                (w, h)
            }
            None => optimal_canvas_size(objects),
        };

        let mut bitmap = IndexedBitmap::new(width, height);
        let mut buckets: BTreeMap<usize, Vec<Placement>> = BTreeMap::new();

        for object in objects {
            let tiles = match validate_object_id(object.id()).and_then(|_| self.tiles_for(object)) {
                Ok(tiles) => tiles,
                Err(err) => {
                    self.counters.objects_skipped.fetch_add(1, Ordering::Relaxed);
                    log(LogCategory::Render, LogLevel::Warn, || {
                        format!(
                            "Skipping object {:#05X} at ({}, {}): {}",
                            object.id(),
                            object.x,
                            object.y,
                            err
                        )
                    });
                    continue;
                }
            };

            let base_x = object.x as usize * 16;
            let base_y = object.y as usize * 16;
            for (i, &tile) in tiles.iter().enumerate() {
                let (metatile, quadrant) = (i / 4, i % 4);
                let placement = Placement {
                    x: base_x + (metatile % 2) * 16 + (quadrant % 2) * 8,
                    y: base_y + (metatile / 2) * 16 + (quadrant / 2) * 8,
                    tile,
                };
                buckets
                    .entry(tile.sheet_index())
                    .or_default()
                    .push(placement);
            }
            self.counters.objects_rendered.fetch_add(1, Ordering::Relaxed);
        }

        log(LogCategory::Render, LogLevel::Debug, || {
            format!(
                "Batch: {} objects, {} sheets, canvas {}x{}",
                objects.len(),
                buckets.len(),
                width,
                height
            )
        });
        self.draw_buckets(&mut bitmap, &buckets, palette.len());
        Ok(bitmap)
    }

    /// Render every object of a room on an automatically sized canvas.
    pub fn render_room(&self, room: &Room, palette: &dyn IndexedPalette) -> Result<IndexedBitmap> {
        self.render_objects(room.objects(), palette, None)
    }

    /// Cached tiles when the object has them, otherwise a fresh resolve.
    fn tiles_for<'a>(&self, object: &'a DecodedObject) -> Result<Cow<'a, [TileInfo]>> {
        match object.tiles() {
            Some(tiles) => Ok(Cow::Borrowed(tiles)),
            None => self
                .resolver
                .resolve_tiles(object.id())
                .map(Cow::Owned),
        }
    }

    fn draw_buckets(
        &self,
        bitmap: &mut IndexedBitmap,
        buckets: &BTreeMap<usize, Vec<Placement>>,
        palette_len: usize,
    ) {
        for (&sheet_index, placements) in buckets {
            match self.cache.get(sheet_index) {
                Ok(sheet) => {
                    for p in placements {
                        blit_tile(bitmap, p.x, p.y, &sheet, &p.tile, palette_len);
                    }
                    self.counters
                        .tiles_drawn
                        .fetch_add(placements.len() as u64, Ordering::Relaxed);
                }
                Err(err) => {
                    log(LogCategory::Render, LogLevel::Warn, || {
                        format!(
                            "Sheet {} unavailable ({}), drawing {} placeholder tile(s)",
                            sheet_index,
                            err,
                            placements.len()
                        )
                    });
                    for p in placements {
                        fill_placeholder(bitmap, p.x, p.y, &p.tile, palette_len);
                    }
                    self.counters
                        .placeholder_tiles
                        .fetch_add(placements.len() as u64, Ordering::Relaxed);
                }
            }
        }
    }
}

fn validate_palette(palette: &dyn IndexedPalette) -> Result<()> {
    if palette.is_empty() || palette.len() > MAX_COLORS {
        return Err(DungeonError::InvalidArgument(format!(
            "palette has {} colours, expected 1..={}",
            palette.len(),
            MAX_COLORS
        )));
    }
    Ok(())
}

/// Power-of-two canvas covering every object's 16x16 footprint.
pub fn optimal_canvas_size(objects: &[DecodedObject]) -> (usize, usize) {
    let (max_x, max_y) = objects.iter().fold((0, 0), |(mx, my), obj| {
        (
            mx.max(obj.x as usize * 16 + 16),
            my.max(obj.y as usize * 16 + 16),
        )
    });
    let fit = |extent: usize| extent.max(1).next_power_of_two().min(MAX_CANVAS_SIZE);
    (fit(max_x), fit(max_y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::RomLayout;
    use crate::sheet_cache::GraphicsSheetSource;
    use rom_core::gfx::Palette;
    use rom_core::{RomImage, RomSource};

    /// Sheets 0..2 exist; every pixel of sheet `n` is `n + 1`.
    struct FlatSheets;

    impl GraphicsSheetSource for FlatSheets {
        fn sheet(&self, index: usize) -> Option<IndexedBitmap> {
            if index >= 2 {
                return None;
            }
            let mut bmp = IndexedBitmap::new(128, 128);
            bmp.fill(index as u8 + 1);
            Some(bmp)
        }
    }

    /// ROM where subtype-1 id 0x00 (4 tiles) points at tiles 0..3 of sheet 0
    /// and id 0x07 (4 tiles) points at sheet-3 tiles (0x300..). Id 0x21
    /// (9 tiles) has eight sheet-0 tiles followed by one sheet-1 tile.
    fn engine() -> ObjectRenderEngine {
        let mut data = vec![0u8; 0x10000];
        let layout = RomLayout::default();
        let put_run = |data: &mut Vec<u8>, id: usize, offset: i16, words: &[u16]| {
            let ptr = layout.subtype1_table + id * 2;
            data[ptr..ptr + 2].copy_from_slice(&offset.to_le_bytes());
            let base = (layout.tile_data_base as i64 + offset as i64) as usize;
            for (i, w) in words.iter().enumerate() {
                data[base + i * 2..base + i * 2 + 2].copy_from_slice(&w.to_le_bytes());
            }
        };
        put_run(&mut data, 0x00, 0x100, &[0, 1, 2, 3]);
        put_run(&mut data, 0x07, 0x200, &[0x300, 0x301, 0x302, 0x303]);
        put_run(&mut data, 0x21, 0x300, &[0, 1, 2, 3, 4, 5, 6, 7, 0x100]);

        let rom: Arc<dyn RomSource> = Arc::new(RomImage::from_raw(data));
        let cache = Arc::new(GraphicsSheetCache::new(Arc::new(FlatSheets), 8));
        ObjectRenderEngine::new(ObjectTileResolver::new(rom, layout), cache)
    }

    #[test]
    fn test_render_object_dimensions() {
        let engine = engine();
        let palette = Palette::greyscale(16);
        let bmp = engine
            .render_object(&DecodedObject::new(0x00, 0, 0, 0, 0), &palette)
            .unwrap();
        assert_eq!((bmp.width(), bmp.height()), (16, 32));
        assert_eq!(bmp.get(0, 0), Some(1));
        assert_eq!(bmp.get(15, 15), Some(1));
        assert_eq!(bmp.get(0, 16), Some(0));
    }

    #[test]
    fn test_render_object_strip_layout() {
        let engine = engine();
        let palette = Palette::greyscale(16);
        let bmp = engine
            .render_object(&DecodedObject::new(0x21, 0, 0, 0, 0), &palette)
            .unwrap();
        // Three metatiles side by side, the last one partial
        assert_eq!((bmp.width(), bmp.height()), (48, 32));
        assert_eq!(bmp.get(16, 0), Some(1));
        assert_eq!(bmp.get(31, 15), Some(1));
        assert_eq!(bmp.get(32, 0), Some(2));
        assert_eq!(bmp.get(40, 0), Some(0));
        // Nothing wraps into the second 16-pixel row
        assert_eq!(bmp.get(0, 16), Some(0));
        assert_eq!(bmp.get(16, 16), Some(0));
    }

    #[test]
    fn test_render_object_validation() {
        let engine = engine();
        let obj = DecodedObject::new(0x00, 0, 0, 0, 0);
        assert!(matches!(
            engine.render_object(&obj, &Palette::default()),
            Err(DungeonError::InvalidArgument(_))
        ));
        assert!(matches!(
            engine.render_object(&obj, &Palette::new(257)),
            Err(DungeonError::InvalidArgument(_))
        ));
        assert!(matches!(
            engine.render_object(&DecodedObject::new(0x500, 0, 0, 0, 0), &Palette::new(4)),
            Err(DungeonError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_render_objects_rejects_empty() {
        let engine = engine();
        assert!(matches!(
            engine.render_objects(&[], &Palette::new(4), None),
            Err(DungeonError::InvalidArgument(_))
        ));
        let objs = [DecodedObject::new(0, 0, 0, 0, 0)];
        assert!(engine.render_objects(&objs, &Palette::default(), None).is_err());
        assert!(engine.render_objects(&objs, &Palette::new(4), Some((0, 16))).is_err());
        assert!(engine.render_objects(&objs, &Palette::new(4), Some((16, 4096))).is_err());
    }

    #[test]
    fn test_optimal_canvas_size() {
        let objs = [
            DecodedObject::new(0, 3, 0, 0, 0),
            DecodedObject::new(0, 0, 20, 0, 0),
        ];
        // x: 3*16+16 = 64; y: 20*16+16 = 336 -> 512
        assert_eq!(optimal_canvas_size(&objs), (64, 512));

        let far = [DecodedObject::new(0, 255, 255, 0, 0)];
        assert_eq!(optimal_canvas_size(&far), (2048, 2048));
    }

    #[test]
    fn test_missing_sheet_uses_placeholder() {
        let engine = engine();
        let palette = Palette::greyscale(16);
        // id 0x07 draws from sheet 3, which the source does not have
        let objs = [DecodedObject::new(0x07, 1, 1, 0, 0)];
        let bmp = engine.render_objects(&objs, &palette, None).unwrap();
        assert_eq!((bmp.width(), bmp.height()), (32, 32));
        // Tile 0x300 -> (0 % 16) + 1
        assert_eq!(bmp.get(16, 16), Some(1));
        // Tile 0x303 -> 4, bottom-right quadrant
        assert_eq!(bmp.get(24, 24), Some(4));

        let stats = engine.stats();
        assert_eq!(stats.placeholder_tiles, 4);
        assert_eq!(stats.tiles_drawn, 0);
    }

    #[test]
    fn test_batch_skips_bad_objects() {
        let engine = engine();
        let palette = Palette::greyscale(16);
        let objs = [
            DecodedObject::new(-3, 0, 0, 0, 0),
            DecodedObject::new(0x00, 0, 0, 0, 0),
        ];
        let bmp = engine.render_objects(&objs, &palette, Some((32, 32))).unwrap();
        assert_eq!(bmp.get(0, 0), Some(1));
        let stats = engine.stats();
        assert_eq!(stats.objects_rendered, 1);
        assert_eq!(stats.objects_skipped, 1);
    }

    #[test]
    fn test_render_is_deterministic() {
        let engine = engine();
        let palette = Palette::greyscale(16);
        let objs = [
            DecodedObject::new(0x00, 2, 3, 0, 0),
            DecodedObject::new(0x07, 0, 0, 0, 1),
        ];
        let first = engine.render_objects(&objs, &palette, None).unwrap();
        let resident = engine.cache().resident();
        let second = engine.render_objects(&objs, &palette, None).unwrap();
        assert_eq!(first, second);
        assert_eq!(engine.cache().resident(), resident);
    }

    #[test]
    fn test_uses_cached_object_tiles() {
        let engine = engine();
        let mut obj = DecodedObject::new(0x00, 0, 0, 0, 0);
        obj.ensure_tiles(engine.resolver()).unwrap();
        assert_eq!(obj.tiles().map(|t| t.len()), Some(4));
        let bmp = engine.render_object(&obj, &Palette::greyscale(4)).unwrap();
        assert_eq!(bmp.get(8, 8), Some(1));
    }
}
