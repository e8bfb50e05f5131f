use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rom_core::gfx::{decode_sheet, IndexedBitmap, Palette, TileFormat};
use rom_core::logging::{LogConfig, LogLevel};
use rom_core::{RomImage, RomSource};
use rom_dungeon::{
    GraphicsSheetCache, ObjectRenderEngine, ObjectTileResolver, ParserConfig, RomLayout, Room,
};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Bytes per 256-tile 3bpp sheet in a raw graphics dump
const SHEET_BYTES: usize = 256 * 24;

#[derive(Parser)]
#[command(name = "dungeon-inspect", about = "Inspect dungeon room objects in a ROM image")]
struct Args {
    /// JSON file overriding ROM layout addresses
    #[arg(long, global = true)]
    layout: Option<PathBuf>,

    /// Core log level: off, error, warn, info, debug, trace
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Parser iteration budget
    #[arg(long, global = true, default_value_t = ParserConfig::default().max_iterations)]
    max_iterations: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print a room's header, objects and doors as JSON
    Objects {
        rom: PathBuf,
        room: u16,
        /// Staircase destination rooms, comma separated
        #[arg(long, value_delimiter = ',')]
        stairs: Vec<u8>,
    },
    /// Print an object's subtype descriptor and resolved tiles as JSON
    Tiles {
        rom: PathBuf,
        /// Object id, decimal or 0x-prefixed hex
        #[arg(value_parser = parse_object_id)]
        id: i16,
    },
    /// Render a room to PNG
    Render {
        rom: PathBuf,
        room: u16,
        /// Raw 3bpp graphics dump, 256 tiles per sheet
        #[arg(long)]
        sheets: PathBuf,
        /// Output PNG
        #[arg(long, default_value = "room.png")]
        out: PathBuf,
        /// CGRAM dump (little-endian BGR555 words); greyscale when omitted
        #[arg(long)]
        cgram: Option<PathBuf>,
        #[arg(long, value_delimiter = ',')]
        stairs: Vec<u8>,
    },
}

fn parse_object_id(s: &str) -> Result<i16, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => i16::from_str_radix(hex, 16),
        None => s.parse::<i16>(),
    };
    parsed.map_err(|e| format!("invalid object id '{}': {}", s, e))
}

#[derive(Serialize)]
struct TilesReport<'a> {
    id: String,
    descriptor: rom_dungeon::SubtypeDescriptor,
    tiles: &'a [rom_dungeon::TileInfo],
}

fn load_rom(path: &Path) -> Result<Arc<dyn RomSource>> {
    let rom = RomImage::load(path).with_context(|| format!("loading ROM {}", path.display()))?;
    log::info!("ROM {}: {} bytes", path.display(), rom.size());
    Ok(Arc::new(rom))
}

fn load_sheets(path: &Path) -> Result<Vec<IndexedBitmap>> {
    let raw = std::fs::read(path).with_context(|| format!("reading sheets {}", path.display()))?;
    let sheets: Vec<IndexedBitmap> = raw
        .chunks(SHEET_BYTES)
        .map(|chunk| decode_sheet(chunk, TileFormat::Snes3Bpp))
        .collect();
    log::info!("Decoded {} sheet(s) from {}", sheets.len(), path.display());
    Ok(sheets)
}

fn load_palette(cgram: Option<&Path>) -> Result<Palette> {
    let Some(path) = cgram else {
        return Ok(Palette::greyscale(8));
    };
    let raw = std::fs::read(path).with_context(|| format!("reading CGRAM {}", path.display()))?;
    let words: Vec<u16> = raw
        .chunks_exact(2)
        .take(256)
        .map(|w| u16::from_le_bytes([w[0], w[1]]))
        .collect();
    if words.is_empty() {
        anyhow::bail!("CGRAM dump {} holds no colours", path.display());
    }
    Ok(Palette::from_bgr555(&words))
}

fn write_png(path: &Path, bitmap: &IndexedBitmap, palette: &Palette) -> Result<()> {
    let frame = bitmap.to_frame(palette);
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut encoder = png::Encoder::new(BufWriter::new(file), frame.width, frame.height);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(&frame.to_rgba_bytes())?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let level = LogLevel::from_str(&args.log_level)
        .with_context(|| format!("unknown log level '{}'", args.log_level))?;
    LogConfig::global().set_global_level(level);

    let layout = match &args.layout {
        Some(path) => RomLayout::from_json_file(path)?,
        None => RomLayout::default(),
    };
    let parser_config = ParserConfig {
        max_iterations: args.max_iterations,
    };

    match args.command {
        Command::Objects { rom, room, stairs } => {
            let rom = load_rom(&rom)?;
            let room = Room::load(rom.as_ref(), &layout, &parser_config, room, &stairs)?;
            println!("{}", serde_json::to_string_pretty(&room)?);
        }
        Command::Tiles { rom, id } => {
            let rom = load_rom(&rom)?;
            let resolver = ObjectTileResolver::new(rom, layout);
            let descriptor = resolver.descriptor(id)?;
            let tiles = resolver.resolve_tiles(id)?;
            let report = TilesReport {
                id: format!("{:#05X}", id),
                descriptor,
                tiles: &tiles,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Render {
            rom,
            room,
            sheets,
            out,
            cgram,
            stairs,
        } => {
            let rom = load_rom(&rom)?;
            let room = Room::load(rom.as_ref(), &layout, &parser_config, room, &stairs)?;
            let palette = load_palette(cgram.as_deref())?;
            let cache = Arc::new(GraphicsSheetCache::with_default_capacity(Arc::new(
                load_sheets(&sheets)?,
            )));
            let engine = ObjectRenderEngine::new(ObjectTileResolver::new(rom, layout), cache);

            let bitmap = engine.render_room(&room, &palette)?;
            write_png(&out, &bitmap, &palette)?;

            let stats = engine.stats();
            println!(
                "Room {}: {} objects drawn, {} skipped, {}x{} -> {}",
                room.id,
                stats.objects_rendered,
                stats.objects_skipped,
                bitmap.width(),
                bitmap.height(),
                out.display()
            );
            log::info!("Render stats: {}", serde_json::to_string(&stats)?);
        }
    }

    Ok(())
}
