//! Icon composition and encoding across models.

use deckhand::device::{ImageFormat, Model};
use deckhand::icon::{ComposeFlags, Icon, IconRenderer, Rgba};
use deckhand::persistence::MemoryStore;
use image::{Rgba as Pixel, RgbaImage};
use tempfile::TempDir;

use crate::common::open_deck;

fn renderer(model: Model, dirs: Vec<std::path::PathBuf>) -> IconRenderer {
    IconRenderer::new(model.icon_layout().unwrap(), dirs)
}

fn write_png(dir: &TempDir, name: &str, size: u32, color: [u8; 4]) -> std::path::PathBuf {
    let path = dir.path().join(name);
    RgbaImage::from_pixel(size, size, Pixel(color)).save(&path).unwrap();
    path
}

#[test]
fn test_large_picture_is_fitted_to_the_key() {
    let dir = TempDir::new().unwrap();
    let file = write_png(&dir, "big.png", 200, [255, 0, 0, 255]);
    let icon = Icon {
        file: Some(file),
        ..Icon::default()
    };

    let raster = renderer(Model::Mk2, Vec::new())
        .compose(Some(&icon), None, ComposeFlags { ignore_transforms: true })
        .unwrap();

    assert_eq!(raster.dimensions(), (72, 72));
    assert_eq!(raster.get_pixel(0, 0).0, [255, 0, 0, 255]);
    assert_eq!(raster.get_pixel(71, 71).0, [255, 0, 0, 255]);
}

#[test]
fn test_named_icon_resolved_from_icon_dirs() {
    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();
    write_png(&second, "logo.png", 20, [0, 0, 255, 255]);

    let renderer = renderer(
        Model::Xl,
        vec![first.path().to_path_buf(), second.path().to_path_buf()],
    );
    assert_eq!(renderer.resolve_icon_name("logo"), Some(second.path().join("logo.png")));

    let raster = renderer
        .compose(Some(&Icon::named("logo")), None, ComposeFlags { ignore_transforms: true })
        .unwrap();
    // 20x20 picture centered on a 96x96 black key
    assert_eq!(raster.get_pixel(48, 48).0, [0, 0, 255, 255]);
    assert_eq!(raster.get_pixel(2, 2).0, [0, 0, 0, 255]);
}

#[test]
fn test_missing_file_paints_background_only() {
    let icon = Icon {
        file: Some("/nonexistent/picture.png".into()),
        ..Icon::default()
    }
    .with_background(Rgba::opaque(10, 20, 30));

    let raster = renderer(Model::Plus, Vec::new())
        .compose(Some(&icon), None, ComposeFlags::default())
        .unwrap();
    assert!(raster.pixels().all(|p| p.0 == [10, 20, 30, 255]));
}

#[test]
fn test_plus_keys_are_not_transformed() {
    let icon = Icon::default()
        .with_background(Rgba::opaque(200, 200, 200))
        .with_text("Mic");
    let renderer = renderer(Model::Plus, Vec::new());

    let oriented = renderer.compose(Some(&icon), None, ComposeFlags::default()).unwrap();
    let plain = renderer
        .compose(Some(&icon), None, ComposeFlags { ignore_transforms: true })
        .unwrap();
    assert_eq!(oriented, plain);
}

#[test]
fn test_original_renders_exact_bitmap() {
    let renderer = renderer(Model::Original, Vec::new());
    assert_eq!(renderer.layout().format, ImageFormat::Bmp);

    let data = renderer.render(Some(&Icon::default().with_text("Hi")), None).unwrap();
    assert_eq!(data.len(), Model::Original.icon_layout().unwrap().bmp_size());
    assert_eq!(&data[..2], b"BM");
}

#[test]
fn test_custom_icon_pushes_only_that_key() {
    let store = MemoryStore::new();
    let (mut deck, mock) = open_deck(Model::Mk2, &store);
    mock.clear_operations();

    let icon = Icon::default()
        .with_background(Rgba::opaque(0, 128, 0))
        .with_text("REC");
    deck.set_custom_icon(7, Some(icon.clone())).unwrap();

    let writes = mock.writes();
    assert!(!writes.is_empty());
    assert!(writes.iter().all(|w| w[..3] == [0x02, 0x07, 7]));
    // JPEG start of image marker right after the header
    assert_eq!(writes[0][8..10], [0xff, 0xd8]);
    assert_eq!(deck.custom_icon(7), Some(&icon));
    assert!(deck.has_pending_save());
}
