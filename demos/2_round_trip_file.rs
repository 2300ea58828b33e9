extern crate png_lite;
use png_lite::prelude::*;

/// Write an rgba image with a few different settings, read each file back,
/// and check that no pixel was changed.
fn main() {
    let image = ImageBuffer::from_fn(256, 256, 4, |x, y, pixel| {
        let distance = ((x as i32 - 128).pow(2) + (y as i32 - 128).pow(2)) as f32;
        let alpha = if distance < 100.0 * 100.0 { 255 } else { 0 };
        pixel.copy_from_slice(&[x as u8, y as u8, (distance.sqrt() as u32).min(255) as u8, alpha]);
    }).unwrap();

    let settings = [
        ("fast", WriteOptions::fast()),
        ("default", WriteOptions::default()),
        ("small", WriteOptions::small()),
        ("paeth", WriteOptions::default().with_filter(FilterPolicy::Fixed(FilterType::Paeth))),
    ];

    for (name, options) in settings.iter() {
        let path = format!("round_trip_{}.png", name);
        image.write_to_file(&path, *options).unwrap();

        let read = ImageBuffer::read_from_file(&path, ReadOptions::pedantic()).unwrap();
        assert_eq!(read, image, "pixels changed with the {} settings", name);

        let file_size = std::fs::metadata(&path).unwrap().len();
        println!("{}: {} bytes, pixels are identical", path, file_size);
    }
}
