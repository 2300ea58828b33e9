extern crate png_lite;
use png_lite::prelude::*;
use std::time::Instant;

/// Print the file size and encoding time of each filter and compression combination.
fn main() {
    let image = ImageBuffer::from_fn(640, 480, 3, |x, y, pixel| {
        let wave = ((x as f32 / 23.0).sin() * (y as f32 / 17.0).cos() * 60.0) as i32;
        pixel.copy_from_slice(&[
            (x / 3) as u8,
            (y as i32 / 2 + wave).max(0).min(255) as u8,
            ((x + y) % 256) as u8,
        ]);
    }).unwrap();

    let mut filters = vec![FilterPolicy::None, FilterPolicy::Adaptive];
    filters.extend(FilterType::ALL.iter().map(|&filter| FilterPolicy::Fixed(filter)));

    println!("uncompressed pixels: {} bytes", image.pixels().len());

    for &filter in &filters {
        for &compression in &[Compression::Stored, Compression::Fixed, Compression::Dynamic] {
            let options = WriteOptions::default().with_filter(filter).with_compression(compression);

            let start = Instant::now();
            let bytes = encode(&image, options).unwrap();
            let duration = start.elapsed();

            println!(
                "{:?} filter, {}: {} bytes in {:.1} ms",
                filter, compression, bytes.len(), duration.as_secs_f64() * 1000.0
            );
        }
    }
}
