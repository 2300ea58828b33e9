extern crate png_lite;
use png_lite::prelude::*;

/// Save a frame buffer, as it might come from a renderer or a screen capture, as a png file.
/// The frame is stored bottom-up and every row is padded to a multiple of four bytes.
fn main() {
    let (width, height) = (301_u32, 200_u32);
    let stride = (width as usize * 3 + 3) / 4 * 4;

    let mut frame = vec![0_u8; stride * height as usize];
    for (row_index, row) in frame.chunks_exact_mut(stride).enumerate() {
        for (x, pixel) in row[.. width as usize * 3].chunks_exact_mut(3).enumerate() {
            pixel[0] = (x * 255 / width as usize) as u8;
            pixel[1] = (row_index * 255 / height as usize) as u8;
            pixel[2] = 128;
        }
    }

    let image = ImageBuffer::from_strided(width, height, 3, stride, &frame).unwrap()
        .flipped_vertically();

    image.write_to_file("frame.png", WriteOptions::default()).unwrap();
    println!("created file frame.png ({}x{} pixels)", image.width(), image.height());
}
