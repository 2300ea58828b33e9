//! Encode images and decode them again, checking that every byte survives.

extern crate png_lite;

use png_lite::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};


fn all_write_options() -> Vec<WriteOptions> {
    let mut filters = vec![FilterPolicy::None, FilterPolicy::Adaptive];
    filters.extend(FilterType::ALL.iter().map(|&filter| FilterPolicy::Fixed(filter)));

    let mut options = Vec::new();
    for &filter in &filters {
        for &compression in &[Compression::Stored, Compression::Fixed, Compression::Dynamic] {
            options.push(WriteOptions::default().with_filter(filter).with_compression(compression));
        }
    }

    options
}

fn random_image(random: &mut StdRng, width: u32, height: u32, channels: usize) -> ImageBuffer {
    ImageBuffer::from_fn(width, height, channels, |_, _, pixel| random.fill(pixel)).unwrap()
}

/// Smooth gradients with a little noise, which is what the filters are made for.
fn photo_like_image(random: &mut StdRng, width: u32, height: u32, channels: usize) -> ImageBuffer {
    ImageBuffer::from_fn(width, height, channels, |x, y, pixel| {
        for (channel, value) in pixel.iter_mut().enumerate() {
            let gradient = (x * (channel as u32 + 1) + y * 2) / 3;
            *value = (gradient as u8).wrapping_add(random.random_range(0 .. 4));
        }
    }).unwrap()
}

fn check_round_trip(image: &ImageBuffer, options: WriteOptions) {
    let bytes = encode(image, options).unwrap();
    let decoded = decode(&bytes).unwrap();
    assert_eq!(&decoded, image, "{}x{}x{} with {:?}", image.width(), image.height(), image.channels(), options);
}


#[test]
fn two_by_two_rgba(){
    let pixels = vec![
        255, 0, 0, 255,    0, 255, 0, 255,
        0, 0, 255, 255,    255, 255, 255, 0,
    ];

    let image = ImageBuffer::new(2, 2, 4, pixels.clone()).unwrap();
    let bytes = encode(&image, WriteOptions::default()).unwrap();
    let decoded = decode(&bytes).unwrap();

    assert_eq!((decoded.width(), decoded.height(), decoded.channels()), (2, 2, 4));
    assert_eq!(decoded.into_pixels(), pixels);
}

#[test]
fn single_pixel_images(){
    for &channels in &[1, 3, 4] {
        let image = ImageBuffer::new(1, 1, channels, vec![200; channels]).unwrap();

        for options in all_write_options() {
            check_round_trip(&image, options);
        }
    }
}

#[test]
fn random_images_with_all_options(){
    let mut random = StdRng::seed_from_u64(0x5EED);

    for &(width, height) in &[(1, 17), (17, 1), (3, 5), (31, 7), (64, 64)] {
        for &channels in &[1, 3, 4] {
            let noise = random_image(&mut random, width, height, channels);
            let photo = photo_like_image(&mut random, width, height, channels);

            for options in all_write_options() {
                check_round_trip(&noise, options);
                check_round_trip(&photo, options);
            }
        }
    }
}

#[test]
fn large_images(){
    let mut random = StdRng::seed_from_u64(1);

    let photo = photo_like_image(&mut random, 640, 480, 3);
    check_round_trip(&photo, WriteOptions::default());
    check_round_trip(&photo, WriteOptions::small());
    check_round_trip(&photo, WriteOptions::fast());

    // spans several stored blocks and several huffman blocks
    let noise = random_image(&mut random, 300, 300, 4);
    check_round_trip(&noise, WriteOptions::default());
    check_round_trip(&noise, WriteOptions::fast());
}

#[test]
fn uniform_image_compresses_well(){
    let image = ImageBuffer::new(256, 256, 4, vec![77; 256 * 256 * 4]).unwrap();
    let bytes = encode(&image, WriteOptions::default()).unwrap();

    assert!(bytes.len() < 4096, "{} bytes", bytes.len());
    assert_eq!(decode(&bytes).unwrap(), image);
}

#[test]
fn encoding_is_deterministic(){
    let mut random = StdRng::seed_from_u64(7);
    let image = photo_like_image(&mut random, 120, 90, 3);

    let sequential = encode(&image, WriteOptions::default().with_parallel(false)).unwrap();
    let parallel = encode(&image, WriteOptions::default().with_parallel(true)).unwrap();

    assert_eq!(sequential, parallel);
    assert_eq!(sequential, encode(&image, WriteOptions::default()).unwrap());
}

#[test]
fn adaptive_filters_beat_no_filters_on_gradients(){
    let image = ImageBuffer::from_fn(200, 200, 3, |x, y, pixel| {
        pixel.copy_from_slice(&[x as u8, y as u8, (x + y) as u8]);
    }).unwrap();

    let unfiltered = encode(&image, WriteOptions::default().with_filter(FilterPolicy::None)).unwrap();
    let adaptive = encode(&image, WriteOptions::default()).unwrap();

    assert!(adaptive.len() < unfiltered.len());
}

#[test]
fn file_round_trip(){
    let mut random = StdRng::seed_from_u64(3);
    let image = photo_like_image(&mut random, 40, 30, 4);

    let path = std::env::temp_dir().join("png_lite_file_round_trip.png");
    image.write_to_file(&path, WriteOptions::default()).unwrap();

    let read = ImageBuffer::read_from_file(&path, ReadOptions::pedantic()).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(read, image);
}

#[test]
fn missing_file_is_io_error(){
    let path = std::env::temp_dir().join("png_lite_this_file_does_not_exist.png");
    assert!(matches!(ImageBuffer::read_from_file(&path, ReadOptions::default()), Err(Error::Io(_))));
}

#[test]
fn frame_dump_from_bottom_up_buffer(){
    // a bottom-up frame buffer with rows padded to four bytes
    let (width, height, stride) = (3_u32, 2_u32, 12);
    let frame: Vec<u8> = (0 .. stride * height as usize).map(|index| index as u8).collect();

    let image = ImageBuffer::from_strided(width, height, 3, stride, &frame).unwrap().flipped_vertically();
    let decoded = decode(&encode(&image, WriteOptions::default()).unwrap()).unwrap();

    assert_eq!(decoded.row(0).unwrap(), &frame[12 .. 21]);
    assert_eq!(decoded.row(1).unwrap(), &frame[0 .. 9]);
}
