#[macro_use]
extern crate bencher;

extern crate png_lite;
use png_lite::prelude::*;
use png_lite::compression;

use bencher::Bencher;


fn photo_like_image() -> ImageBuffer {
    ImageBuffer::from_fn(512, 512, 4, |x, y, pixel| {
        let noise = ((x * 7919) ^ (y * 104_729)) as u8 & 3;
        pixel.copy_from_slice(&[(x / 2) as u8 + noise, (y / 2) as u8, (x + y) as u8 / 3, 255]);
    }).unwrap()
}

fn encode_fast(bench: &mut Bencher) {
    let image = photo_like_image();

    bench.iter(||{
        let bytes = encode(&image, WriteOptions::fast()).unwrap();
        bencher::black_box(bytes);
    })
}

fn encode_default_sequential(bench: &mut Bencher) {
    let image = photo_like_image();
    let options = WriteOptions::default().with_parallel(false);

    bench.iter(||{
        let bytes = encode(&image, options).unwrap();
        bencher::black_box(bytes);
    })
}

fn encode_default_parallel(bench: &mut Bencher) {
    let image = photo_like_image();

    bench.iter(||{
        let bytes = encode(&image, WriteOptions::default()).unwrap();
        bencher::black_box(bytes);
    })
}

fn compress_fixed_huffman(bench: &mut Bencher) {
    let pixels = photo_like_image().into_pixels();

    bench.iter(||{
        let compressed = compression::compress(&pixels, Compression::Fixed);
        bencher::black_box(compressed);
    })
}

benchmark_group!(encoding,
    encode_fast,
    encode_default_sequential,
    encode_default_parallel,
    compress_fixed_huffman
);

benchmark_main!(encoding);
