//! Predictive filters that are applied to each row of pixel bytes before compression.
//! Each filter replaces a byte with its difference to a prediction made from neighbouring bytes,
//! which turns smooth gradients into long runs of small numbers.

use crate::compression::{ByteVec, Bytes};
use crate::error::{Error, Result};

#[cfg(feature = "rayon")]
use rayon::prelude::*;


/// The prediction that is subtracted from each byte of a row.
/// The filter of each row is stored as the first byte of the filtered row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterType {

    /// The bytes are stored unchanged.
    None,

    /// Predicts each byte from the corresponding byte of the pixel to the left.
    Sub,

    /// Predicts each byte from the corresponding byte of the pixel above.
    Up,

    /// Predicts each byte from the average of the left and the upper pixel.
    Average,

    /// Predicts each byte from the left, upper, or upper left pixel,
    /// whichever is closest to a linear extrapolation of the three.
    Paeth,
}

impl FilterType {

    /// All filter types, ordered by their byte value.
    pub const ALL: [FilterType; 5] = [
        FilterType::None, FilterType::Sub, FilterType::Up,
        FilterType::Average, FilterType::Paeth,
    ];

    /// The byte that precedes a row filtered with this type.
    pub fn to_byte(self) -> u8 {
        match self {
            FilterType::None => 0,
            FilterType::Sub => 1,
            FilterType::Up => 2,
            FilterType::Average => 3,
            FilterType::Paeth => 4,
        }
    }

    /// Parse the first byte of a filtered row.
    pub fn from_byte(byte: u8) -> Result<Self> {
        FilterType::ALL.get(byte as usize).copied()
            .ok_or_else(|| Error::format(format!("unknown scan line filter type {}", byte)))
    }
}


/// Decides which filter the encoder applies to each row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterPolicy {

    /// Store all rows unfiltered. Fastest, but produces larger files.
    None,

    /// Apply the same filter to all rows.
    Fixed(FilterType),

    /// Try all filters on each row and keep the one with the smallest
    /// sum of absolute values, interpreting the filtered bytes as signed numbers.
    /// On equal sums, the filter with the smaller byte value wins.
    Adaptive,
}

impl Default for FilterPolicy {
    fn default() -> Self { FilterPolicy::Adaptive }
}


/// Select the left, upper, or upper left byte,
/// whichever is closest to `left + up - upper_left`.
/// Ties are resolved in the order left, up, upper left.
#[inline]
pub fn paeth_predictor(left: u8, up: u8, upper_left: u8) -> u8 {
    let (a, b, c) = (left as i16, up as i16, upper_left as i16);
    let prediction = a + b - c;

    let distance_a = (prediction - a).abs();
    let distance_b = (prediction - b).abs();
    let distance_c = (prediction - c).abs();

    if distance_a <= distance_b && distance_a <= distance_c { left }
    else if distance_b <= distance_c { up }
    else { upper_left }
}


/// Filter one row of raw bytes.
/// `prior` is the raw row above, which is all zeroes for the first row.
/// Bytes left of the row start are treated as zero.
pub fn filter_row(filter: FilterType, bytes_per_pixel: usize, raw: Bytes<'_>, prior: Bytes<'_>, filtered: &mut [u8]) {
    debug_assert_eq!(raw.len(), prior.len());
    debug_assert_eq!(raw.len(), filtered.len());

    let left = |index: usize| if index >= bytes_per_pixel { raw[index - bytes_per_pixel] } else { 0 };
    let upper_left = |index: usize| if index >= bytes_per_pixel { prior[index - bytes_per_pixel] } else { 0 };

    match filter {
        FilterType::None => filtered.copy_from_slice(raw),

        FilterType::Sub => for (index, target) in filtered.iter_mut().enumerate() {
            *target = raw[index].wrapping_sub(left(index));
        },

        FilterType::Up => for (index, target) in filtered.iter_mut().enumerate() {
            *target = raw[index].wrapping_sub(prior[index]);
        },

        FilterType::Average => for (index, target) in filtered.iter_mut().enumerate() {
            let average = (left(index) as u16 + prior[index] as u16) / 2;
            *target = raw[index].wrapping_sub(average as u8);
        },

        FilterType::Paeth => for (index, target) in filtered.iter_mut().enumerate() {
            let prediction = paeth_predictor(left(index), prior[index], upper_left(index));
            *target = raw[index].wrapping_sub(prediction);
        },
    }
}

/// Reverse the filter of one row in place.
/// `prior` is the already reconstructed row above, which is all zeroes for the first row.
pub fn unfilter_row(filter: FilterType, bytes_per_pixel: usize, row: &mut [u8], prior: Bytes<'_>) {
    debug_assert_eq!(row.len(), prior.len());

    // the first pixel has no left neighbour
    let first_pixel_end = bytes_per_pixel.min(row.len());

    match filter {
        FilterType::None => {},

        FilterType::Sub => for index in bytes_per_pixel .. row.len() {
            row[index] = row[index].wrapping_add(row[index - bytes_per_pixel]);
        },

        FilterType::Up => for (byte, &up) in row.iter_mut().zip(prior) {
            *byte = byte.wrapping_add(up);
        },

        FilterType::Average => {
            for index in 0 .. first_pixel_end {
                row[index] = row[index].wrapping_add(prior[index] / 2);
            }

            for index in bytes_per_pixel .. row.len() {
                let average = (row[index - bytes_per_pixel] as u16 + prior[index] as u16) / 2;
                row[index] = row[index].wrapping_add(average as u8);
            }
        },

        FilterType::Paeth => {
            for index in 0 .. first_pixel_end {
                row[index] = row[index].wrapping_add(paeth_predictor(0, prior[index], 0));
            }

            for index in bytes_per_pixel .. row.len() {
                let prediction = paeth_predictor(
                    row[index - bytes_per_pixel], prior[index],
                    prior[index - bytes_per_pixel]
                );

                row[index] = row[index].wrapping_add(prediction);
            }
        },
    }
}


/// The sum of the absolute values of the bytes, interpreted as signed numbers.
fn signed_magnitude(filtered: Bytes<'_>) -> u64 {
    filtered.iter().map(|&byte| (byte as i8).unsigned_abs() as u64).sum()
}

/// Filter a row according to the policy, writing the filter byte followed by the filtered bytes.
/// `scratch` holds one filtered row and is only used by the adaptive policy.
fn filter_scanline(
    policy: FilterPolicy, bytes_per_pixel: usize,
    raw: Bytes<'_>, prior: Bytes<'_>,
    target: &mut [u8], scratch: &mut [u8],
) {
    let (filter_byte, filtered) = target.split_at_mut(1);

    let filter = match policy {
        FilterPolicy::None => FilterType::None,
        FilterPolicy::Fixed(filter) => filter,

        FilterPolicy::Adaptive => {
            let mut best_filter = FilterType::None;
            let mut best_magnitude = u64::MAX;

            for &filter in &FilterType::ALL {
                filter_row(filter, bytes_per_pixel, raw, prior, scratch);
                let magnitude = signed_magnitude(scratch);

                if magnitude < best_magnitude {
                    best_magnitude = magnitude;
                    best_filter = filter;
                }
            }

            best_filter
        },
    };

    filter_byte[0] = filter.to_byte();
    filter_row(filter, bytes_per_pixel, raw, prior, filtered);
}


/// Filter all rows of the pixels, returning `height * (1 + row_byte_count)` bytes.
/// With the `rayon` feature and `parallel` enabled, rows are filtered on multiple threads.
/// The result does not depend on whether the rows were filtered in parallel.
pub fn filter_scanlines(
    pixels: Bytes<'_>, row_byte_count: usize, bytes_per_pixel: usize,
    policy: FilterPolicy, parallel: bool,
) -> ByteVec {
    debug_assert!(row_byte_count > 0 && pixels.len() % row_byte_count == 0);

    let zero_row = vec![0_u8; row_byte_count];
    let mut output = vec![0_u8; pixels.len() / row_byte_count * (row_byte_count + 1)];

    // each filtered row only reads raw rows, so rows are independent
    let prior_of = |y: usize| {
        if y == 0 { zero_row.as_slice() } else { &pixels[(y - 1) * row_byte_count .. y * row_byte_count] }
    };

    let raw_of = |y: usize| &pixels[y * row_byte_count .. (y + 1) * row_byte_count];

    #[cfg(feature = "rayon")] {
        if parallel {
            output.par_chunks_mut(row_byte_count + 1).enumerate()
                .for_each_init(
                    || vec![0_u8; row_byte_count],
                    |scratch, (y, target)| filter_scanline(policy, bytes_per_pixel, raw_of(y), prior_of(y), target, scratch)
                );

            return output;
        }
    }

    #[cfg(not(feature = "rayon"))]
    let _ = parallel;

    let mut scratch = vec![0_u8; row_byte_count];
    for (y, target) in output.chunks_exact_mut(row_byte_count + 1).enumerate() {
        filter_scanline(policy, bytes_per_pixel, raw_of(y), prior_of(y), target, &mut scratch);
    }

    output
}

/// Reconstruct the raw pixels from the filtered rows, strictly from top to bottom.
/// Fails if the filtered bytes do not contain exactly `height` rows
/// or if a row starts with an unknown filter byte.
pub fn unfilter_scanlines(filtered: Bytes<'_>, row_byte_count: usize, height: usize, bytes_per_pixel: usize) -> Result<ByteVec> {
    let expected_byte_size = height.checked_mul(row_byte_count + 1)
        .ok_or_else(|| Error::format("image too large"))?;

    if filtered.len() != expected_byte_size {
        return Err(Error::format(format!(
            "decompressed image data has {} bytes instead of {}",
            filtered.len(), expected_byte_size
        )));
    }

    let zero_row = vec![0_u8; row_byte_count];
    let mut pixels = vec![0_u8; height * row_byte_count];

    for (y, filtered_row) in filtered.chunks_exact(row_byte_count + 1).enumerate() {
        let filter = FilterType::from_byte(filtered_row[0])?;

        let (above, current) = pixels.split_at_mut(y * row_byte_count);
        let prior = if y == 0 { zero_row.as_slice() } else { &above[(y - 1) * row_byte_count ..] };

        let row = &mut current[.. row_byte_count];
        row.copy_from_slice(&filtered_row[1 ..]);
        unfilter_row(filter, bytes_per_pixel, row, prior);
    }

    Ok(pixels)
}


#[cfg(test)]
mod test {
    use super::*;

    /// A 4×4 rgb image with some texture.
    fn rgb_4x4() -> Vec<u8> {
        (0 .. 4 * 4 * 3_u32).map(|index| (index * 37 % 256) as u8 ^ (index / 12 * 5) as u8).collect()
    }

    #[test]
    fn paeth_prefers_left_then_up(){
        assert_eq!(paeth_predictor(10, 10, 10), 10);
        assert_eq!(paeth_predictor(1, 2, 3), 1);
        assert_eq!(paeth_predictor(3, 2, 1), 3);
        assert_eq!(paeth_predictor(100, 50, 100), 50);
        assert_eq!(paeth_predictor(0, 255, 0), 255);
        assert_eq!(paeth_predictor(20, 40, 30), 30); // distances: 10 to left, 10 to up, 0 to upper left
    }

    #[test]
    fn each_filter_is_reversible_on_rgb_rows(){
        let pixels = rgb_4x4();
        let row_byte_count = 4 * 3;

        for &filter in &FilterType::ALL {
            let mut prior = vec![0_u8; row_byte_count];

            for raw in pixels.chunks_exact(row_byte_count) {
                let mut row = vec![0_u8; row_byte_count];
                filter_row(filter, 3, raw, &prior, &mut row);
                unfilter_row(filter, 3, &mut row, &prior);

                assert_eq!(row.as_slice(), raw, "{:?} filter is not reversible", filter);
                prior = raw.to_vec();
            }
        }
    }

    #[test]
    fn each_policy_is_reversible(){
        let pixels = rgb_4x4();
        let policies: Vec<FilterPolicy> = FilterType::ALL.iter().map(|&filter| FilterPolicy::Fixed(filter))
            .chain(vec![FilterPolicy::None, FilterPolicy::Adaptive]).collect();

        for policy in policies {
            let filtered = filter_scanlines(&pixels, 12, 3, policy, false);
            assert_eq!(filtered.len(), 4 * 13);
            assert_eq!(unfilter_scanlines(&filtered, 12, 4, 3).unwrap(), pixels);
        }
    }

    #[test]
    fn adaptive_picks_smallest_prediction_error(){
        // a horizontal gradient, repeated vertically
        let row: Vec<u8> = (0 .. 16).map(|x| x * 10).collect();
        let pixels = [row.clone(), row].concat();

        let filtered = filter_scanlines(&pixels, 16, 1, FilterPolicy::Adaptive, false);

        // sub and paeth tie on the first row, sub has the smaller byte value
        assert_eq!(filtered[0], FilterType::Sub.to_byte());

        // up and paeth both predict the second row perfectly
        assert_eq!(filtered[17], FilterType::Up.to_byte());
        assert!(filtered[18 ..].iter().all(|&byte| byte == 0));
    }

    #[test]
    fn none_policy_stores_raw_rows(){
        let pixels = rgb_4x4();
        let filtered = filter_scanlines(&pixels, 12, 3, FilterPolicy::None, false);

        for (filtered_row, raw) in filtered.chunks_exact(13).zip(pixels.chunks_exact(12)) {
            assert_eq!(filtered_row[0], 0);
            assert_eq!(&filtered_row[1 ..], raw);
        }
    }

    #[test]
    fn parallel_filtering_is_identical(){
        let pixels: Vec<u8> = (0 .. 64 * 48 * 4_u32).map(|index| (index * index % 251) as u8).collect();

        assert_eq!(
            filter_scanlines(&pixels, 64 * 4, 4, FilterPolicy::Adaptive, true),
            filter_scanlines(&pixels, 64 * 4, 4, FilterPolicy::Adaptive, false)
        );
    }

    #[test]
    fn unknown_filter_byte(){
        let filtered = [0, 1, 2, 5, 3, 4];
        assert!(matches!(unfilter_scanlines(&filtered, 2, 2, 1), Err(Error::Format(_))));
    }

    #[test]
    fn wrong_filtered_size(){
        assert!(matches!(unfilter_scanlines(&[0, 1, 2], 2, 2, 1), Err(Error::Format(_))));
    }
}
