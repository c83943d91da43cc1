/// Expand uncompressed RLE counts into a column-major 0/1 mask.
///
/// Runs alternate between background and foreground, starting with
/// background. Runs past the end of the mask are ignored.
pub fn decode_counts(counts: &[u32], h: usize, w: usize) -> Vec<u8> {
    let n = h * w;
    let mut mask = vec![0u8; n];
    let mut index = 0usize;
    let mut value = 0u8;

    for &count in counts {
        let end = (index + count as usize).min(n);
        mask[index..end].fill(value);
        index = end;
        value = 1 - value;
    }

    mask
}

/// Decode the compressed counts string stored in crowd annotations.
///
/// Each count is a little-endian sequence of 5-bit groups offset by 48, with
/// bit 5 as the continuation flag and bit 4 of the last group carrying the
/// sign. From the fourth count on, values are deltas against the count two
/// places back.
pub fn counts_from_string(text: &str) -> Vec<u32> {
    let bytes = text.as_bytes();
    let mut counts: Vec<u32> = Vec::new();
    let mut pos = 0usize;

    while pos < bytes.len() {
        let mut value: i64 = 0;
        let mut shift = 0u32;
        loop {
            let group = bytes[pos] as i64 - 48;
            value |= (group & 0x1f) << shift;
            pos += 1;
            shift += 5;
            if group & 0x20 == 0 {
                if group & 0x10 != 0 {
                    value |= -1i64 << shift;
                }
                break;
            }
        }
        if counts.len() > 2 {
            value += counts[counts.len() - 2] as i64;
        }
        counts.push(value as u32);
    }

    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_single_center_pixel() {
        // 3x3 mask with only the center set
        let mask = decode_counts(&[4, 1, 4], 3, 3);
        assert_eq!(mask, vec![0, 0, 0, 0, 1, 0, 0, 0, 0]);
    }

    #[test]
    fn decode_all_background() {
        assert_eq!(decode_counts(&[12], 3, 4), vec![0u8; 12]);
    }

    #[test]
    fn decode_leading_foreground() {
        // a zero-length background run makes the mask start with 1s
        assert_eq!(decode_counts(&[0, 3, 3], 3, 2), vec![1, 1, 1, 0, 0, 0]);
    }

    #[test]
    fn decode_ignores_overlong_runs() {
        assert_eq!(decode_counts(&[2, 100], 2, 2), vec![0, 0, 1, 1]);
    }

    #[test]
    fn string_counts_plain() {
        // values below the delta threshold encode as single characters
        assert_eq!(counts_from_string("534"), vec![5, 3, 4]);
    }

    #[test]
    fn string_counts_with_delta() {
        // fourth count is stored relative to the second: 5 - 3 = 2 -> '2'
        assert_eq!(counts_from_string("2342"), vec![2, 3, 4, 5]);
    }

    #[test]
    fn string_counts_negative_delta() {
        // fourth count 3 against second count 5 encodes as -2 -> 'N'
        assert_eq!(counts_from_string("553N"), vec![5, 5, 3, 3]);
    }

    #[test]
    fn string_counts_multi_group() {
        // 92 = 28 | (2 << 5): first group has the continuation bit set
        assert_eq!(counts_from_string("53l2"), vec![5, 3, 92]);
    }
}
