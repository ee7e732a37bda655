/* Alignment */

pub const fn raw_align_up(val: usize, align: usize) -> usize {
    // See https://github.com/rust-lang/rust/blob/e620d0f337d0643c757bab791fc7d88d63217704/src/libcore/alloc.rs#L192
    val.wrapping_add(align).wrapping_sub(1) & !align.wrapping_sub(1)
}

pub const fn raw_is_aligned(val: usize, align: usize) -> bool {
    val & align.wrapping_sub(1) == 0
}

#[cfg(test)]
mod tests {
    use crate::util::conversions::*;

    #[test]
    fn test_raw_align() {
        assert_eq!(raw_align_up(0x1001, 0x1000), 0x2000);
        assert_eq!(raw_align_up(0x1000, 0x1000), 0x1000);
        assert!(raw_is_aligned(0x3000, 0x1000));
        assert!(!raw_is_aligned(0x3008, 0x1000));
    }
}
