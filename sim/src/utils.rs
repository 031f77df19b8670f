use crate::isa::MAX_DATA;

/// Changed data words between the initial segment and the live memory, as
/// `(address, before, after)`.
pub fn mem_diff(initial: &[u32], current: &[(u32, u32)]) -> Vec<(u32, u32, u32)> {
    let mut now = vec![0u32; MAX_DATA as usize];
    for &(addr, word) in current {
        if let Some(slot) = now.get_mut(addr as usize) {
            *slot = word;
        }
    }
    now.iter()
        .enumerate()
        .filter_map(|(i, &after)| {
            let before = initial.get(i).copied().unwrap_or_default();
            (before != after).then_some((i as u32, before, after))
        })
        .collect()
}

/// Register value in hex and, when it differs, as a signed decimal.
pub fn format_reg_val(value: u32) -> String {
    let signed = value as i32;
    if signed < 0 {
        format!("{value:#010x} ({signed})")
    } else {
        format!("{value:#010x} ({value})")
    }
}
