//! Hex view of received payloads.

/// Bytes shown on each dump line.
const BYTES_PER_LINE: usize = 16;

/// Width of `xxxxxxxx:` at the start of a line.
pub(crate) const OFFSET_WIDTH: usize = 9;

/// Where the text column starts.
pub(crate) const TEXT_COLUMN: usize = OFFSET_WIDTH + 1 + BYTES_PER_LINE * 3 + 2;

/// Formats `bytes` as `offset: hex  ascii` lines, 16 bytes per line.
///
/// Bytes outside printable ASCII show as `.` in the text column. An empty
/// payload yields no lines.
pub fn hex_dump(bytes: &[u8]) -> Vec<String> {
    bytes
        .chunks(BYTES_PER_LINE)
        .enumerate()
        .map(|(i, chunk)| {
            let hex = chunk
                .iter()
                .map(|b| format!("{b:02x}"))
                .collect::<Vec<_>>()
                .join(" ");
            let ascii: String = chunk
                .iter()
                .map(|&b| if (32..=126).contains(&b) { b as char } else { '.' })
                .collect();
            let offset = i * BYTES_PER_LINE;
            format!(
                "{offset:08x}: {hex:<width$}  {ascii}",
                width = BYTES_PER_LINE * 3
            )
        })
        .collect()
}
