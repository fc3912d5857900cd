const HEX_CHARS: &[u8; 16] = b"0123456789ABCDEF";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HexDumpLayout {
    pub bytes_per_row: usize,
    pub bytes_per_col: usize,
}

impl HexDumpLayout {
    pub fn new(bytes_per_row: usize, bytes_per_col: usize) -> Self {
        let bytes_per_col = bytes_per_col.max(1);
        // a row always holds a whole number of columns
        let bytes_per_row = (bytes_per_row.max(bytes_per_col) / bytes_per_col) * bytes_per_col;
        HexDumpLayout { bytes_per_row, bytes_per_col }
    }

    fn cols_per_row(&self) -> usize {
        self.bytes_per_row / self.bytes_per_col
    }
}

impl Default for HexDumpLayout {
    fn default() -> Self {
        HexDumpLayout::new(32, 4)
    }
}

/// Formats received bytes as rows of hex columns. A row that is not filled
/// by one batch is continued by the next one, so a stream split over many
/// reads keeps its column alignment.
pub struct HexDumper {
    layout: HexDumpLayout,
    row_position: usize,
}

impl HexDumper {
    pub fn new(layout: HexDumpLayout) -> Self {
        HexDumper { layout, row_position: 0 }
    }

    pub fn rows(&mut self, data: &[u8]) -> Vec<String> {
        let col_width = self.layout.bytes_per_col * 2 + 1;
        let mut rows = Vec::new();
        let mut index = 0;

        while index < data.len() {
            let mut row = vec![b'.'; self.layout.cols_per_row() * col_width];
            for col in 0..self.layout.cols_per_row() {
                row[col * col_width + col_width - 1] = b' ';
            }

            let to_place = (data.len() - index).min(self.layout.bytes_per_row - self.row_position);
            for (i, byte) in data[index..index + to_place].iter().enumerate() {
                let pos = self.row_position + i;
                let dest = (pos / self.layout.bytes_per_col) * col_width
                    + (pos % self.layout.bytes_per_col) * 2;
                row[dest] = HEX_CHARS[(byte >> 4) as usize];
                row[dest + 1] = HEX_CHARS[(byte & 0x0F) as usize];
            }

            self.row_position += to_place;
            if self.row_position >= self.layout.bytes_per_row {
                self.row_position = 0;
            }
            index += to_place;

            rows.push(String::from_utf8_lossy(&row).trim_end().to_string());
        }
        rows
    }
}
