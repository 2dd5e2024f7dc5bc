//! `FrameState`: the state populated by the header parser and consumed by
//! the entropy decoder and reconstruction pipeline (spec.md §3).
use crate::huffman::HuffmanTable;

/// Maximum number of components a baseline frame may declare (spec.md §3:
/// 1-4 components).
pub const MAX_COMPONENTS: usize = 4;

/// One SOF component descriptor, plus the scan-time state (Huffman table
/// selection, DC predictor) that SOS/entropy decoding adds to it.
#[derive(Clone)]
pub struct Component {
    /// Component identifier byte from SOF (not necessarily 1/2/3).
    pub id: u8,
    pub h_sampling: u8,
    pub v_sampling: u8,
    pub quant_table_id: u8,
    /// Set by SOS.
    pub dc_table_id: u8,
    /// Set by SOS.
    pub ac_table_id: u8,
    /// DC predictor; reset to 0 at scan start and at every RST marker.
    pub dc_pred: i32,
}

/// Frame-wide state: everything the header parser extracts before the
/// entropy-coded scan begins.
pub struct FrameState {
    pub width: u16,
    pub height: u16,
    pub precision: u8,
    pub components: Vec<Component>,
    pub max_h: u8,
    pub max_v: u8,
    /// Quantization tables, in natural (row-major, de-zigzagged) order,
    /// indexed by `quant_table_id`.
    pub quant_tables: [Option<[u16; 64]>; 4],
    pub dc_tables: [Option<HuffmanTable>; 4],
    pub ac_tables: [Option<HuffmanTable>; 4],
    /// MCUs between restart markers; 0 means restarts are not used.
    pub restart_interval: usize,
    /// Set once an APP0 "JFIF\0" segment is seen.
    pub jfif: bool,
    pub x_density: u16,
    pub y_density: u16,
}

impl FrameState {
    pub fn new() -> FrameState {
        FrameState {
            width: 0,
            height: 0,
            precision: 0,
            components: Vec::new(),
            max_h: 1,
            max_v: 1,
            quant_tables: [None, None, None, None],
            dc_tables: [None, None, None, None],
            ac_tables: [None, None, None, None],
            restart_interval: 0,
            jfif: false,
            x_density: 1,
            y_density: 1,
        }
    }

    /// Pixel width of one MCU (spec.md §3: `8 * max_h`).
    pub fn mcu_width(&self) -> usize {
        8 * self.max_h as usize
    }

    /// Pixel height of one MCU.
    pub fn mcu_height(&self) -> usize {
        8 * self.max_v as usize
    }

    pub fn mcus_per_row(&self) -> usize {
        (self.width as usize + self.mcu_width() - 1) / self.mcu_width()
    }

    pub fn mcus_per_col(&self) -> usize {
        (self.height as usize + self.mcu_height() - 1) / self.mcu_height()
    }

    /// Component plane width after MCU tiling, before cropping to `width`.
    pub fn padded_component_width(&self, comp: &Component) -> usize {
        self.mcus_per_row() * comp.h_sampling as usize * 8
    }

    /// Component plane height after MCU tiling, before cropping to `height`.
    pub fn padded_component_height(&self, comp: &Component) -> usize {
        self.mcus_per_col() * comp.v_sampling as usize * 8
    }

    pub fn reset_dc_predictors(&mut self) {
        for c in &mut self.components {
            c.dc_pred = 0;
        }
    }
}

impl Default for FrameState {
    fn default() -> Self {
        FrameState::new()
    }
}
