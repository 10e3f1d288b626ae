//! Fixed-size payloads of the raw file blocks.

use bytes::{Buf, BufMut};

use crate::error::{Result, StoreError};

use super::NUM_BOARDS;

/// Identifier payload: DeviceId (4) + RunId (4)
pub const IDENTIFIER_SIZE: usize = 8;

/// Run header payload size (board headers are written as separate blocks)
pub const RUN_HEADER_SIZE: usize = 34;

/// Board header payload size
pub const BOARD_HEADER_SIZE: usize = 74;

/// Reserved run summary payload (zeroed placeholder)
pub const RUN_SUMMARY_SIZE: usize = 4;

/// In-memory event record header, leading alignment field included
pub const EVENT_RECORD_SIZE: usize = 192;

/// Leading alignment field of an event record; never written to disk
pub const EVENT_ALIGNMENT_SIZE: usize = 2;

/// Start marker of a board header that carries data
pub const BOARD_START_MARKER: u16 = 0xFB01;

/// End marker of a board header that carries data
pub const BOARD_END_MARKER: u16 = 0x04FE;

fn check_len(what: &str, bytes: &[u8], expected: usize) -> Result<()> {
    if bytes.len() < expected {
        return Err(StoreError::Framing(format!(
            "{} payload too short: expected {} bytes, got {}",
            what,
            expected,
            bytes.len()
        )));
    }
    Ok(())
}

// =============================================================================
// Identifier
// =============================================================================

/// Which device took which run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Identifier {
    pub device_id: u32,
    pub run_id: u32,
}

impl Identifier {
    pub fn to_bytes(&self) -> [u8; IDENTIFIER_SIZE] {
        let mut bytes = [0u8; IDENTIFIER_SIZE];
        let mut buf = &mut bytes[..];
        buf.put_u32_ne(self.device_id);
        buf.put_u32_ne(self.run_id);
        bytes
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        check_len("identifier", bytes, IDENTIFIER_SIZE)?;
        let mut buf = bytes;
        Ok(Self {
            device_id: buf.get_u32_ne(),
            run_id: buf.get_u32_ne(),
        })
    }
}

/// Free-form description of a run handed to the writer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunDescription {
    pub device_id: u32,
    pub name: String,
}

impl RunDescription {
    pub fn new(device_id: u32, name: impl Into<String>) -> Self {
        Self {
            device_id,
            name: name.into(),
        }
    }
}

// =============================================================================
// Board Header
// =============================================================================

/// Header reported by one readout board at the start of a run
///
/// A slot without a board is written as `BoardHeader::absent()`; presence is
/// recognised by `start_marker == BOARD_START_MARKER`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BoardHeader {
    pub start_marker: u16,
    pub package_length: u16,
    pub version: u16,
    pub status: u16,
    pub trigger_crc: u16,
    pub trigger_type: u16,
    pub trigger_id: u32,
    pub event_counter: u32,
    pub ref_clock: u32,
    pub board_id: u16,
    pub phase_shift: u16,
    pub num_triggers: u16,
    pub trigger_prescaler: u16,
    pub dna: u64,
    pub time: u32,
    pub run_number: u32,
    pub drs_temperature: [i16; 4],
    pub dac: [u16; 8],
    pub end_marker: u16,
}

impl BoardHeader {
    /// Header of an empty board slot (all fields zero)
    pub fn absent() -> Self {
        Self::default()
    }

    /// Header of a present board with the given id
    pub fn present(board_id: u16) -> Self {
        Self {
            start_marker: BOARD_START_MARKER,
            package_length: BOARD_HEADER_SIZE as u16,
            version: 1,
            board_id,
            end_marker: BOARD_END_MARKER,
            ..Self::default()
        }
    }

    pub fn is_present(&self) -> bool {
        self.start_marker == BOARD_START_MARKER
    }

    pub fn to_bytes(&self) -> [u8; BOARD_HEADER_SIZE] {
        let mut bytes = [0u8; BOARD_HEADER_SIZE];
        let mut buf = &mut bytes[..];
        buf.put_u16_ne(self.start_marker);
        buf.put_u16_ne(self.package_length);
        buf.put_u16_ne(self.version);
        buf.put_u16_ne(self.status);
        buf.put_u16_ne(self.trigger_crc);
        buf.put_u16_ne(self.trigger_type);
        buf.put_u32_ne(self.trigger_id);
        buf.put_u32_ne(self.event_counter);
        buf.put_u32_ne(self.ref_clock);
        buf.put_u16_ne(self.board_id);
        buf.put_u16_ne(self.phase_shift);
        buf.put_u16_ne(self.num_triggers);
        buf.put_u16_ne(self.trigger_prescaler);
        buf.put_u64_ne(self.dna);
        buf.put_u32_ne(self.time);
        buf.put_u32_ne(self.run_number);
        for t in self.drs_temperature {
            buf.put_i16_ne(t);
        }
        for d in self.dac {
            buf.put_u16_ne(d);
        }
        buf.put_u16_ne(self.end_marker);
        bytes
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        check_len("board header", bytes, BOARD_HEADER_SIZE)?;
        let mut buf = bytes;

        let mut header = Self {
            start_marker: buf.get_u16_ne(),
            package_length: buf.get_u16_ne(),
            version: buf.get_u16_ne(),
            status: buf.get_u16_ne(),
            trigger_crc: buf.get_u16_ne(),
            trigger_type: buf.get_u16_ne(),
            trigger_id: buf.get_u32_ne(),
            event_counter: buf.get_u32_ne(),
            ref_clock: buf.get_u32_ne(),
            board_id: buf.get_u16_ne(),
            phase_shift: buf.get_u16_ne(),
            num_triggers: buf.get_u16_ne(),
            trigger_prescaler: buf.get_u16_ne(),
            dna: buf.get_u64_ne(),
            time: buf.get_u32_ne(),
            run_number: buf.get_u32_ne(),
            ..Self::default()
        };
        for t in header.drs_temperature.iter_mut() {
            *t = buf.get_i16_ne();
        }
        for d in header.dac.iter_mut() {
            *d = buf.get_u16_ne();
        }
        header.end_marker = buf.get_u16_ne();

        Ok(header)
    }
}

// =============================================================================
// Run Header
// =============================================================================

/// Metadata of one run
///
/// `boards` lives alongside the header in memory but is not part of the run
/// header payload; each board gets its own block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunHeader {
    pub version: u32,
    pub run_type: u32,
    pub run_id: u32,
    /// Night of the run as YYYYMMDD
    pub night: u32,
    pub num_boards: u16,
    pub num_pixels: u16,
    pub num_time_markers: u16,
    /// Samples per pixel channel
    pub roi: u16,
    /// Samples per time-marker channel
    pub roi_tm: u16,
    pub start_sec: u32,
    pub start_usec: u32,
    pub boards: [BoardHeader; NUM_BOARDS],
}

impl RunHeader {
    pub fn new(run_id: u32, night: u32) -> Self {
        Self {
            run_id,
            night,
            ..Self::default()
        }
    }

    /// Number of board slots holding a present board
    pub fn boards_present(&self) -> usize {
        self.boards.iter().filter(|b| b.is_present()).count()
    }

    pub fn to_bytes(&self) -> [u8; RUN_HEADER_SIZE] {
        let mut bytes = [0u8; RUN_HEADER_SIZE];
        let mut buf = &mut bytes[..];
        buf.put_u32_ne(self.version);
        buf.put_u32_ne(self.run_type);
        buf.put_u32_ne(self.run_id);
        buf.put_u32_ne(self.night);
        buf.put_u16_ne(self.num_boards);
        buf.put_u16_ne(self.num_pixels);
        buf.put_u16_ne(self.num_time_markers);
        buf.put_u16_ne(self.roi);
        buf.put_u16_ne(self.roi_tm);
        buf.put_u32_ne(self.start_sec);
        buf.put_u32_ne(self.start_usec);
        bytes
    }

    /// Decode the run header payload; `boards` are left absent
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        check_len("run header", bytes, RUN_HEADER_SIZE)?;
        let mut buf = bytes;
        Ok(Self {
            version: buf.get_u32_ne(),
            run_type: buf.get_u32_ne(),
            run_id: buf.get_u32_ne(),
            night: buf.get_u32_ne(),
            num_boards: buf.get_u16_ne(),
            num_pixels: buf.get_u16_ne(),
            num_time_markers: buf.get_u16_ne(),
            roi: buf.get_u16_ne(),
            roi_tm: buf.get_u16_ne(),
            start_sec: buf.get_u32_ne(),
            start_usec: buf.get_u32_ne(),
            boards: [BoardHeader::absent(); NUM_BOARDS],
        })
    }
}

impl Default for RunHeader {
    fn default() -> Self {
        Self {
            version: 1,
            run_type: 0,
            run_id: 0,
            night: 0,
            num_boards: NUM_BOARDS as u16,
            num_pixels: 1440,
            num_time_markers: 160,
            roi: 300,
            roi_tm: 0,
            start_sec: 0,
            start_usec: 0,
            boards: [BoardHeader::absent(); NUM_BOARDS],
        }
    }
}

// =============================================================================
// Event
// =============================================================================

/// One triggered event: fixed header plus `num_channels × roi` samples
///
/// ## Record Layout
/// ```text
/// ┌───────────┬──────────────────────────────────┬──────────────────────┐
/// │ Align (2) │ Header fields (190)              │ Samples (ch×roi×2)   │
/// └───────────┴──────────────────────────────────┴──────────────────────┘
///  not written └──────────────── block payload ──────────────────────────┘
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub roi: u16,
    pub roi_tm: u16,
    pub num_channels: u16,
    pub event_num: u32,
    pub trigger_num: u32,
    pub trigger_type: u16,
    pub num_boards: u16,
    pub pc_time: u32,
    pub pc_usec: u32,
    pub errors: [u8; 4],
    pub board_time: [u32; NUM_BOARDS],
    /// Channel-major samples, `num_channels × roi` of them
    pub samples: Vec<i16>,
}

impl Event {
    /// An event with zeroed samples
    pub fn new(num_channels: u16, roi: u16) -> Self {
        Self {
            roi,
            roi_tm: 0,
            num_channels,
            event_num: 0,
            trigger_num: 0,
            trigger_type: 0,
            num_boards: 0,
            pc_time: 0,
            pc_usec: 0,
            errors: [0; 4],
            board_time: [0; NUM_BOARDS],
            samples: vec![0; num_channels as usize * roi as usize],
        }
    }

    /// Number of samples the header announces
    pub fn expected_samples(&self) -> usize {
        self.num_channels as usize * self.roi as usize
    }

    /// Bytes of the in-memory record, alignment field included
    pub fn record_size(&self) -> usize {
        EVENT_RECORD_SIZE + 2 * self.expected_samples()
    }

    /// Bytes written to disk for this event
    pub fn payload_size(&self) -> usize {
        self.record_size() - EVENT_ALIGNMENT_SIZE
    }

    /// Serialize the in-memory record into `dest` (e.g. a pool chunk)
    ///
    /// Returns the number of bytes used.
    pub fn encode_record(&self, dest: &mut [u8]) -> Result<usize> {
        if self.samples.len() != self.expected_samples() {
            return Err(StoreError::InvalidEvent(format!(
                "{} samples for {} channels × roi {}",
                self.samples.len(),
                self.num_channels,
                self.roi
            )));
        }

        let size = self.record_size();
        if dest.len() < size {
            return Err(StoreError::InvalidEvent(format!(
                "record needs {} bytes, buffer has {}",
                size,
                dest.len()
            )));
        }

        let mut buf = &mut dest[..size];
        buf.put_u16_ne(0);
        buf.put_u16_ne(self.roi);
        buf.put_u16_ne(self.roi_tm);
        buf.put_u16_ne(self.num_channels);
        buf.put_u32_ne(self.event_num);
        buf.put_u32_ne(self.trigger_num);
        buf.put_u16_ne(self.trigger_type);
        buf.put_u16_ne(self.num_boards);
        buf.put_u32_ne(self.pc_time);
        buf.put_u32_ne(self.pc_usec);
        buf.put_slice(&self.errors);
        for t in self.board_time {
            buf.put_u32_ne(t);
        }
        for s in &self.samples {
            buf.put_i16_ne(*s);
        }

        Ok(size)
    }

    pub fn to_record(&self) -> Result<Vec<u8>> {
        let mut record = vec![0u8; self.record_size()];
        self.encode_record(&mut record)?;
        Ok(record)
    }

    /// Payload length of an encoded record, read from its header
    ///
    /// `record` may be longer than the event (a pool chunk usually is).
    pub fn payload_len_of(record: &[u8]) -> Result<usize> {
        if record.len() < EVENT_RECORD_SIZE {
            return Err(StoreError::InvalidEvent(format!(
                "record shorter than its header: {} bytes",
                record.len()
            )));
        }

        let mut buf = &record[EVENT_ALIGNMENT_SIZE..];
        let roi = buf.get_u16_ne() as usize;
        let _roi_tm = buf.get_u16_ne();
        let channels = buf.get_u16_ne() as usize;

        let payload = EVENT_RECORD_SIZE - EVENT_ALIGNMENT_SIZE + channels * roi * 2;
        if record.len() < payload + EVENT_ALIGNMENT_SIZE {
            return Err(StoreError::InvalidEvent(format!(
                "record announces {} payload bytes, buffer holds {}",
                payload,
                record.len() - EVENT_ALIGNMENT_SIZE
            )));
        }

        Ok(payload)
    }

    /// Decode an event block payload (alignment field already stripped)
    pub fn decode_payload(payload: &[u8]) -> Result<Self> {
        check_len("event", payload, EVENT_RECORD_SIZE - EVENT_ALIGNMENT_SIZE)?;
        let mut buf = payload;

        let roi = buf.get_u16_ne();
        let roi_tm = buf.get_u16_ne();
        let num_channels = buf.get_u16_ne();
        let event_num = buf.get_u32_ne();
        let trigger_num = buf.get_u32_ne();
        let trigger_type = buf.get_u16_ne();
        let num_boards = buf.get_u16_ne();
        let pc_time = buf.get_u32_ne();
        let pc_usec = buf.get_u32_ne();
        let mut errors = [0u8; 4];
        buf.copy_to_slice(&mut errors);
        let mut board_time = [0u32; NUM_BOARDS];
        for t in board_time.iter_mut() {
            *t = buf.get_u32_ne();
        }

        let count = num_channels as usize * roi as usize;
        if buf.remaining() < count * 2 {
            return Err(StoreError::Framing(format!(
                "event payload holds {} sample bytes, header announces {}",
                buf.remaining(),
                count * 2
            )));
        }
        let samples = (0..count).map(|_| buf.get_i16_ne()).collect();

        Ok(Self {
            roi,
            roi_tm,
            num_channels,
            event_num,
            trigger_num,
            trigger_type,
            num_boards,
            pc_time,
            pc_usec,
            errors,
            board_time,
            samples,
        })
    }
}
