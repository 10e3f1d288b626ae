//! Raw event file tests

mod reader_tests;

use std::path::{Path, PathBuf};

use evtstore::raw::{BoardHeader, Event, RawWriter, RunDescription, RunHeader};

pub const CHANNELS: u16 = 16;
pub const ROI: u16 = 10;

pub fn sample_run(run_id: u32) -> RunHeader {
    let mut run = RunHeader::new(run_id, 20240315);
    run.num_pixels = CHANNELS;
    run.roi = ROI;
    run.start_sec = 1_710_460_800;
    for id in [0u16, 3, 17, 39] {
        run.boards[id as usize] = BoardHeader::present(id);
    }
    run
}

pub fn sample_event(n: u32) -> Event {
    let mut event = Event::new(CHANNELS, ROI);
    event.event_num = n;
    event.trigger_num = n * 2;
    event.trigger_type = 4;
    event.pc_time = 1_710_460_800 + n;
    event.board_time[n as usize % 40] = n;
    for (i, sample) in event.samples.iter_mut().enumerate() {
        *sample = (i as i16).wrapping_mul(31).wrapping_sub(n as i16);
    }
    event
}

/// Write a complete run with `events` events and return its path
pub fn write_run(dir: &Path, name: &str, events: u32) -> PathBuf {
    let path = dir.join(name);
    let mut writer = RawWriter::new(&path);
    writer
        .open(&sample_run(7), &RunDescription::new(12, "test run"))
        .unwrap();
    for n in 0..events {
        writer.write_event(&sample_event(n)).unwrap();
    }
    writer.close().unwrap();
    path
}
