//! Test data and firmware uploads over the operator stream

use fw_core::SessionEnd;
use fw_tests::Session;
use td_model::{FIRMWARE_MAX_COUNT, TransportError};
use td_shared::transport::{ShellStream, StreamMode};

#[test_log::test]
fn test_test_data_upload_stores_script() {
    let data: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
    let mut session = Session::new();
    session
        .stream
        .queue_line("upload testdata")
        .queue_line("4096")
        .queue_raw(&data, 100);

    let outcome = session.run();

    assert_eq!(outcome.end, SessionEnd::Disconnected);
    assert!(!outcome.state.direct_command);
    assert_eq!(outcome.state.script.unwrap().as_bytes(), &data[..]);
    assert_eq!(
        session.stream.mode_changes(),
        &[StreamMode::Raw, StreamMode::Line]
    );

    let output = session.output();
    assert!(output.contains("Enter TestDataFile Length: "));
    assert!(output.contains("Transfer Test Data File in Binary (4096 bytes)\n"));
    assert!(output.contains("File Loaded successfully over RS232\n"));
}

#[test_log::test]
fn test_zero_length_upload_rejected_before_transfer() {
    for length in ["0", "-5", "nothing"] {
        let mut session = Session::new();
        session
            .stream
            .queue_line("upload testdata")
            .queue_line(length)
            .queue_raw(b"XYZ", 3);

        let outcome = session.run();

        assert!(outcome.state.script.is_none(), "{length}");
        // Never switched to raw mode
        assert!(session.stream.mode_changes().is_empty(), "{length}");
        let output = session.output();
        assert!(!output.contains("Transfer Test Data File"), "{length}");
        assert!(output.contains("Invalid length"), "{length}");
    }
}

#[test_log::test]
fn test_new_upload_replaces_previous_script() {
    let mut session = Session::new();
    session
        .stream
        .queue_line("upload testdata")
        .queue_line("3")
        .queue_raw(b"old", 3)
        .queue_line("upload testdata")
        .queue_line("0x3")
        .queue_raw(b"new", 1);
    session.lines(&["run"]);

    session.run();

    assert_eq!(session.stages.parsed(), vec!["new".to_string()]);
}

#[test_log::test]
fn test_failed_transfer_keeps_nothing() {
    let mut session = Session::new();
    session
        .stream
        .queue_line("upload testdata")
        .queue_line("3")
        .queue_raw(b"pre", 3)
        .queue_line("upload testdata")
        .queue_line("10")
        .queue_raw(b"abc", 3)
        .queue_failure(TransportError::Io("line noise".into()));
    session.lines(&["run"]);

    let outcome = session.run();

    assert_eq!(session.stream.mode(), StreamMode::Line);
    let output = session.output();
    assert!(output.contains("fatal error: Download failed\n"));
    // The previous script was released before the failed transfer started
    assert!(output.contains("No test case data file"));
    assert!(session.stages.calls().is_empty());
    assert!(outcome.state.reboot_requested);
}

#[test_log::test]
fn test_firmware_upload_appends_slot() {
    let mut session = Session::new();
    session
        .stream
        .queue_line("upload firmware")
        .queue_line("5")
        .queue_raw(b"\x01\x02\x03\x04\x05", 2)
        .queue_line("upload firmware")
        .queue_line("2")
        .queue_raw(b"\xaa\xbb", 2);

    session.run();

    assert_eq!(session.system.firmware.count(), 2);
    assert_eq!(session.system.firmware.get(0).unwrap().data(), b"\x01\x02\x03\x04\x05");
    assert_eq!(session.system.firmware.get(1).unwrap().data(), b"\xaa\xbb");

    let output = session.output();
    assert!(output.contains("Enter Firmware 1 File Length: "));
    assert!(output.contains("Transfer Firmware 1 in Binary (5 bytes)\n"));
    assert!(output.contains(
        "Downloading Firmware into Firmware Buffer 0, Remaining Firmware Buffers = 7\n"
    ));
    assert!(output.contains("Enter Firmware 2 File Length: "));
    assert!(output.contains("Transfer Firmware 2 in Binary (2 bytes)\n"));
    assert!(output.contains(
        "Downloading Firmware into Firmware Buffer 1, Remaining Firmware Buffers = 6\n"
    ));
    assert_eq!(output.matches("File Loaded successfully over RS232").count(), 2);
}

#[test_log::test]
fn test_firmware_upload_refused_when_full() {
    let mut session = Session::new();
    for i in 0..FIRMWARE_MAX_COUNT {
        session.system.firmware.add(vec![i as u8]).unwrap();
    }
    session
        .stream
        .queue_line("upload firmware")
        .queue_line("4")
        .queue_raw(b"full", 4);

    session.run();

    assert_eq!(session.system.firmware.count(), FIRMWARE_MAX_COUNT);
    let output = session.output();
    assert!(output.contains("Already 8 firmware files exist.\n"));
    assert!(!output.contains("Enter Firmware"));
    // The length line was then taken as a direct command
    assert_eq!(session.stages.parsed().len(), 1);
}

#[test_log::test]
fn test_firmware_transfer_failure_adds_no_slot() {
    let mut session = Session::new();
    session
        .stream
        .queue_line("upload firmware")
        .queue_line("8")
        .queue_raw(b"1234", 4)
        .queue_failure(TransportError::ConnectionLost);

    let outcome = session.run();

    assert_eq!(outcome.end, SessionEnd::Disconnected);
    assert_eq!(session.system.firmware.count(), 0);
    assert_eq!(session.stream.mode(), StreamMode::Line);
    assert!(session.output().contains("fatal error: Download failed\n"));
}

#[test_log::test]
fn test_upload_clears_direct_command_flag() {
    let mut session = Session::new();
    session.lines(&["upload firmware", "0"]);

    let outcome = session.run();

    assert!(!outcome.state.direct_command);
    assert_eq!(session.system.firmware.count(), 0);
    assert!(session.output().contains("Invalid length: 0\n"));
}
