//! Operator commands that do not go through the script pipeline

use std::sync::atomic::AtomicBool;

use fw_core::{COMMANDS, SessionEnd, VERSION};
use fw_tests::Session;
use fw_tests::system::TEST_MEMORY_BASE;
use td_model::Width;
use td_shared::memory::MemoryAccess;

fn fill_memory(session: &mut Session) {
    for (i, b) in (b'a'..=b'p').enumerate() {
        session
            .system
            .memory
            .write(TEST_MEMORY_BASE + i as u64, Width::Byte, u32::from(b))
            .unwrap();
    }
}

#[test_log::test]
fn test_help_lists_table_in_order() {
    let mut session = Session::new();
    session.lines(&["help"]);
    session.run();

    let output = session.output();
    assert!(output.contains(&format!("Test Driver v{VERSION}\n")));
    assert!(output.contains("Available Commands:\n"));

    let mut last = 0;
    for entry in COMMANDS {
        let row = format!("{:<22} {}\n", entry.name, entry.description);
        let at = output[last..]
            .find(&row)
            .unwrap_or_else(|| panic!("missing or out of order: {row:?}"));
        last += at + row.len();
    }
}

#[test_log::test]
fn test_question_mark_is_help() {
    let mut session = Session::new();
    session.lines(&["?"]);
    session.run();
    assert!(session.output().contains("Available Commands:\n"));
}

#[test_log::test]
fn test_blank_lines_and_comments_do_nothing() {
    let mut session = Session::new();
    session.lines(&["", "   ", "# a comment", "ver"]);

    let outcome = session.run();

    assert_eq!(outcome.end, SessionEnd::Disconnected);
    assert!(session.stages.calls().is_empty());
    assert_eq!(session.output().matches("td>").count(), 5);
    assert!(session.output().contains(&format!("Test Driver v{VERSION}\n")));
}

#[test_log::test]
fn test_reboot_ends_session() {
    let mut session = Session::new();
    session.lines(&["reboot", "ver"]);

    let outcome = session.run();

    assert_eq!(outcome.end, SessionEnd::Reboot);
    assert!(!session.output().contains("Test Driver v"));
    assert_eq!(session.stream.pending_inputs(), 1);
}

#[test_log::test]
fn test_exit_honours_config() {
    let mut session = Session::new();
    session.lines(&["exit"]);
    assert_eq!(session.run().end, SessionEnd::Exit);

    let mut session = Session::new();
    session.config.allow_exit = false;
    session.lines(&["exit"]);
    let outcome = session.run();
    assert_eq!(outcome.end, SessionEnd::Disconnected);
    assert!(!outcome.state.exit_requested);
    assert!(session.output().contains("Exit not permitted\n"));
}

#[test_log::test]
fn test_pending_interrupt_ends_after_next_line() {
    let mut session = Session::new();
    session.lines(&["reboot"]);
    let interrupt = AtomicBool::new(true);

    let outcome = session.run_with_interrupt(&interrupt);

    assert_eq!(outcome.end, SessionEnd::Interrupted);
    // The line read when the interrupt was noticed is dropped
    assert!(!outcome.state.reboot_requested);
}

#[test_log::test]
fn test_debug_flags_normalized_and_forwarded() {
    let mut session = Session::new();
    session.lines(&[
        "td debugmode",
        "7",
        "td printhardwarelines",
        "0x10",
    ]);

    let outcome = session.run();

    assert!(outcome.state.debug_mode);
    assert!(outcome.state.print_hardware_lines);
    assert!(session.system.debug_mode);
    assert!(session.system.print_hardware_lines);
    let output = session.output();
    assert!(output.contains("Test Driver DEBUG Mode (1-ON 0-OFF) : "));
    assert!(output.contains("DEBUG Mode = 1\n"));
    assert!(output.contains("Debug - Print Hardware Lines Status = 1\n"));

    let mut session = Session::new();
    session.lines(&["td debugmode", "0"]);
    let outcome = session.run();
    assert!(!outcome.state.debug_mode);
    assert!(session.output().contains("DEBUG Mode = 0\n"));
}

#[test_log::test]
fn test_linux_spawns_system_shell() {
    let mut session = Session::new();
    session.lines(&["linux"]);
    session.run();
    assert_eq!(session.system.system_shell_runs, 1);
}

#[test_log::test]
fn test_memory_dump_words() {
    let mut session = Session::new();
    fill_memory(&mut session);
    session.lines(&["md 0x1000 16 4"]);

    session.run();

    assert!(session.output().contains(
        "\n00001000: 64636261 68676665 6C6B6A69 706F6E6D  dcbahgfelkjiponm\n"
    ));
}

#[test_log::test]
fn test_memory_dump_realigns_and_defaults_width() {
    let mut session = Session::new();
    fill_memory(&mut session);
    session.lines(&["md 0x1003 8 4", "md 4099 2 0"]);

    session.run();

    let output = session.output();
    assert!(
        output.contains("\nAligning offset for 4-byte access = 0x00001000\n00001000: 64636261")
    );
    // Width 0 means bytes, no realignment needed
    assert!(output.contains("\n00001003: 64 65"));
}

#[test_log::test]
fn test_memory_dump_caps_size_and_rejects_width() {
    let mut session = Session::new();
    session.lines(&["md 0x1000 4000 1", "md 0x1000 16 3"]);

    session.run();

    let output = session.output();
    assert!(output.contains("\nMax dump size = 800\n"));
    // 800 bytes at 16 per line
    assert_eq!(output.lines().filter(|l| l.starts_with("0000")).count(), 50);
    assert!(output.contains("\nInvalid width: 3\n"));
}

#[test_log::test]
fn test_memory_token_count_mismatch() {
    let mut session = Session::new();
    session.lines(&["md 0x1000 16", "mr", "mw 0x1000"]);

    session.run();

    assert_eq!(
        session
            .output()
            .matches("Error: Number of array elements returned didn't match\n")
            .count(),
        3
    );
}

#[test_log::test]
fn test_memory_negative_address_and_count_reported() {
    let mut session = Session::new();
    session.lines(&[
        "md -4 16 4",
        "md 0x1000 -1 4",
        "mr -0x10",
        "mw -1 5",
        "mr -0x-8000000000000000",
    ]);

    let outcome = session.run();

    assert_eq!(outcome.end, SessionEnd::Disconnected);
    let output = session.output();
    assert!(output.contains("Error: invalid address: -4\n"));
    assert!(output.contains("Error: invalid count: -1\n"));
    assert!(output.contains("Error: invalid address: -16\n"));
    assert!(output.contains("Error: invalid address: -1\n"));
    // A malformed number counts as a missing element
    assert!(output.ends_with("Error: Number of array elements returned didn't match\ntd>"));
    assert!(!output.lines().any(|l| l.starts_with("0000")));
}

#[test_log::test]
fn test_memory_write_then_read() {
    let mut session = Session::new();
    session.lines(&["mw 0x1010 0xDEADBEEF", "mr 0x1010", "mr 0x5000"]);

    session.run();

    assert_eq!(
        session.system.memory.read(0x1010, Width::Word).unwrap(),
        0xdead_beef
    );
    let output = session.output();
    assert!(output.contains("0xDEADBEEF\n"));
    assert!(output.contains("Error: Address 0x00005000 (4 bytes) is outside accessible memory\n"));
}

#[test_log::test]
fn test_uut_dump_prints_hex() {
    let mut session = Session::new();
    session.system.uut.queue_reply(b"OK\r\n");
    session.lines(&["uut dump", "uut dump"]);

    session.run();

    let output = session.output();
    assert!(output.contains("UUT serial buffer (4 bytes):\n00000000: 4F 4B 0D 0A"));
    assert!(output.contains("OK..\n"));
    assert!(output.contains("UUT serial buffer is empty\n"));
}

#[test_log::test]
fn test_uut_subshell_forwards_lines() {
    let mut session = Session::new();
    session.system.uut.queue_reply(b"");
    session.system.uut.queue_reply(b"version 1.2\n");
    session.lines(&["uut", "ver", "~.", "help"]);

    let outcome = session.run();

    assert_eq!(outcome.end, SessionEnd::Disconnected);
    assert_eq!(session.system.uut.sent_text(), "ver\r");
    let output = session.output();
    assert!(output.contains("uut>version 1.2\nuut>"));
    // Back in the main shell after "~."
    assert!(output.contains("Available Commands:\n"));
}
